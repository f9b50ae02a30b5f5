//! Configuration resolution for assess-import
//!
//! Bootstrap values (root folder, port, log level) come from CLI → ENV → TOML → defaults
//! via `assess_common::config`. Matching tunables come from the `settings` table with
//! built-in defaults; a stored value that is out of range is ignored with a warning.

use assess_common::Result;
use sqlx::{Pool, Sqlite};
use tracing::warn;

use crate::db::settings::{
    get_setting, ACCEPT_THRESHOLD_KEY, DIMENSION_BONUS_KEY, EDIT_WEIGHT_KEY,
    EXCELLENT_THRESHOLD_KEY, MAX_LOCK_WAIT_MS_KEY, TOKEN_WEIGHT_KEY,
};
use crate::matching::similarity::SimilarityWeights;

/// Default HTTP port of the import service
pub const DEFAULT_PORT: u16 = 5790;

/// Module name used for config file lookup
pub const MODULE_NAME: &str = "assess-import";

/// Tunables of the matching and persistence pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ImportSettings {
    /// Minimum confidence of an accepted match
    pub accept_threshold: f64,
    /// Confidence at which a match needs no review
    pub excellent_threshold: f64,
    /// Added to a candidate whose dimension equals the external hint
    pub dimension_bonus: f64,
    pub weights: SimilarityWeights,
    /// Upper bound on retrying a locked commit
    pub max_lock_wait_ms: u64,
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self {
            accept_threshold: 0.7,
            excellent_threshold: 0.9,
            dimension_bonus: 0.05,
            weights: SimilarityWeights::default(),
            max_lock_wait_ms: 5000,
        }
    }
}

impl ImportSettings {
    /// Load from the settings table, falling back to defaults per key
    pub async fn load(db: &Pool<Sqlite>) -> Result<Self> {
        let defaults = Self::default();

        let accept_threshold = match read_f64(db, ACCEPT_THRESHOLD_KEY).await {
            // Zero would accept candidates that share nothing with the external text
            Some(v) if v <= 0.0 => {
                warn!(key = ACCEPT_THRESHOLD_KEY, value = v, "Accept threshold must be positive, using default");
                defaults.accept_threshold
            }
            value => unit_interval(ACCEPT_THRESHOLD_KEY, value, defaults.accept_threshold),
        };
        let mut excellent_threshold = unit_interval(
            EXCELLENT_THRESHOLD_KEY,
            read_f64(db, EXCELLENT_THRESHOLD_KEY).await,
            defaults.excellent_threshold,
        );
        if excellent_threshold < accept_threshold {
            warn!(
                accept_threshold,
                excellent_threshold, "Excellent threshold below accept threshold, clamping"
            );
            excellent_threshold = accept_threshold;
        }

        let dimension_bonus = unit_interval(
            DIMENSION_BONUS_KEY,
            read_f64(db, DIMENSION_BONUS_KEY).await,
            defaults.dimension_bonus,
        );

        let token = non_negative(
            TOKEN_WEIGHT_KEY,
            read_f64(db, TOKEN_WEIGHT_KEY).await,
            defaults.weights.token,
        );
        let edit = non_negative(
            EDIT_WEIGHT_KEY,
            read_f64(db, EDIT_WEIGHT_KEY).await,
            defaults.weights.edit,
        );
        let weights = if token + edit > 0.0 {
            SimilarityWeights {
                token: token / (token + edit),
                edit: edit / (token + edit),
            }
        } else {
            warn!("Similarity weights are both zero, using defaults");
            defaults.weights
        };

        let max_lock_wait_ms = match get_setting::<u64>(db, MAX_LOCK_WAIT_MS_KEY).await {
            Ok(Some(v)) => v,
            Ok(None) => defaults.max_lock_wait_ms,
            Err(e) => {
                warn!(error = %e, "Invalid {} setting, using default", MAX_LOCK_WAIT_MS_KEY);
                defaults.max_lock_wait_ms
            }
        };

        Ok(Self {
            accept_threshold,
            excellent_threshold,
            dimension_bonus,
            weights,
            max_lock_wait_ms,
        })
    }
}

async fn read_f64(db: &Pool<Sqlite>, key: &str) -> Option<f64> {
    match get_setting::<f64>(db, key).await {
        Ok(value) => value,
        Err(e) => {
            warn!(key, error = %e, "Unreadable setting, using default");
            None
        }
    }
}

fn unit_interval(key: &str, value: Option<f64>, default: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() && (0.0..=1.0).contains(&v) => v,
        Some(v) => {
            warn!(key, value = v, "Setting outside [0, 1], using default");
            default
        }
        None => default,
    }
}

fn non_negative(key: &str, value: Option<f64>, default: f64) -> f64 {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 => v,
        Some(v) => {
            warn!(key, value = v, "Negative setting, using default");
            default
        }
        None => default,
    }
}
