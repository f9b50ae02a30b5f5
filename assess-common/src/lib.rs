//! # Assess Common Library
//!
//! Shared code for the assessment platform services:
//! - Error and result types
//! - Bootstrap configuration and root folder resolution
//! - SQLite schema initialization for platform and import tables
//! - Read models for the assessment catalog

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
