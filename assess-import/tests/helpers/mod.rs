//! Shared helpers for assess-import integration tests

#![allow(dead_code)]

pub mod db_utils;
pub mod payloads;
