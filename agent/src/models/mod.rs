//! Data models

pub mod backup;
