//! Artifact retention

pub mod sweeper;
