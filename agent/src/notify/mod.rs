//! Operator notifications

pub mod aggregator;
pub mod telegram;
