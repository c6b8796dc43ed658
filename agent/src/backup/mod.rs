//! Per-device backup pipeline

pub mod artifact;
pub mod fsm;
pub mod orchestrator;
pub mod protocol;
