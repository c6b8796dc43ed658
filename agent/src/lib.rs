//! FortiVault Library
//!
//! Core modules for the FortiGate SSH configuration backup agent.

pub mod app;
pub mod backup;
pub mod errors;
pub mod filesys;
pub mod logs;
pub mod models;
pub mod notify;
pub mod retention;
pub mod schedule;
pub mod ssh;
pub mod storage;
pub mod utils;
pub mod workers;
