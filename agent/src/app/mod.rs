//! Application wiring and run modes

pub mod cycle;
pub mod options;
pub mod run;
