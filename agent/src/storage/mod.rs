//! Registry and settings

pub mod registry;
pub mod settings;
