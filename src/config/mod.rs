//! Bootstrap settings, flattened configuration values and their loaders.

pub mod configuration;
pub mod proc_loader;
pub mod refresh;
pub mod settings;
