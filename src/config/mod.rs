//! Configuration: `lockbox.toml` settings and per-user file locations.

pub mod paths;
pub mod settings;

pub use settings::Settings;
