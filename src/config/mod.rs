//! Configuration loaded from `.vaultfill.toml`.

pub mod settings;

pub use settings::Settings;
