use std::path::Path;

use anyhow::Context;
use client_core::ConsentSettings;
use serde::Deserialize;

const DEFAULT_CONFIG_NAME: &str = "consent";
const ENV_PREFIX: &str = "APP";

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database_url: String,
    /// Origin whose local storage the simulated page sees.
    pub origin: String,
    pub consent: ConsentSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite://./data/consent.db".into(),
            origin: "http://localhost:8080".into(),
            consent: ConsentSettings::default(),
        }
    }
}

/// Defaults, then `consent.toml` (or `config_path`), then `APP__*` environment variables.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let file = match config_path {
        Some(path) => config::File::from(path).required(true),
        None => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
    };

    config::Config::builder()
        .add_source(file)
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("failed to assemble settings")?
        .try_deserialize::<Settings>()
        .context("invalid settings")
}

pub fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
