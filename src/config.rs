use ::config::{builder::DefaultState, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:3001",
    "http://localhost:5173",
    "http://127.0.0.1:5173",
    "http://127.0.0.1:3001",
];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bind_addr: String,
    pub model_path: PathBuf,
    pub cors_origins: Vec<String>,
    pub metrics_enabled: bool,
}

impl Config {
    /// Defaults, then an optional `stress-engine.toml`, then `STRESS_*`
    /// environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::defaults()?
            .add_source(File::with_name("stress-engine").required(false))
            .add_source(
                Environment::with_prefix("STRESS")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_origins"),
            )
            .build()?
            .try_deserialize()
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let origins: Vec<String> = DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect();

        ::config::Config::builder()
            .set_default("bind_addr", "0.0.0.0:8000")?
            .set_default("model_path", "models/stress_level_model.json")?
            .set_default("cors_origins", origins)?
            .set_default("metrics_enabled", true)
    }
}
