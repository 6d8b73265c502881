use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use strand_types::StreamConfig;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub mongodb: Option<MongoDbConfig>,

    // Secrets (from ENV only)
    #[serde(default)]
    pub mongodb_uri: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "pretty".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoDbConfig {
    pub database: String,
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. `extra`, when given on the command line
    /// 4. Environment variables (`STRAND_STREAM__DEFAULT_NODE`, `STRAND_LOGGING__LEVEL`, ...)
    pub fn load(extra: Option<&Path>) -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let mut builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false));

        if let Some(path) = extra {
            builder = builder.add_source(File::from(path));
        }

        let config = builder
            .add_source(
                Environment::with_prefix("STRAND")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut cfg: Config = config.try_deserialize()?;

        // Only needed when a [mongodb] section is configured
        cfg.mongodb_uri = std::env::var("MONGODB_URI").ok();

        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = ConfigLoader::builder().add_source(File::from(path.as_ref()));

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_structure() {
        let toml = r#"
            [stream]
            tool_nodes = ["tools", "code_runner"]
            default_node = "assistant"
            incremental_timeline = true

            [stream.display_names]
            assistant = "Assistant"

            [logging]
            level = "debug"
            format = "json"

            [mongodb]
            database = "test"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.stream.is_tool_node("code_runner"));
        assert_eq!(config.stream.default_node, "assistant");
        assert_eq!(config.stream.display_name("assistant"), "Assistant");
        assert!(config.stream.incremental_timeline);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.mongodb.unwrap().database, "test");
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.stream.default_node, "agent");
        assert!(config.stream.is_structured_output_node("generate_title"));
        assert!(config.mongodb.is_none());
    }

    #[test]
    fn test_shipped_defaults_parse() {
        let config = Config::from_file(concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml")).unwrap();

        assert_eq!(config.stream.display_name("agent"), "Agent");
        assert_eq!(config.logging.format, "pretty");
    }
}
