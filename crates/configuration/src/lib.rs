use crate::error::ConfigError;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    AnalysisConfig, DatabaseSettings, LoaderSettings, LoggingSettings, ServerSettings, Settings,
};

#[cfg(feature = "clap")]
pub use settings::ServerArgs;

/// Loads the application configuration.
///
/// Sources, lowest precedence first: built-in defaults, an optional `config.toml`
/// in the working directory, then `COINSCOPE__SECTION__KEY` environment variables
/// (e.g. `COINSCOPE__SERVER__PORT=8080`). The analysis parameters are validated
/// before the settings are handed out.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name("config").required(false))
        .add_source(
            config::Environment::with_prefix("COINSCOPE")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;
    settings.analysis.validate()?;

    tracing::debug!(?settings, "Configuration loaded.");
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_defaults_without_a_config_file() {
        let settings = load_config().unwrap();
        assert_eq!(settings.analysis, AnalysisConfig::default());
        assert_eq!(settings.loader.retry_backoff_ms, 250);
    }
}
