//! Layered settings: defaults, `docqa.toml`, then `DOCQA_*` environment

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use docqa_core::{EngineConfig, Error, Result};
use docqa_providers::{EmbedderSettings, GeneratorSettings};

pub const CONFIG_FILE: &str = "docqa.toml";
pub const ENV_PREFIX: &str = "DOCQA_";

/// Everything the binary needs to build an engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub engine: EngineConfig,
    pub embedder: EmbedderSettings,
    pub generator: GeneratorSettings,
}

impl Settings {
    /// Defaults, then the TOML file, then `DOCQA_` variables with `__`
    /// separating nested keys (`DOCQA_ENGINE__TOP_K=8`).
    pub fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load settings and fill API credentials from well-known variables.
    ///
    /// An explicit `path` must exist; the default `docqa.toml` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let file = match path {
            Some(path) if !path.exists() => {
                return Err(Error::Configuration(format!(
                    "config file {} not found",
                    path.display()
                )));
            }
            Some(path) => path,
            None => Path::new(CONFIG_FILE),
        };
        debug!(file = %file.display(), "loading settings");

        let mut settings: Settings = Self::figment(file)
            .extract()
            .map_err(|e| Error::Configuration(e.to_string()))?;
        settings.fill_credentials(|key| std::env::var(key).ok());
        settings.validate()?;
        Ok(settings)
    }

    pub fn fill_credentials(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.embedder.fill_credentials(&lookup);
        self.generator.fill_credentials(&lookup);
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        if self.embedder.dimensions != self.engine.dimension {
            return Err(Error::Configuration(format!(
                "embedder.dimensions ({}) must equal engine.dimension ({})",
                self.embedder.dimensions, self.engine.dimension
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docqa_core::NoContextPolicy;
    use docqa_providers::{EmbeddingProvider, GenerationProvider};
    use figment::Jail;

    #[test]
    fn test_defaults_without_file() {
        Jail::expect_with(|_jail| {
            let settings = Settings::load(None).unwrap();
            assert_eq!(settings.engine, EngineConfig::default());
            assert_eq!(settings.embedder.provider, EmbeddingProvider::OpenAi);
            Ok(())
        });
    }

    #[test]
    fn test_file_then_env_override() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                [engine]
                top_k = 8
                no_context_policy = "fallback"
                dimension = 768

                [embedder]
                provider = "ollama"
                model = "nomic-embed-text"
                dimensions = 768

                [generator]
                provider = "watsonx"
                "#,
            )?;
            jail.set_env("DOCQA_ENGINE__TOP_K", "3");
            jail.set_env("WATSONX_API_KEY", "secret");
            jail.set_env("WATSONX_PROJECT_ID", "project");

            let settings = Settings::load(None).unwrap();
            assert_eq!(settings.engine.top_k, 3);
            assert_eq!(settings.engine.no_context_policy, NoContextPolicy::Fallback);
            assert_eq!(settings.engine.context_budget, 6000);
            assert_eq!(settings.embedder.model, "nomic-embed-text");
            assert_eq!(settings.generator.provider, GenerationProvider::Watsonx);
            assert_eq!(settings.generator.api_key.as_deref(), Some("secret"));
            assert_eq!(settings.generator.project_id.as_deref(), Some("project"));
            Ok(())
        });
    }

    #[test]
    fn test_missing_explicit_file_rejected() {
        Jail::expect_with(|_jail| {
            let err = Settings::load(Some(Path::new("nope.toml"))).unwrap_err();
            assert!(matches!(err, Error::Configuration(_)));
            Ok(())
        });
    }

    #[test]
    fn test_dimension_disagreement_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", "[embedder]\ndimensions = 1536\n")?;
            let err = Settings::load(Some(Path::new("custom.toml"))).unwrap_err();
            assert!(err.to_string().contains("engine.dimension"));
            Ok(())
        });
    }

    #[test]
    fn test_bad_value_is_configuration_error() {
        Jail::expect_with(|jail| {
            jail.set_env("DOCQA_ENGINE__NO_CONTEXT_POLICY", "sometimes");
            let err = Settings::load(None).unwrap_err();
            assert!(matches!(err, Error::Configuration(_)));
            Ok(())
        });
    }
}
