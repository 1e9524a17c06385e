//! Provider settings

use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

use docqa_core::{Error, Result};

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const OLLAMA_API_URL: &str = "http://localhost:11434";
pub const WATSONX_API_URL: &str = "https://us-south.ml.cloud.ibm.com";
pub const WATSONX_IAM_URL: &str = "iam.cloud.ibm.com";

/// Which embedding adapter to build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProvider {
    #[default]
    OpenAi,
    Ollama,
}

/// Which generation adapter to build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    #[default]
    OpenAi,
    Watsonx,
}

/// Configuration for the embedding provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderSettings {
    pub provider: EmbeddingProvider,
    pub endpoint: Option<String>,
    pub model: String,
    pub api_key: Option<String>,
    pub dimensions: usize,
    pub timeout_secs: u64,
}

impl Default for EmbedderSettings {
    fn default() -> Self {
        Self {
            provider: EmbeddingProvider::OpenAi,
            endpoint: None,
            model: "text-embedding-3-small".to_string(),
            api_key: None,
            dimensions: 384,
            timeout_secs: 30,
        }
    }
}

impl EmbedderSettings {
    pub fn endpoint(&self) -> &str {
        match (&self.endpoint, self.provider) {
            (Some(endpoint), _) => endpoint.trim_end_matches('/'),
            (None, EmbeddingProvider::OpenAi) => OPENAI_API_URL,
            (None, EmbeddingProvider::Ollama) => OLLAMA_API_URL,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Fill a missing API key from well-known variables.
    pub fn fill_credentials(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_key.is_none() && self.provider == EmbeddingProvider::OpenAi {
            self.api_key = lookup("OPENAI_API_KEY");
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_url("embedder endpoint", self.endpoint())?;
        if self.model.trim().is_empty() {
            return Err(Error::Configuration("embedder model must be set".to_string()));
        }
        if self.dimensions == 0 {
            return Err(Error::Configuration(
                "embedder dimensions must be greater than zero".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Configuration(
                "embedder timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.provider == EmbeddingProvider::OpenAi && self.api_key.is_none() {
            return Err(Error::Configuration(
                "OpenAI embedder requires an API key (set OPENAI_API_KEY)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the generation provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    pub provider: GenerationProvider,
    pub endpoint: Option<String>,
    pub model: String,
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub iam_url: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_secs: u64,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            provider: GenerationProvider::OpenAi,
            endpoint: None,
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            project_id: None,
            iam_url: None,
            temperature: None,
            timeout_secs: 60,
        }
    }
}

impl GeneratorSettings {
    pub fn endpoint(&self) -> &str {
        match (&self.endpoint, self.provider) {
            (Some(endpoint), _) => endpoint.trim_end_matches('/'),
            (None, GenerationProvider::OpenAi) => OPENAI_API_URL,
            (None, GenerationProvider::Watsonx) => WATSONX_API_URL,
        }
    }

    pub fn iam_url(&self) -> &str {
        self.iam_url.as_deref().unwrap_or(WATSONX_IAM_URL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Fill missing credentials from well-known variables.
    pub fn fill_credentials(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        match self.provider {
            GenerationProvider::OpenAi => {
                if self.api_key.is_none() {
                    self.api_key = lookup("OPENAI_API_KEY");
                }
            }
            GenerationProvider::Watsonx => {
                if self.api_key.is_none() {
                    self.api_key = lookup("WATSONX_API_KEY").or_else(|| lookup("API_KEY"));
                }
                if self.project_id.is_none() {
                    self.project_id =
                        lookup("WATSONX_PROJECT_ID").or_else(|| lookup("PROJECT_ID"));
                }
                if self.endpoint.is_none() {
                    self.endpoint = lookup("WATSONX_API_URL");
                }
                if self.iam_url.is_none() {
                    self.iam_url = lookup("IAM_IBM_CLOUD_URL");
                }
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        validate_url("generator endpoint", self.endpoint())?;
        if self.model.trim().is_empty() {
            return Err(Error::Configuration("generator model must be set".to_string()));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Configuration(
                "generator timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.api_key.is_none() {
            let hint = match self.provider {
                GenerationProvider::OpenAi => "OPENAI_API_KEY",
                GenerationProvider::Watsonx => "WATSONX_API_KEY",
            };
            return Err(Error::Configuration(format!(
                "generator requires an API key (set {hint})"
            )));
        }
        if self.provider == GenerationProvider::Watsonx {
            if self.project_id.is_none() {
                return Err(Error::Configuration(
                    "watsonx generator requires a project id (set WATSONX_PROJECT_ID)".to_string(),
                ));
            }
            validate_url("IAM endpoint", &format!("https://{}", self.iam_url()))?;
        }
        Ok(())
    }
}

fn validate_url(what: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| Error::Configuration(format!("invalid {what} '{value}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(Error::Configuration(format!(
            "invalid {what} '{value}': unsupported scheme '{scheme}'"
        ))),
    }
}
