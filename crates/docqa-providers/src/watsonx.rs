//! WatsonX AI generation adapter

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use docqa_core::{Error, Generation, Generator, Result};

use crate::config::GeneratorSettings;
use crate::http::{build_client, is_content_policy, send_json, status_error, transport_error};

const PROVIDER: &str = "watsonx";
const API_VERSION: &str = "2023-05-29";

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'a str,
    apikey: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Serialize)]
struct GenerationParams {
    decoding_method: &'static str,
    max_new_tokens: u32,
    min_new_tokens: u32,
    repetition_penalty: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct GenerationRequest<'a> {
    input: &'a str,
    parameters: GenerationParams,
    model_id: &'a str,
    project_id: &'a str,
}

#[derive(Deserialize)]
struct GenerationResults {
    generated_text: String,
    #[serde(default)]
    generated_token_count: u32,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct GenerationData {
    results: Vec<GenerationResults>,
}

fn parse_generation(data: GenerationData) -> Result<Generation> {
    let result = data
        .results
        .into_iter()
        .next()
        .ok_or_else(|| Error::permanent("Empty response from WatsonX API"))?;

    if result
        .stop_reason
        .as_deref()
        .is_some_and(is_content_policy)
    {
        return Err(Error::ContentPolicy(
            "WatsonX stopped generation on a moderation filter".to_string(),
        ));
    }

    Ok(Generation {
        text: result.generated_text,
        tokens_used: result.generated_token_count,
    })
}

/// WatsonX AI client
pub struct WatsonxGenerator {
    client: Client,
    api_key: String,
    project_id: String,
    iam_url: String,
    api_url: String,
    model: String,
    temperature: Option<f32>,
    access_token: RwLock<Option<String>>,
}

impl WatsonxGenerator {
    /// Model constants
    pub const GRANITE_4_H_SMALL: &'static str = "ibm/granite-4-h-small";
    pub const GRANITE_3_3_8B_INSTRUCT: &'static str = "ibm/granite-3-3-8b-instruct";

    pub fn new(settings: &GeneratorSettings) -> Result<Self> {
        let api_key = settings.api_key.clone().ok_or_else(|| {
            Error::Configuration("WATSONX_API_KEY or API_KEY not configured".to_string())
        })?;
        let project_id = settings.project_id.clone().ok_or_else(|| {
            Error::Configuration("WATSONX_PROJECT_ID or PROJECT_ID not configured".to_string())
        })?;

        Ok(Self {
            client: build_client(settings.timeout())?,
            api_key,
            project_id,
            iam_url: settings.iam_url().to_string(),
            api_url: settings.endpoint().to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            access_token: RwLock::new(None),
        })
    }

    /// Return the cached IAM token, exchanging the API key for a new one when needed.
    async fn access_token(&self) -> Result<String> {
        if let Some(token) = self.access_token.read().await.as_ref() {
            return Ok(token.clone());
        }

        let mut slot = self.access_token.write().await;
        if let Some(token) = slot.as_ref() {
            return Ok(token.clone());
        }

        debug!(iam_url = %self.iam_url, "requesting IAM access token");
        let token_request = TokenRequest {
            grant_type: "urn:ibm:params:oauth:grant-type:apikey",
            apikey: &self.api_key,
        };
        let response: TokenResponse = send_json(
            PROVIDER,
            self.client
                .post(format!("https://{}/identity/token", self.iam_url))
                .form(&token_request),
        )
        .await?;

        *slot = Some(response.access_token.clone());
        Ok(response.access_token)
    }

    async fn invalidate_token(&self) {
        *self.access_token.write().await = None;
    }

    /// Map a non-success response to an error. A 401 drops the cached
    /// token so the next attempt re-authenticates.
    async fn failed_response(&self, status: StatusCode, body: &str) -> Error {
        if status == StatusCode::UNAUTHORIZED {
            self.invalidate_token().await;
            return Error::transient("watsonx access token rejected");
        }
        status_error(PROVIDER, status, body)
    }
}

#[async_trait]
impl Generator for WatsonxGenerator {
    async fn generate(&self, prompt: &str, max_output: u32) -> Result<Generation> {
        let access_token = self.access_token().await?;

        let request_body = GenerationRequest {
            input: prompt,
            parameters: GenerationParams {
                decoding_method: "greedy",
                max_new_tokens: max_output,
                min_new_tokens: 1,
                repetition_penalty: 1.1,
                temperature: self.temperature,
            },
            model_id: &self.model,
            project_id: &self.project_id,
        };

        let url = format!(
            "{}/ml/v1/text/generation?version={API_VERSION}",
            self.api_url
        );

        let response = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .bearer_auth(&access_token)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(self.failed_response(status, &error_text).await);
        }

        let data: GenerationData = response
            .json()
            .await
            .map_err(|e| transport_error(PROVIDER, e))?;
        parse_generation(data)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
