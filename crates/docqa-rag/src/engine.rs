//! Query engine: retrieval, prompt assembly and generation for one question

use serde_json::json;
use std::sync::Arc;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use docqa_core::{
    AnswerError, AnswerResult, CallContext, Error, MetadataFilter, NoContextPolicy, Result,
    Stage, Usage,
};

use crate::context::EngineContext;
use crate::prompt::{build_fallback_prompt, build_prompt};
use crate::retriever::Retriever;

/// Per-call options for [`QueryEngine::answer_with`]
#[derive(Debug, Clone, Default)]
pub struct AnswerOptions {
    pub filter: Option<MetadataFilter>,
    pub call: CallContext,
}

impl AnswerOptions {
    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_call(mut self, call: CallContext) -> Self {
        self.call = call;
        self
    }
}

/// Answers questions against the indexed corpus.
///
/// Calls share nothing but the [`EngineContext`]; the engine is cheap to
/// clone and safe to use from many tasks at once.
#[derive(Clone)]
pub struct QueryEngine {
    context: Arc<EngineContext>,
    retriever: Retriever,
}

impl QueryEngine {
    pub fn new(context: EngineContext) -> Self {
        let retriever = Retriever::new(
            Arc::clone(context.embedder()),
            Arc::clone(context.index()),
        );
        Self {
            context: Arc::new(context),
            retriever,
        }
    }

    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    pub async fn answer(&self, query: &str) -> std::result::Result<AnswerResult, AnswerError> {
        self.answer_with(query, &AnswerOptions::default()).await
    }

    pub async fn answer_with(
        &self,
        query: &str,
        options: &AnswerOptions,
    ) -> std::result::Result<AnswerResult, AnswerError> {
        let span = info_span!("answer", query_id = %Uuid::new_v4());
        async {
            let result = self.run(query, options).await;
            match &result {
                Ok(answer) => info!(
                    sources = answer.sources.len(),
                    generation_tokens = answer.usage.generation_tokens,
                    "answer complete"
                ),
                Err(err) => warn!(stage = %err.stage, kind = %err.kind(), error = %err.source, "answer failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        query: &str,
        options: &AnswerOptions,
    ) -> std::result::Result<AnswerResult, AnswerError> {
        let config = self.context.config();
        let call = &options.call;

        self.validate_query(query)
            .map_err(|e| AnswerError::new(Stage::Start, e))?;

        debug!(stage = %Stage::Retrieving, top_k = config.top_k, "retrieving context");
        let retrieved = self
            .retriever
            .retrieve_with(
                query,
                config.top_k,
                config.context_budget,
                options.filter.as_ref(),
                call,
            )
            .await;

        let context = match retrieved {
            Ok(context) if context.is_empty() => {
                info!(budget = config.context_budget, "top passage exceeds the context budget");
                None
            }
            Ok(context) => Some(context),
            Err(Error::NoResults(message)) => {
                info!(%message, "retrieval found no passages");
                None
            }
            Err(err) => return Err(AnswerError::new(Stage::Retrieving, err)),
        };

        let (prompt, sources) = match context {
            Some(context) => {
                debug!(
                    stage = %Stage::Assembling,
                    passages = context.len(),
                    used = context.used(),
                    budget = context.budget(),
                    "assembling prompt"
                );
                (build_prompt(&context, query), context.sources())
            }
            None => match config.no_context_policy {
                NoContextPolicy::Fail => {
                    return Err(AnswerError::new(
                        Stage::NoContextFallback,
                        Error::NoContext("no indexed passage supports this question".to_string()),
                    ));
                }
                NoContextPolicy::Fallback => {
                    debug!(stage = %Stage::NoContextFallback, "answering without sources");
                    (build_fallback_prompt(query), Vec::new())
                }
            },
        };

        debug!(stage = %Stage::Generating, prompt_chars = prompt.len(), "generating answer");
        let generation = call
            .run(
                self.context
                    .generator()
                    .generate(&prompt, config.max_output_tokens),
            )
            .await
            .map_err(|e| AnswerError::new(Stage::Generating, e))?;

        debug!(stage = %Stage::Done, "packaging answer");
        Ok(AnswerResult {
            text: generation.text,
            sources,
            usage: Usage {
                embedding_calls: 1,
                generation_tokens: generation.tokens_used,
            },
        })
    }

    fn validate_query(&self, query: &str) -> Result<()> {
        if query.trim().is_empty() {
            return Err(Error::InvalidArgument("query must not be empty".to_string()));
        }
        let max = self.context.config().max_query_chars;
        let chars = query.chars().count();
        if chars > max {
            return Err(Error::InvalidArgument(format!(
                "query is {chars} characters, limit is {max}"
            )));
        }
        Ok(())
    }

    /// Index and model statistics
    pub async fn stats(&self) -> Result<serde_json::Value> {
        let index = self.context.index();
        let indexed_chunks = index.count().await?;

        Ok(json!({
            "embedding_model": self.context.embedder().model_name(),
            "generation_model": self.context.generator().model_id(),
            "dimension": index.dimension(),
            "metric": index.metric().to_string(),
            "indexed_chunks": indexed_chunks,
            "pool": index.connection_stats(),
        }))
    }
}
