//! Snapshot and end-to-end tests for the CLI layer

use async_trait::async_trait;
use figment::Jail;
use insta::assert_yaml_snapshot;
use std::sync::Arc;
use std::time::Duration;

use docqa_core::{Embedder, Error, ErrorKind, Generation, Generator, Stage, VectorIndex};
use docqa_rag::{EngineContext, QueryEngine};

use crate::{
    AskOptions, CorpusRecord, Result, Settings, ask, ask_once, run_then_shutdown, seed_index,
};

struct AxisEmbedder;

#[async_trait]
impl Embedder for AxisEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|_| vec![1.0, 0.0]).collect())
    }

    fn dimensions(&self) -> usize {
        2
    }

    fn model_name(&self) -> &str {
        "axis"
    }
}

struct SlowGenerator(Duration);

#[async_trait]
impl Generator for SlowGenerator {
    async fn generate(&self, _prompt: &str, _max_output: u32) -> Result<Generation> {
        tokio::time::sleep(self.0).await;
        Ok(Generation {
            text: "done".to_string(),
            tokens_used: 1,
        })
    }

    fn model_id(&self) -> &str {
        "slow"
    }
}

async fn engine(delay: Duration) -> QueryEngine {
    let mut settings = Settings::default();
    settings.engine.dimension = 2;
    let context = EngineContext::in_memory(
        settings.engine,
        Arc::new(AxisEmbedder),
        Arc::new(SlowGenerator(delay)),
    )
    .unwrap();

    let records = vec![CorpusRecord {
        id: "guide-1".to_string(),
        text: "Restart the service with systemctl.".to_string(),
        metadata: Default::default(),
    }];
    seed_index(records, context.embedder().as_ref(), context.index().as_ref(), 8)
        .await
        .unwrap();
    QueryEngine::new(context)
}

#[tokio::test]
async fn test_ask_answers_from_seeded_corpus() {
    let engine = engine(Duration::from_millis(1)).await;
    let answer = ask(&engine, "How do I restart?", &AskOptions::default())
        .await
        .unwrap();
    assert_eq!(answer.text, "done");
    assert_eq!(answer.sources[0].id, "guide-1");
}

#[tokio::test]
async fn test_ask_timeout_cancels_generation() {
    let engine = engine(Duration::from_secs(30)).await;
    let options = AskOptions {
        timeout: Some(Duration::from_millis(20)),
        filter: None,
    };
    let err = ask(&engine, "How do I restart?", &options).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(err.stage, Stage::Generating);
}

#[tokio::test]
async fn test_ask_once_reports_failure_without_erroring() {
    let slow = engine(Duration::from_secs(30)).await;
    let options = AskOptions {
        timeout: Some(Duration::from_millis(20)),
        filter: None,
    };
    let answered = ask_once(&slow, "How do I restart?", &options, false)
        .await
        .unwrap();
    assert!(!answered);

    let quick = engine(Duration::from_millis(1)).await;
    let answered = ask_once(&quick, "How do I restart?", &AskOptions::default(), true)
        .await
        .unwrap();
    assert!(answered);
}

#[tokio::test]
async fn test_shutdown_runs_after_failed_command() {
    let engine = engine(Duration::from_millis(1)).await;
    let outcome: Result<()> = run_then_shutdown(&engine, async {
        Err(Error::ResourceExhausted("pool busy".to_string()))
    })
    .await;

    assert!(matches!(outcome, Err(Error::ResourceExhausted(_))));
    let pool = engine.context().index().connection_stats().unwrap();
    assert_eq!(pool["closed"], true);
}

#[test]
fn test_layered_engine_settings_snapshot() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "docqa.toml",
            r#"
            [engine]
            top_k = 8
            context_budget = 3000
            metric = "squared_euclidean"
            "#,
        )?;
        jail.set_env("DOCQA_ENGINE__NO_CONTEXT_POLICY", "fallback");
        jail.set_env("DOCQA_ENGINE__POOL_SIZE", "8");

        let settings = Settings::load(None).unwrap();
        assert_yaml_snapshot!(settings.engine, @r###"
        top_k: 8
        context_budget: 3000
        max_output_tokens: 512
        max_retries: 3
        retry_backoff_base_ms: 200
        retry_backoff_max_ms: 5000
        pool_size: 8
        pool_wait_timeout_ms: 2000
        no_context_policy: fallback
        max_query_chars: 4096
        metric: squared_euclidean
        dimension: 384
        "###);
        Ok(())
    });
}
