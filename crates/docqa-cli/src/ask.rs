//! Asking questions: one-shot and interactive

use colored::*;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use docqa_core::{
    AnswerError, AnswerResult, CallContext, Error, MetadataFilter, MetadataValue, Result,
};
use docqa_rag::{AnswerOptions, QueryEngine};

use crate::ui::{display_banner, print_help, read_question, render_answer, render_error};

/// Per-question settings taken from the command line
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub timeout: Option<Duration>,
    pub filter: Option<MetadataFilter>,
}

/// Parse `key=value` pairs into a metadata filter. Values that read as a
/// bool, integer or float are matched as such, anything else as text.
pub fn parse_filter(pairs: &[String]) -> Result<Option<MetadataFilter>> {
    if pairs.is_empty() {
        return Ok(None);
    }

    let mut filter = MetadataFilter::new();
    for pair in pairs {
        let (key, value) = pair.split_once('=').ok_or_else(|| {
            Error::InvalidArgument(format!("filter '{}' is not key=value", pair))
        })?;
        let key = key.trim();
        if key.is_empty() {
            return Err(Error::InvalidArgument(format!("filter '{}' has no key", pair)));
        }
        filter = filter.eq(key, parse_value(value.trim()));
    }
    Ok(Some(filter))
}

fn parse_value(raw: &str) -> MetadataValue {
    if let Ok(v) = raw.parse::<bool>() {
        MetadataValue::Bool(v)
    } else if let Ok(v) = raw.parse::<i64>() {
        MetadataValue::Int(v)
    } else if let Ok(v) = raw.parse::<f64>() {
        MetadataValue::Float(v)
    } else {
        MetadataValue::Text(raw.to_string())
    }
}

/// Answer one question; Ctrl-C while it runs cancels the in-flight call.
pub async fn ask(
    engine: &QueryEngine,
    question: &str,
    options: &AskOptions,
) -> std::result::Result<AnswerResult, AnswerError> {
    let token = CancellationToken::new();
    let mut call = CallContext::new().with_token(token.clone());
    if let Some(timeout) = options.timeout {
        call = call.with_timeout(timeout);
    }

    let watcher = tokio::spawn({
        let token = token.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("interrupt received, cancelling question");
                token.cancel();
            }
        }
    });

    let mut answer_options = AnswerOptions::default().with_call(call);
    if let Some(filter) = &options.filter {
        answer_options = answer_options.with_filter(filter.clone());
    }
    let result = engine.answer_with(question, &answer_options).await;

    watcher.abort();
    result
}

/// Answer one question and print it, as JSON when `json` is set.
///
/// A failed question is rendered to stderr and reported as `Ok(false)`.
pub async fn ask_once(
    engine: &QueryEngine,
    question: &str,
    options: &AskOptions,
    json: bool,
) -> Result<bool> {
    match ask(engine, question, options).await {
        Ok(answer) if json => {
            println!("{}", serde_json::to_string_pretty(&answer)?);
            Ok(true)
        }
        Ok(answer) => {
            println!("{}", render_answer(&answer));
            Ok(true)
        }
        Err(err) => {
            eprintln!("{}", render_error(&err));
            Ok(false)
        }
    }
}

pub async fn print_stats(engine: &QueryEngine, json: bool) -> Result<()> {
    let stats = engine.stats().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", "Index statistics".bold());
    if let Some(fields) = stats.as_object() {
        for (key, value) in fields {
            println!("  {}: {}", key.green(), value);
        }
    }
    Ok(())
}

/// Await `work`, then shut the engine down whatever it returned.
pub async fn run_then_shutdown<T>(engine: &QueryEngine, work: impl Future<Output = T>) -> T {
    let outcome = work.await;
    engine.context().shutdown();
    outcome
}

/// Read-answer loop until `exit`, Ctrl-C at the prompt or end of input.
pub async fn run_interactive(engine: &QueryEngine, options: &AskOptions) -> Result<()> {
    let stats = engine.stats().await?;
    let indexed = stats["indexed_chunks"].as_u64().unwrap_or(0) as usize;
    display_banner(indexed, engine.context().generator().model_id());

    let mut history = Vec::new();
    while let Some(input) = read_question(&mut history)? {
        match input.to_lowercase().as_str() {
            "" => continue,
            "exit" | "quit" => break,
            "help" => print_help(),
            "stats" => println!("{}", serde_json::to_string_pretty(&engine.stats().await?)?),
            _ => {
                println!("{}", "Thinking...".blue());
                match ask(engine, &input, options).await {
                    Ok(answer) => println!("\n{}\n", render_answer(&answer)),
                    Err(err) => println!("{}\n", render_error(&err)),
                }
            }
        }
    }

    println!("{}", "Goodbye!".green());
    Ok(())
}
