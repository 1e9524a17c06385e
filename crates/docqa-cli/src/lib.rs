//! CLI interface for DocQA

mod ask;
mod corpus;
mod logging;
mod settings;
mod ui;

#[cfg(test)]
mod tests;

pub use ask::{
    AskOptions, ask, ask_once, parse_filter, print_stats, run_interactive, run_then_shutdown,
};
pub use corpus::{CorpusRecord, EMBED_BATCH_SIZE, read_corpus, seed_index};
pub use logging::{DEFAULT_FILTER, init_logging};
pub use settings::{CONFIG_FILE, ENV_PREFIX, Settings};
pub use ui::{display_banner, print_help, read_question, render_answer, render_error};

// Re-export core types
pub use docqa_core::{Error, Result};
