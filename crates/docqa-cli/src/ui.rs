//! UI utilities for the CLI

use colored::*;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    terminal::{disable_raw_mode, enable_raw_mode, size},
};
use std::io::{self, IsTerminal, Write};

use docqa_core::{AnswerError, AnswerResult, Result};

const PROMPT: &str = "docqa>";

/// Display startup banner
pub fn display_banner(indexed_chunks: usize, model: &str) {
    let terminal_width = size().map(|(w, _)| w as usize).unwrap_or(80);
    let banner_width = terminal_width.saturating_sub(4).clamp(40, 67);

    let top_border = format!("┌{}┐", "─".repeat(banner_width - 2));
    let bottom_border = format!("└{}┘", "─".repeat(banner_width - 2));
    let empty_line = format!("│{}│", " ".repeat(banner_width - 2));

    let lines = [
        "DocQA - answers from your documents".to_string(),
        String::new(),
        format!("Indexed chunks: {indexed_chunks}"),
        format!("Model: {model}"),
        String::new(),
        "Ctrl-C cancels a running question".to_string(),
    ];

    println!();
    println!("{}", top_border.blue());
    println!("{}", empty_line.blue());
    for line in &lines {
        if line.is_empty() {
            println!("{}", empty_line.blue());
            continue;
        }
        let text: String = line.chars().take(banner_width - 4).collect();
        let padding = banner_width - 4 - text.chars().count();
        println!("{}", format!("│  {}{}│", text, " ".repeat(padding)).blue());
    }
    println!("{}", empty_line.blue());
    println!("{}", bottom_border.blue());
    println!();
    println!(
        "{}",
        "Tip: ask a question in plain language, or 'help' for commands".dimmed()
    );
    println!();
}

/// Display help message
pub fn print_help() {
    println!("{}", "Available commands:".bold());
    println!("  {} - Ask a question about the indexed documents", "<question>".green());
    println!("  {} - Show index and model statistics", "stats".green());
    println!("  {} - Show this help message", "help".green());
    println!("  {} - Exit the application", "exit/quit".green());
}

/// Format an answer with numbered sources and usage.
pub fn render_answer(answer: &AnswerResult) -> String {
    let mut out = String::new();
    out.push_str(answer.text.trim());
    out.push_str("\n\n");

    if answer.sources.is_empty() {
        out.push_str(&format!(
            "{}\n",
            "Sources: none (answered without retrieved context)".yellow()
        ));
    } else {
        out.push_str(&format!("{}\n", "Sources:".bold()));
        for (i, source) in answer.sources.iter().enumerate() {
            out.push_str(&format!(
                "  [{}] {} {}\n",
                i + 1,
                source.id.cyan(),
                format!("(score {:.3})", source.score).dimmed()
            ));
        }
    }

    out.push_str(&format!(
        "{}",
        format!(
            "\nusage: {} embedding call(s), {} generation tokens",
            answer.usage.embedding_calls, answer.usage.generation_tokens
        )
        .dimmed()
    ));
    out
}

pub fn render_error(err: &AnswerError) -> String {
    format!(
        "{} {} during {}: {}",
        "✗".red(),
        err.kind().to_string().red().bold(),
        err.stage,
        err.source
    )
}

/// Read one question with history navigation (↑/↓).
///
/// Returns `None` on Ctrl-C, Ctrl-D or end of input.
pub fn read_question(history: &mut Vec<String>) -> Result<Option<String>> {
    if !io::stdin().is_terminal() {
        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        let input = input.trim().to_string();
        if !input.is_empty() {
            history.push(input.clone());
        }
        return Ok(Some(input));
    }

    enable_raw_mode()?;
    let result = read_raw(history);
    disable_raw_mode()?;
    println!();
    result
}

fn redraw(input: &str) -> Result<()> {
    print!("\r{} {}\x1b[K", PROMPT.green().bold(), input);
    io::stdout().flush()?;
    Ok(())
}

fn read_raw(history: &mut Vec<String>) -> Result<Option<String>> {
    let mut input = String::new();
    let mut history_index: Option<usize> = None;
    redraw(&input)?;

    loop {
        let Event::Key(key_event) = event::read()? else {
            continue;
        };
        let ctrl = key_event.modifiers.contains(KeyModifiers::CONTROL);
        match key_event.code {
            KeyCode::Char('c') | KeyCode::Char('d') if ctrl => return Ok(None),
            KeyCode::Enter => {
                let input = input.trim().to_string();
                if !input.is_empty() {
                    history.push(input.clone());
                }
                return Ok(Some(input));
            }
            KeyCode::Char(c) => {
                input.push(c);
                redraw(&input)?;
            }
            KeyCode::Backspace => {
                input.pop();
                redraw(&input)?;
            }
            KeyCode::Up if !history.is_empty() => {
                let new_index = match history_index {
                    None => history.len() - 1,
                    Some(idx) => idx.saturating_sub(1),
                };
                history_index = Some(new_index);
                input = history[new_index].clone();
                redraw(&input)?;
            }
            KeyCode::Down => {
                if let Some(idx) = history_index {
                    if idx + 1 < history.len() {
                        history_index = Some(idx + 1);
                        input = history[idx + 1].clone();
                    } else {
                        history_index = None;
                        input.clear();
                    }
                    redraw(&input)?;
                }
            }
            KeyCode::Esc => {
                input.clear();
                history_index = None;
                redraw(&input)?;
            }
            _ => {}
        }
    }
}
