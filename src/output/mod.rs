pub mod json;
pub mod text;

use serde::Serialize;

use crate::error::AppResult;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OutputMode {
    Text,
    Json,
}

/// Renders command results either as human-readable lines or as one JSON
/// document on stdout.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    mode: OutputMode,
}

impl Output {
    pub fn new(json: bool) -> Self {
        let mode = if json {
            OutputMode::Json
        } else {
            OutputMode::Text
        };
        Self { mode }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn emit<T: Serialize>(&self, text_line: &str, json_value: &T) -> AppResult<()> {
        match self.mode {
            OutputMode::Text => text::print_lines(std::slice::from_ref(&text_line)),
            OutputMode::Json => json::print(json_value),
        }
    }

    /// Like [`Output::emit`] for listings; an empty listing prints `empty`.
    pub fn emit_lines<S, T>(&self, lines: &[S], empty: &str, json_value: &T) -> AppResult<()>
    where
        S: AsRef<str>,
        T: Serialize,
    {
        match self.mode {
            OutputMode::Text if lines.is_empty() => text::print_lines(&[empty]),
            OutputMode::Text => text::print_lines(lines),
            OutputMode::Json => json::print(json_value),
        }
    }
}
