use colored::Colorize;
use serde::Serialize;

use crate::lexer::Span;

/// A single positioned diagnostic. The byte offsets reference the source
/// buffer the error was produced from; rendering needs that buffer back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileError {
    pub offset: usize,
    pub line: u32,
    pub line_start: usize,
    pub message: String,
}

impl CompileError {
    pub fn col(&self) -> usize {
        self.offset.saturating_sub(self.line_start)
    }
}

/// Shared accumulator for every compilation stage. Stages append and keep
/// going; compilation succeeded iff the list stays empty.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ErrorState {
    pub errors: Vec<CompileError>,
}

impl ErrorState {
    pub fn new() -> ErrorState {
        ErrorState::default()
    }

    pub fn push(&mut self, span: Span, message: String) {
        self.errors.push(CompileError {
            offset: span.offset,
            line: span.line,
            line_start: span.line_start,
            message,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn count(&self) -> usize {
        self.errors.len()
    }

    /// Plain message list, mostly for assertions in tests.
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(|e| e.message.clone()).collect()
    }

    /// Pretty-print every collected error with its source line and a
    /// caret under the offending column.
    pub fn render(&self, filename: &str, source: &str) -> String {
        let mut out = String::new();
        for err in &self.errors {
            let col = err.col();
            let line_end = source[err.line_start.min(source.len())..]
                .find('\n')
                .map(|i| err.line_start + i)
                .unwrap_or(source.len());
            let line_text = &source[err.line_start.min(source.len())..line_end];

            let margin = format!("{}", err.line).len();
            out.push_str(&format!("Error At: {}:{}:{}\n", filename, err.line, col));
            out.push_str(&format!("{:margin$} |\n", ""));
            out.push_str(&format!("{} | {}\n", err.line, line_text));
            out.push_str(&format!("{:margin$} | {:col$}{}\n", "", "", "^".red()));
            out.push_str(&format!("{}\n", err.message.red()));
        }
        out
    }
}
