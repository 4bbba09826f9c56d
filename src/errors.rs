/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    #[error("lex_error")]
    Lex,
    #[error("parse_error")]
    Parse,
    #[error("unknown_opcode")]
    UnknownOpcode,
    #[error("unresolved_symbol")]
    UnresolvedSymbol,
    #[error("cycle")]
    Cycle,
    #[error("overlap")]
    Overlap,
    #[error("field_overflow")]
    FieldOverflow,
    #[error("width_config")]
    WidthConfig,
    #[error("redefinition")]
    Redefinition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub line: Option<u32>,
    pub pass: u32,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "line {}: {}: {}", line, self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

// Explicit diagnostic collector threaded through every pipeline stage; the
// pipeline accumulates instead of aborting at the first error. The resolver
// stamps its current pass number so the final order is (line, pass).
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    items: Vec<Diagnostic>,
    pass: u32,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pass(&mut self, pass: u32) {
        self.pass = pass;
    }

    pub fn error(&mut self, kind: DiagnosticKind, line: Option<u32>, message: impl Into<String>) {
        self.push(Severity::Error, kind, line, message.into());
    }

    pub fn warning(&mut self, kind: DiagnosticKind, line: Option<u32>, message: impl Into<String>) {
        self.push(Severity::Warning, kind, line, message.into());
    }

    fn push(&mut self, severity: Severity, kind: DiagnosticKind, line: Option<u32>, message: String) {
        self.items.push(Diagnostic {
            severity,
            kind,
            line,
            pass: self.pass,
            message,
        });
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    // Stable order: source line, then resolver pass, then emission order.
    pub fn into_sorted(mut self) -> Vec<Diagnostic> {
        self.items
            .sort_by_key(|d| (d.line.unwrap_or(0), d.pass));
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_sort_by_line_then_pass() {
        let mut sink = DiagnosticSink::new();
        sink.set_pass(2);
        sink.error(DiagnosticKind::UnresolvedSymbol, Some(7), "late");
        sink.set_pass(0);
        sink.error(DiagnosticKind::Lex, Some(3), "early");
        sink.error(DiagnosticKind::FieldOverflow, Some(7), "same line, earlier pass");
        let sorted = sink.into_sorted();
        assert_eq!(sorted[0].message, "early");
        assert_eq!(sorted[1].message, "same line, earlier pass");
        assert_eq!(sorted[2].message, "late");
    }

    #[test]
    fn test_warnings_are_not_errors() {
        let mut sink = DiagnosticSink::new();
        sink.warning(DiagnosticKind::Redefinition, Some(1), "again");
        assert!(!sink.has_errors());
        sink.error(DiagnosticKind::Cycle, Some(2), "loop");
        assert!(sink.has_errors());
    }

    #[test]
    fn test_display_formats() {
        let mut sink = DiagnosticSink::new();
        sink.error(DiagnosticKind::WidthConfig, None, "widths sum to 29, expected 30");
        sink.error(DiagnosticKind::UnknownOpcode, Some(4), "unknown opcode `frob`");
        let sorted = sink.into_sorted();
        assert_eq!(
            sorted[0].to_string(),
            "width_config: widths sum to 29, expected 30"
        );
        assert_eq!(
            sorted[1].to_string(),
            "line 4: unknown_opcode: unknown opcode `frob`"
        );
    }
}
