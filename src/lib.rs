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

pub mod assembler;
pub mod ast;
pub mod config;
pub mod emitter;
pub mod errors;
pub mod file_reader;
pub mod logging;
pub mod parser;

use std::path::Path;

use anyhow::{Context, Result};

use assembler::resolver::ResolveStats;
use assembler::symbol_table::SymbolTable;
use ast::Word;
use config::Config;
use errors::{Diagnostic, DiagnosticKind, DiagnosticSink, Severity};
use file_reader::FileReader;

extern crate pest;
extern crate pest_derive;

pub struct AssemblyOutput {
    pub words: Vec<Word>,
    pub symbols: SymbolTable,
    pub stats: ResolveStats,
    pub diagnostics: Vec<Diagnostic>,
}

impl AssemblyOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

// The whole pipeline as a pure function of (source, config): no I/O, no
// ambient state, diagnostics accumulated and returned in stable order.
pub fn assemble(source: &str, config: &Config) -> AssemblyOutput {
    let mut diags = DiagnosticSink::new();

    // width_config is the one fatal check; it runs before parsing
    if let Err(reason) = config.validate() {
        diags.error(DiagnosticKind::WidthConfig, None, reason);
        return AssemblyOutput {
            words: Vec::new(),
            symbols: SymbolTable::new(),
            stats: ResolveStats::default(),
            diagnostics: diags.into_sorted(),
        };
    }

    let mut program = parser::parse_source(source, &mut diags);

    let mut symbols = assembler::build_macro_table(&program, &mut diags);
    assembler::layout::assign_addresses(&mut program, config, &mut symbols, &mut diags);
    symbols.evaluate_macros(&mut diags);
    let stats = assembler::resolver::resolve_cells(&mut program, &symbols, &mut diags);
    let words = assembler::encoder::encode_program(&program, config, &mut diags);

    AssemblyOutput {
        words,
        symbols,
        stats,
        diagnostics: diags.into_sorted(),
    }
}

pub fn assemble_file<F: FileReader>(
    source_path: &Path,
    config: &Config,
    reader: &F,
) -> Result<AssemblyOutput> {
    let source = reader
        .read_to_string(source_path)
        .with_context(|| format!("Failed to read input file: {}", source_path.display()))?;
    Ok(assemble(&source, config))
}
