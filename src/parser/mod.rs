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

pub(crate) mod cell_builder;

use std::collections::HashSet;

use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

use crate::ast::*;
use crate::errors::{DiagnosticKind, DiagnosticSink};

// Derive the parser from our grammar file.
#[derive(Parser)]
#[grammar = "./grammar.pest"]
pub struct PolyParser;

// Main parsing function that takes the entire source code string.
pub fn parse_source(source: &str, diags: &mut DiagnosticSink) -> Program {
    parse_blocks(&scan_source(source), diags)
}

// Comment stripping and line numbering. Blank lines are kept so numbering
// never shifts.
pub fn scan_source(source: &str) -> Vec<SourceLine> {
    source
        .lines()
        .enumerate()
        .map(|(index, raw)| SourceLine {
            number: index as u32 + 1,
            text: strip_comment(raw).trim().to_string(),
        })
        .collect()
}

// Removes a `//` comment, leaving quoted cell contents alone.
fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    let mut in_quote = false;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => in_quote = !in_quote,
            b'/' if !in_quote && i + 1 < bytes.len() && bytes[i + 1] == b'/' => {
                return &line[..i];
            }
            _ => {}
        }
        i += 1;
    }
    line
}

enum LineStmt {
    Function(String),
    Memory(String),
    Macro(MacroDecl),
    Instruction(InstructionStmt),
    Row(DataRow),
}

// One line in, one classified statement out (or a diagnostic).
fn classify(line: &SourceLine, diags: &mut DiagnosticSink) -> Option<LineStmt> {
    let parsed = match PolyParser::parse(Rule::line, &line.text) {
        Ok(mut pairs) => pairs.next()?,
        Err(_) => {
            if line.text.starts_with("function") {
                diags.error(
                    DiagnosticKind::Parse,
                    Some(line.number),
                    format!("malformed function header: `{}`", line.text),
                );
            } else if line.text.starts_with("#memory") {
                diags.error(
                    DiagnosticKind::Parse,
                    Some(line.number),
                    format!("malformed memory header: `{}`", line.text),
                );
            } else if line.text.starts_with("#macro") {
                diags.error(
                    DiagnosticKind::Parse,
                    Some(line.number),
                    format!("malformed macro declaration: `{}`", line.text),
                );
            } else {
                diags.error(
                    DiagnosticKind::Lex,
                    Some(line.number),
                    format!("unrecognized line: `{}`", line.text),
                );
            }
            return None;
        }
    };

    for pair in parsed.into_inner() {
        match pair.as_rule() {
            Rule::function_header => return Some(LineStmt::Function(named(pair))),
            Rule::memory_header => return Some(LineStmt::Memory(named(pair))),
            Rule::macro_decl => return Some(LineStmt::Macro(build_macro(pair, line.number))),
            Rule::instruction => {
                return Some(LineStmt::Instruction(build_instruction(pair, line.number)));
            }
            Rule::data_row => return build_data_row(pair, line.number, diags).map(LineStmt::Row),
            _ => {}
        }
    }
    None
}

// First `name` pair inside a header or alias tag.
fn named(pair: Pair<Rule>) -> String {
    pair.into_inner()
        .find(|p| p.as_rule() == Rule::name)
        .map(|p| p.as_str().to_string())
        .unwrap_or_default()
}

fn build_macro(pair: Pair<Rule>, line: u32) -> MacroDecl {
    let mut name = String::new();
    let mut value = Expr::Empty;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::name => name = p.as_str().to_string(),
            Rule::expression => value = cell_builder::build_expr(p),
            _ => {}
        }
    }
    MacroDecl { name, value, line }
}

fn build_instruction(pair: Pair<Rule>, line: u32) -> InstructionStmt {
    let mut opcode = String::new();
    let mut cells = Vec::new();
    let mut alias = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::mnemonic => opcode = p.as_str().to_string(),
            Rule::cell => cells.push(cell_builder::build_cell(p)),
            Rule::alias_tag => alias = Some(named(p)),
            _ => {}
        }
    }
    let mut slots = [Cell::empty(), Cell::empty(), Cell::empty()];
    for (slot, cell) in slots.iter_mut().zip(cells) {
        *slot = cell;
    }
    InstructionStmt {
        opcode,
        cells: slots,
        alias,
        line,
    }
}

fn build_data_row(pair: Pair<Rule>, line: u32, diags: &mut DiagnosticSink) -> Option<DataRow> {
    let mut cells = Vec::new();
    let mut alias = None;
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::row_cell => cells.push(cell_builder::build_row_cell(p)),
            Rule::alias_tag => alias = Some(named(p)),
            _ => {}
        }
    }
    if cells.len() != 4 {
        diags.error(
            DiagnosticKind::Lex,
            Some(line),
            format!("data row must have exactly four cells, found {}", cells.len()),
        );
        return None;
    }
    let mut slots = [Cell::empty(), Cell::empty(), Cell::empty(), Cell::empty()];
    for (slot, cell) in slots.iter_mut().zip(cells) {
        *slot = cell;
    }
    Some(DataRow {
        cells: slots,
        alias,
        line,
    })
}

// Groups classified lines into blocks. A header opens a block and the block
// closes on the next header or end of input; macro declarations are collected
// wherever they appear.
pub fn parse_blocks(lines: &[SourceLine], diags: &mut DiagnosticSink) -> Program {
    let mut program = Program::default();
    let mut current: Option<Block> = None;
    let mut function_names: HashSet<String> = HashSet::new();
    let mut memory_names: HashSet<String> = HashSet::new();
    // set while swallowing the body of a duplicate block
    let mut skipping = false;

    for line in lines {
        if line.text.is_empty() {
            continue;
        }
        let Some(stmt) = classify(line, diags) else {
            continue;
        };
        match stmt {
            LineStmt::Macro(decl) => program.macros.push(decl),
            LineStmt::Function(name) => {
                close_block(&mut current, &mut program);
                if !function_names.insert(name.clone()) {
                    diags.error(
                        DiagnosticKind::Parse,
                        Some(line.number),
                        format!("duplicate function name `{}`", name),
                    );
                    skipping = true;
                } else {
                    skipping = false;
                    current = Some(Block::Function(FunctionBlock {
                        name,
                        line: line.number,
                        start_address: None,
                        instructions: Vec::new(),
                    }));
                }
            }
            LineStmt::Memory(name) => {
                close_block(&mut current, &mut program);
                if !memory_names.insert(name.clone()) {
                    diags.error(
                        DiagnosticKind::Parse,
                        Some(line.number),
                        format!("duplicate memory block name `{}`", name),
                    );
                    skipping = true;
                } else {
                    skipping = false;
                    current = Some(Block::Memory(MemoryBlock {
                        name,
                        line: line.number,
                        start_address: None,
                        rows: Vec::new(),
                    }));
                }
            }
            LineStmt::Instruction(stmt) => match &mut current {
                Some(Block::Function(func)) => func.instructions.push(stmt),
                Some(Block::Memory(_)) => diags.error(
                    DiagnosticKind::Parse,
                    Some(line.number),
                    "instruction inside a memory block",
                ),
                None if skipping => {}
                None => diags.error(
                    DiagnosticKind::Parse,
                    Some(line.number),
                    "statement outside any block",
                ),
            },
            LineStmt::Row(row) => match &mut current {
                Some(Block::Memory(mem)) => mem.rows.push(row),
                Some(Block::Function(_)) => diags.error(
                    DiagnosticKind::Parse,
                    Some(line.number),
                    "data row inside a function block",
                ),
                None if skipping => {}
                None => diags.error(
                    DiagnosticKind::Parse,
                    Some(line.number),
                    "statement outside any block",
                ),
            },
        }
    }
    close_block(&mut current, &mut program);
    program
}

fn close_block(current: &mut Option<Block>, program: &mut Program) {
    if let Some(block) = current.take() {
        program.blocks.push(block);
    }
}

// ------------- unit tests -------------

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_clean(source: &str) -> Program {
        let mut diags = DiagnosticSink::new();
        let program = parse_source(source, &mut diags);
        assert!(!diags.has_errors(), "unexpected diagnostics");
        program
    }

    #[test]
    fn test_scan_strips_comments_and_keeps_numbering() {
        let lines = scan_source("setreg [1] [2] [] // init\n\n// whole line\nnop\n");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0].text, "setreg [1] [2] []");
        assert_eq!(lines[1].text, "");
        assert_eq!(lines[2].text, "");
        assert_eq!(lines[3].number, 4);
        assert_eq!(lines[3].text, "nop");
    }

    #[test]
    fn test_strip_comment_leaves_quotes_alone() {
        assert_eq!(strip_comment("\"a//b\" // tail"), "\"a//b\" ");
        assert_eq!(strip_comment("nop"), "nop");
    }

    #[test]
    fn test_parse_function_block() {
        let program = parse_clean("function main():\n    setreg [1] [2] []\n    nop\n");
        assert_eq!(program.blocks.len(), 1);
        let Block::Function(func) = &program.blocks[0] else {
            panic!("expected a function block");
        };
        assert_eq!(func.name, "main");
        assert_eq!(func.line, 1);
        assert_eq!(func.instructions.len(), 2);
        assert_eq!(func.instructions[0].opcode, "setreg");
        assert_eq!(func.instructions[1].opcode, "nop");
        assert!(!func.instructions[1].cells[0].provided());
    }

    #[test]
    fn test_parse_cell_reference_forms() {
        let program = parse_clean("function f():\n    add [#M] [@a] [g():] #alias here\n");
        let Block::Function(func) = &program.blocks[0] else {
            panic!("expected a function block");
        };
        let stmt = &func.instructions[0];
        assert_eq!(stmt.cells[0].expr, Expr::MacroRef("M".to_string()));
        assert_eq!(stmt.cells[1].expr, Expr::AliasRef("a".to_string()));
        assert_eq!(stmt.cells[2].expr, Expr::FuncRef("g".to_string()));
        assert_eq!(stmt.alias.as_deref(), Some("here"));
    }

    #[test]
    fn test_parse_memory_block_with_alias_row() {
        let program = parse_clean(
            "#memory Boot:\n    \"0x18\", \"0x23\", \"0x12\", \"0x11\"\n    \"1\", \"2\", \"3\", 0x44 #alias tail\n",
        );
        let Block::Memory(mem) = &program.blocks[0] else {
            panic!("expected a memory block");
        };
        assert_eq!(mem.name, "Boot");
        assert_eq!(mem.rows.len(), 2);
        assert_eq!(mem.rows[0].cells[0].expr, Expr::Literal(0x18));
        assert_eq!(mem.rows[1].cells[3].expr, Expr::Literal(0x44));
        assert_eq!(mem.rows[1].alias.as_deref(), Some("tail"));
    }

    #[test]
    fn test_macro_declarations_collect_anywhere() {
        let program = parse_clean("#macro A 1\nfunction f():\n    nop\n#macro B #A\n");
        assert_eq!(program.macros.len(), 2);
        assert_eq!(program.macros[0].name, "A");
        assert_eq!(program.macros[1].value, Expr::MacroRef("A".to_string()));
        assert_eq!(program.blocks.len(), 1);
    }

    #[test]
    fn test_duplicate_function_is_parse_error_and_skipped() {
        let mut diags = DiagnosticSink::new();
        let program = parse_source("function f():\n    nop\nfunction f():\n    halt\n", &mut diags);
        let sorted = diags.into_sorted();
        assert_eq!(sorted.len(), 1);
        assert_eq!(sorted[0].kind, DiagnosticKind::Parse);
        assert_eq!(program.blocks.len(), 1);
        let Block::Function(func) = &program.blocks[0] else {
            panic!("expected a function block");
        };
        assert_eq!(func.instructions.len(), 1);
    }

    #[test]
    fn test_unrecognized_line_is_lex_error() {
        let mut diags = DiagnosticSink::new();
        parse_source("function f():\n    ???\n", &mut diags);
        let sorted = diags.into_sorted();
        assert_eq!(sorted.len(), 1);
        assert_eq!(sorted[0].kind, DiagnosticKind::Lex);
        assert_eq!(sorted[0].line, Some(2));
    }

    #[test]
    fn test_malformed_header_is_parse_error() {
        let mut diags = DiagnosticSink::new();
        parse_source("function broken(:\n", &mut diags);
        let sorted = diags.into_sorted();
        assert_eq!(sorted.len(), 1);
        assert_eq!(sorted[0].kind, DiagnosticKind::Parse);
    }

    #[test]
    fn test_statement_outside_block() {
        let mut diags = DiagnosticSink::new();
        parse_source("nop\nfunction f():\n    nop\n", &mut diags);
        let sorted = diags.into_sorted();
        assert_eq!(sorted.len(), 1);
        assert_eq!(sorted[0].kind, DiagnosticKind::Parse);
        assert_eq!(sorted[0].line, Some(1));
    }

    #[test]
    fn test_row_in_function_and_instruction_in_memory() {
        let mut diags = DiagnosticSink::new();
        parse_source(
            "function f():\n    \"1\", \"2\", \"3\", \"4\"\n#memory m:\n    nop\n",
            &mut diags,
        );
        let sorted = diags.into_sorted();
        assert_eq!(sorted.len(), 2);
        assert!(sorted.iter().all(|d| d.kind == DiagnosticKind::Parse));
    }

    #[test]
    fn test_row_requires_four_cells() {
        let mut diags = DiagnosticSink::new();
        parse_source("#memory m:\n    \"1\", \"2\", \"3\"\n", &mut diags);
        let sorted = diags.into_sorted();
        assert_eq!(sorted.len(), 1);
        assert_eq!(sorted[0].kind, DiagnosticKind::Lex);
    }

    #[test]
    fn test_blank_lines_do_not_close_blocks() {
        let program = parse_clean("function f():\n    nop\n\n    halt\n");
        let Block::Function(func) = &program.blocks[0] else {
            panic!("expected a function block");
        };
        assert_eq!(func.instructions.len(), 2);
    }
}
