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

use crate::ast::{Block, Program};
use crate::config::Config;
use crate::errors::{DiagnosticKind, DiagnosticSink};

use super::symbol_table::SymbolTable;

struct RangeInfo {
    start: u32,
    len: u32,
    name: String,
    line: u32,
}

impl RangeInfo {
    fn end(&self) -> u32 {
        self.start + self.len
    }

    fn intersects(&self, other: &RangeInfo) -> bool {
        self.start < other.end() && other.start < self.end()
    }
}

// Runs once, after parsing and before resolution: assigns every block its
// start address, publishes the address-bearing name-spaces (functions,
// memories, aliases), and reports range collisions. Addresses are frozen
// from here on.
//
// Functions fill the code section sequentially from the code offset. When
// the data offset bounds the code section from above, a function that would
// run past it restarts at the code offset; overlap detection then reports
// the collision against the blocks already placed there.
pub fn assign_addresses(
    program: &mut Program,
    config: &Config,
    symbols: &mut SymbolTable,
    diags: &mut DiagnosticSink,
) {
    let code_base = config.sections.code;
    let code_end = (config.sections.data > code_base).then_some(config.sections.data);
    let mut code_cursor = code_base;
    let mut data_cursor = config.sections.data;
    let mut code_ranges: Vec<RangeInfo> = Vec::new();
    let mut data_ranges: Vec<RangeInfo> = Vec::new();

    for block in &mut program.blocks {
        match block {
            Block::Function(func) => {
                let len = func.instructions.len() as u32;
                if let Some(end) = code_end {
                    if code_cursor > code_base && code_cursor + len > end {
                        code_cursor = code_base;
                    }
                }
                func.start_address = Some(code_cursor);
                symbols.define_function(&func.name, code_cursor, len, func.line);
                for (index, stmt) in func.instructions.iter().enumerate() {
                    if let Some(alias) = &stmt.alias {
                        symbols.define_alias(alias, code_cursor + index as u32, stmt.line, diags);
                    }
                }
                code_ranges.push(RangeInfo {
                    start: code_cursor,
                    len,
                    name: func.name.clone(),
                    line: func.line,
                });
                code_cursor += len;
            }
            Block::Memory(mem) => {
                let len = mem.rows.len() as u32;
                mem.start_address = Some(data_cursor);
                symbols.define_memory(&mem.name, data_cursor, len, mem.line);
                for (index, row) in mem.rows.iter().enumerate() {
                    if let Some(alias) = &row.alias {
                        symbols.define_alias(alias, data_cursor + index as u32, row.line, diags);
                    }
                }
                data_ranges.push(RangeInfo {
                    start: data_cursor,
                    len,
                    name: mem.name.clone(),
                    line: mem.line,
                });
                data_cursor += len;
            }
        }
    }

    report_overlaps("function", &code_ranges, diags);
    report_overlaps("memory block", &data_ranges, diags);
}

// Pairwise check of half-open [start, start+len) ranges within one
// name-space. Each intersecting pair is reported once, naming both blocks.
fn report_overlaps(what: &str, ranges: &[RangeInfo], diags: &mut DiagnosticSink) {
    for i in 0..ranges.len() {
        for j in i + 1..ranges.len() {
            let (a, b) = (&ranges[i], &ranges[j]);
            if a.intersects(b) {
                diags.error(
                    DiagnosticKind::Overlap,
                    Some(b.line),
                    format!(
                        "{} `{}` (line {}, words {}..{}) overlaps {} `{}` (line {}, words {}..{})",
                        what,
                        b.name,
                        b.line,
                        b.start,
                        b.end(),
                        what,
                        a.name,
                        a.line,
                        a.start,
                        a.end(),
                    ),
                );
            }
        }
    }
}
