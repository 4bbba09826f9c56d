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

use crate::ast::{Block, Expr, Program};
use crate::errors::{DiagnosticKind, DiagnosticSink};

use super::symbol_table::SymbolTable;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolveStats {
    pub passes: u32,
    pub unresolved: usize,
    // unresolved-cell count after each pass; never increases
    pub history: Vec<usize>,
}

// Attempts to fold an expression tree to an integer. Folding succeeds once
// every leaf is known; an unknown name leaves the cell for a later pass.
pub fn fold(expr: &Expr, symbols: &SymbolTable) -> Option<i64> {
    match expr {
        Expr::Empty => Some(0),
        Expr::Literal(value) => Some(*value),
        Expr::MacroRef(name) => symbols.macro_value(name),
        Expr::AliasRef(name) => symbols.alias_address(name).map(i64::from),
        Expr::FuncRef(name) => symbols.function_address(name).map(i64::from),
        Expr::Binary(lhs, op, rhs) => {
            let lhs = fold(lhs, symbols)?;
            let rhs = fold(rhs, symbols)?;
            Some(op.apply(lhs, rhs))
        }
    }
}

// Multi-pass fixed point over every instruction cell and data-row cell. A
// pass is progressing if it resolved at least one new cell; the loop stops on
// the first pass without progress. Termination is guaranteed because the set
// of unresolved cells strictly shrinks on every progressing pass.
pub fn resolve_cells(
    program: &mut Program,
    symbols: &SymbolTable,
    diags: &mut DiagnosticSink,
) -> ResolveStats {
    let mut history = Vec::new();
    let mut pass: u32 = 0;

    loop {
        pass += 1;
        diags.set_pass(pass);
        let mut progressed = false;
        let mut remaining = 0usize;

        for_each_cell(program, |_, cell| {
            if cell.value.is_none() {
                match fold(&cell.expr, symbols) {
                    Some(value) => {
                        cell.value = Some(value);
                        progressed = true;
                    }
                    None => remaining += 1,
                }
            }
        });
        history.push(remaining);

        if !progressed {
            if remaining > 0 {
                for_each_cell(program, |line, cell| {
                    if cell.value.is_none() {
                        diags.error(
                            DiagnosticKind::UnresolvedSymbol,
                            Some(line),
                            format!("unresolved cell `{}`", cell.expr),
                        );
                    }
                });
            }
            diags.set_pass(0);
            return ResolveStats {
                passes: pass,
                unresolved: remaining,
                history,
            };
        }
    }
}

fn for_each_cell(program: &mut Program, mut visit: impl FnMut(u32, &mut crate::ast::Cell)) {
    for block in &mut program.blocks {
        match block {
            Block::Function(func) => {
                for stmt in &mut func.instructions {
                    for cell in &mut stmt.cells {
                        visit(stmt.line, cell);
                    }
                }
            }
            Block::Memory(mem) => {
                for row in &mut mem.rows {
                    for cell in &mut row.cells {
                        visit(row.line, cell);
                    }
                }
            }
        }
    }
}
