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

pub mod encoder;
pub mod layout;
pub mod resolver;
pub mod symbol_table;

use crate::ast::Program;
use crate::errors::DiagnosticSink;
use symbol_table::SymbolTable;

/// Pass 0: collect macro declarations into the symbol table.
pub fn build_macro_table(program: &Program, diags: &mut DiagnosticSink) -> SymbolTable {
    let mut symbols = SymbolTable::new();
    for decl in &program.macros {
        symbols.define_macro(decl, diags);
    }
    symbols
}
