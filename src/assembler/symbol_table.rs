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

use std::collections::BTreeSet;
use std::collections::BTreeMap;

use serde::Serialize;

use crate::ast::{Expr, MacroDecl};
use crate::errors::{DiagnosticKind, DiagnosticSink};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MacroEntry {
    #[serde(skip)]
    pub value_expr: Expr,
    pub value: Option<i64>,
    pub defined_at: u32,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct AliasEntry {
    pub address: u32,
    pub defined_at: u32,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct FunctionEntry {
    pub start_address: u32,
    pub length_in_words: u32,
    pub defined_at: u32,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct MemoryEntry {
    pub start_address: u32,
    pub length_in_words: u32,
    pub defined_at: u32,
}

// Four name-spaces with distinct sigils at reference sites. Names are unique
// within a namespace; cross-namespace collisions are permitted. BTreeMaps
// keep the `-d` dump stable.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SymbolTable {
    pub macros: BTreeMap<String, MacroEntry>,
    pub aliases: BTreeMap<String, AliasEntry>,
    pub functions: BTreeMap<String, FunctionEntry>,
    pub memories: BTreeMap<String, MemoryEntry>,
    #[serde(skip)]
    poisoned_macros: BTreeSet<String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    // Redefinition warns and the later declaration wins.
    pub fn define_macro(&mut self, decl: &MacroDecl, diags: &mut DiagnosticSink) {
        let entry = MacroEntry {
            value_expr: decl.value.clone(),
            value: None,
            defined_at: decl.line,
        };
        if let Some(previous) = self.macros.insert(decl.name.clone(), entry) {
            diags.warning(
                DiagnosticKind::Redefinition,
                Some(decl.line),
                format!(
                    "macro `{}` already defined at line {}; the new value wins",
                    decl.name, previous.defined_at
                ),
            );
        }
    }

    pub fn define_alias(&mut self, name: &str, address: u32, line: u32, diags: &mut DiagnosticSink) {
        let entry = AliasEntry {
            address,
            defined_at: line,
        };
        if let Some(previous) = self.aliases.insert(name.to_string(), entry) {
            diags.warning(
                DiagnosticKind::Redefinition,
                Some(line),
                format!(
                    "alias `{}` already defined at line {}; the new address wins",
                    name, previous.defined_at
                ),
            );
        }
    }

    // Duplicate function and memory names are rejected by the block parser,
    // so these inserts are unique.
    pub fn define_function(&mut self, name: &str, start_address: u32, length: u32, line: u32) {
        self.functions.insert(
            name.to_string(),
            FunctionEntry {
                start_address,
                length_in_words: length,
                defined_at: line,
            },
        );
    }

    pub fn define_memory(&mut self, name: &str, start_address: u32, length: u32, line: u32) {
        self.memories.insert(
            name.to_string(),
            MemoryEntry {
                start_address,
                length_in_words: length,
                defined_at: line,
            },
        );
    }

    pub fn macro_value(&self, name: &str) -> Option<i64> {
        self.macros.get(name).and_then(|entry| entry.value)
    }

    pub fn alias_address(&self, name: &str) -> Option<u32> {
        self.aliases.get(name).map(|entry| entry.address)
    }

    pub fn function_address(&self, name: &str) -> Option<u32> {
        self.functions.get(name).map(|entry| entry.start_address)
    }

    // Evaluates every macro value to an integer. Reference chains resolve
    // recursively; a cycle is reported once and all its members poisoned so
    // later evaluations stay silent. Depth is bounded by the macro count.
    pub fn evaluate_macros(&mut self, diags: &mut DiagnosticSink) {
        let mut order: Vec<(u32, String)> = self
            .macros
            .iter()
            .map(|(name, entry)| (entry.defined_at, name.clone()))
            .collect();
        order.sort();
        for (_, name) in &order {
            let mut stack: Vec<String> = Vec::new();
            self.eval_macro(name, &mut stack, diags);
        }
    }

    fn eval_macro(
        &mut self,
        name: &str,
        stack: &mut Vec<String>,
        diags: &mut DiagnosticSink,
    ) -> Option<i64> {
        if self.poisoned_macros.contains(name) {
            return None;
        }
        if let Some(position) = stack.iter().position(|n| n == name) {
            let members: Vec<String> = stack[position..].to_vec();
            let line = self.macros.get(name).map(|entry| entry.defined_at);
            diags.error(
                DiagnosticKind::Cycle,
                line,
                format!("macro reference cycle: {} -> {}", members.join(" -> "), name),
            );
            for member in members {
                self.poisoned_macros.insert(member);
            }
            return None;
        }
        let entry = self.macros.get(name)?.clone();
        if let Some(value) = entry.value {
            return Some(value);
        }
        stack.push(name.to_string());
        let value = self.eval_expr(&entry.value_expr, stack, diags);
        stack.pop();
        if let Some(value) = value {
            if let Some(entry) = self.macros.get_mut(name) {
                entry.value = Some(value);
            }
        }
        value
    }

    fn eval_expr(
        &mut self,
        expr: &Expr,
        stack: &mut Vec<String>,
        diags: &mut DiagnosticSink,
    ) -> Option<i64> {
        match expr {
            Expr::Empty => Some(0),
            Expr::Literal(value) => Some(*value),
            Expr::MacroRef(name) => self.eval_macro(name, stack, diags),
            Expr::AliasRef(name) => self.alias_address(name).map(i64::from),
            Expr::FuncRef(name) => self.function_address(name).map(i64::from),
            Expr::Binary(lhs, op, rhs) => {
                let lhs = self.eval_expr(lhs, stack, diags)?;
                let rhs = self.eval_expr(rhs, stack, diags)?;
                Some(op.apply(lhs, rhs))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinOp;

    fn decl(name: &str, value: Expr, line: u32) -> MacroDecl {
        MacroDecl {
            name: name.to_string(),
            value,
            line,
        }
    }

    #[test]
    fn test_macro_chain_resolves() {
        let mut diags = DiagnosticSink::new();
        let mut table = SymbolTable::new();
        table.define_macro(&decl("A", Expr::Literal(7), 1), &mut diags);
        table.define_macro(&decl("B", Expr::MacroRef("A".to_string()), 2), &mut diags);
        table.define_macro(
            &decl(
                "C",
                Expr::Binary(
                    Box::new(Expr::MacroRef("B".to_string())),
                    BinOp::Shl,
                    Box::new(Expr::Literal(1)),
                ),
                3,
            ),
            &mut diags,
        );
        table.evaluate_macros(&mut diags);
        assert!(!diags.has_errors());
        assert_eq!(table.macro_value("A"), Some(7));
        assert_eq!(table.macro_value("B"), Some(7));
        assert_eq!(table.macro_value("C"), Some(14));
    }

    #[test]
    fn test_redefinition_warns_and_last_wins() {
        let mut diags = DiagnosticSink::new();
        let mut table = SymbolTable::new();
        table.define_macro(&decl("A", Expr::Literal(1), 1), &mut diags);
        table.define_macro(&decl("A", Expr::Literal(2), 2), &mut diags);
        table.evaluate_macros(&mut diags);
        assert!(!diags.has_errors());
        let sorted = diags.into_sorted();
        assert_eq!(sorted.len(), 1);
        assert_eq!(sorted[0].kind, DiagnosticKind::Redefinition);
        assert_eq!(table.macro_value("A"), Some(2));
    }

    #[test]
    fn test_cycle_reported_exactly_once() {
        let mut diags = DiagnosticSink::new();
        let mut table = SymbolTable::new();
        table.define_macro(&decl("X", Expr::MacroRef("Y".to_string()), 1), &mut diags);
        table.define_macro(&decl("Y", Expr::MacroRef("X".to_string()), 2), &mut diags);
        table.evaluate_macros(&mut diags);
        let sorted = diags.into_sorted();
        assert_eq!(sorted.len(), 1);
        assert_eq!(sorted[0].kind, DiagnosticKind::Cycle);
        assert_eq!(table.macro_value("X"), None);
        assert_eq!(table.macro_value("Y"), None);
    }

    #[test]
    fn test_self_cycle() {
        let mut diags = DiagnosticSink::new();
        let mut table = SymbolTable::new();
        table.define_macro(&decl("X", Expr::MacroRef("X".to_string()), 1), &mut diags);
        table.evaluate_macros(&mut diags);
        let sorted = diags.into_sorted();
        assert_eq!(sorted.len(), 1);
        assert_eq!(sorted[0].kind, DiagnosticKind::Cycle);
    }

    #[test]
    fn test_macro_value_may_use_addresses() {
        let mut diags = DiagnosticSink::new();
        let mut table = SymbolTable::new();
        table.define_function("main", 4, 2, 1);
        table.define_alias("spot", 9, 3, &mut diags);
        table.define_macro(&decl("F", Expr::FuncRef("main".to_string()), 5), &mut diags);
        table.define_macro(&decl("S", Expr::AliasRef("spot".to_string()), 6), &mut diags);
        table.evaluate_macros(&mut diags);
        assert_eq!(table.macro_value("F"), Some(4));
        assert_eq!(table.macro_value("S"), Some(9));
    }
}
