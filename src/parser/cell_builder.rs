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

use pest::iterators::Pair;

use crate::ast::{BinOp, Cell, Expr};
use crate::parser::Rule;

// Radix-prefixed integer parsing: 0x… hex, 0b… binary, otherwise decimal.
pub(crate) fn parse_int(text: &str) -> Option<i64> {
    if let Some(hex) = text.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = text.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()
    } else {
        text.parse::<i64>().ok()
    }
}

// Builds an instruction cell; `[]` is the zero sentinel.
pub(crate) fn build_cell(pair: Pair<Rule>) -> Cell {
    match pair.into_inner().next() {
        Some(expr) => Cell::new(build_expr(expr)),
        None => Cell::empty(),
    }
}

// Builds a data-row cell: either a quoted expression or a raw literal.
pub(crate) fn build_row_cell(pair: Pair<Rule>) -> Cell {
    let Some(inner) = pair.into_inner().next() else {
        return Cell::empty();
    };
    match inner.as_rule() {
        Rule::quoted_expr => match inner.into_inner().next() {
            Some(expr) => Cell::new(build_expr(expr)),
            None => Cell::empty(),
        },
        _ => Cell::new(build_expr(inner)),
    }
}

// Folds a pest expression pair into an `Expr` tree. The grammar already
// encodes precedence, so every chain level folds left-associatively.
pub(crate) fn build_expr(pair: Pair<Rule>) -> Expr {
    match pair.as_rule() {
        Rule::expression
        | Rule::sum
        | Rule::bit_or
        | Rule::bit_xor
        | Rule::bit_and
        | Rule::shift => fold_chain(pair),
        Rule::int_literal => Expr::Literal(parse_int(pair.as_str()).unwrap_or(0)),
        // bare names are macro references without the sigil
        Rule::macro_ref | Rule::bare_name => Expr::MacroRef(ref_name(pair)),
        Rule::alias_ref => Expr::AliasRef(ref_name(pair)),
        Rule::func_ref => Expr::FuncRef(ref_name(pair)),
        _ => Expr::Empty,
    }
}

fn fold_chain(pair: Pair<Rule>) -> Expr {
    let mut inner = pair.into_inner();
    let Some(first) = inner.next() else {
        return Expr::Empty;
    };
    let mut expr = build_expr(first);
    while let Some(op_pair) = inner.next() {
        let op = match op_pair.as_str() {
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            "|" => BinOp::Or,
            "^" => BinOp::Xor,
            "&" => BinOp::And,
            "<<" => BinOp::Shl,
            _ => BinOp::Shr,
        };
        let Some(rhs) = inner.next() else {
            break;
        };
        expr = Expr::Binary(Box::new(expr), op, Box::new(build_expr(rhs)));
    }
    expr
}

fn ref_name(pair: Pair<Rule>) -> String {
    match pair.as_rule() {
        Rule::bare_name => pair.as_str().to_string(),
        _ => pair
            .into_inner()
            .next()
            .map(|name| name.as_str().to_string())
            .unwrap_or_default(),
    }
}
