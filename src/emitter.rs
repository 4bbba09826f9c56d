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

use std::fmt::Write as _;

use crate::ast::Word;
use crate::config::{Config, DisplayBase};
use crate::errors::Diagnostic;

// Renders a 32-bit word as 32 ASCII 0/1 characters in nibble groups.
pub fn format_word_bits(word: u32) -> String {
    let mut out = String::with_capacity(39);
    for nibble in (0..8).rev() {
        if !out.is_empty() {
            out.push(' ');
        }
        let _ = write!(out, "{:04b}", (word >> (nibble * 4)) & 0xF);
    }
    out
}

// Ascending address order across both sections merged; when a code and a
// data word share a numeric address, the code word comes first.
fn sorted(words: &[Word]) -> Vec<&Word> {
    let mut ordered: Vec<&Word> = words.iter().collect();
    ordered.sort_by_key(|word| (word.address(), !word.is_code()));
    ordered
}

// The bitstring file: one word per line. Unassigned addresses are not
// written; the stream is sparse.
pub fn bitstring(words: &[Word]) -> String {
    let mut out = String::new();
    for word in sorted(words) {
        out.push_str(&format_word_bits(word.word()));
        out.push('\n');
    }
    out
}

fn format_param(value: u32, base: DisplayBase) -> String {
    match base {
        DisplayBase::Hex => format!("0x{:X}", value),
        DisplayBase::Dec => value.to_string(),
        DisplayBase::Bin => format!("0b{:b}", value),
    }
}

fn alias_suffix(alias: &Option<String>) -> String {
    match alias {
        Some(name) => format!(" <- alias: {}", name),
        None => String::new(),
    }
}

// The human-readable report (-r): per word, the raw bit fields and the
// source-level view. Addresses are 5-digit zero-padded decimal.
pub fn readable_report(words: &[Word], config: &Config, base: DisplayBase) -> String {
    let widths = &config.widths;
    let mut out = String::new();
    for word in sorted(words) {
        match word {
            Word::Code {
                address,
                func,
                mnemonic,
                params,
                p,
                c,
                alias,
                ..
            } => {
                let _ = writeln!(
                    out,
                    "{:05} | p={} c={} p3={:0w3$b} p2={:0w2$b} p1={:0w1$b} | func={}, opcode={}, param1={}, param2={}, param3={}{}",
                    address,
                    p,
                    c,
                    params[2],
                    params[1],
                    params[0],
                    func,
                    mnemonic,
                    format_param(params[0], base),
                    format_param(params[1], base),
                    format_param(params[2], base),
                    alias_suffix(alias),
                    w1 = widths.param1 as usize,
                    w2 = widths.param2 as usize,
                    w3 = widths.param3 as usize,
                );
            }
            Word::Data {
                address,
                block,
                bytes,
                alias,
                ..
            } => {
                let _ = writeln!(
                    out,
                    "{:05} | {:08b} {:08b} {:08b} {:08b} | mem={}, 0x{:02X} 0x{:02X} 0x{:02X} 0x{:02X}{}",
                    address,
                    bytes[0],
                    bytes[1],
                    bytes[2],
                    bytes[3],
                    block,
                    bytes[0],
                    bytes[1],
                    bytes[2],
                    bytes[3],
                    alias_suffix(alias),
                );
            }
        }
    }
    out
}

// The flat log file (-l): one record per diagnostic, in the pipeline's
// stable order.
pub fn log_lines(diagnostics: &[Diagnostic]) -> String {
    let mut out = String::new();
    for diagnostic in diagnostics {
        let _ = writeln!(out, "{}: {}", diagnostic.severity, diagnostic);
    }
    out
}
