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

use crate::ast::{Block, Program, Word};
use crate::config::{Config, FieldWidths};
use crate::errors::{DiagnosticKind, DiagnosticSink};

pub const FLAG_C: u8 = 0b01;
pub const FLAG_P: u8 = 0b10;

// One entry of the processor's closed instruction set: opcode bits, which
// parameter slots the instruction reads, and the two leading flag bits.
pub struct OpcodeSpec {
    pub mnemonic: &'static str,
    pub code: u32,
    pub uses: [bool; 3],
    pub flags: u8,
}

pub static INSTRUCTION_SET: &[OpcodeSpec] = &[
    OpcodeSpec { mnemonic: "nop", code: 0x00, uses: [false, false, false], flags: 0 },
    OpcodeSpec { mnemonic: "halt", code: 0x01, uses: [false, false, false], flags: 0 },
    OpcodeSpec { mnemonic: "setreg", code: 0x02, uses: [true, true, false], flags: 0 },
    OpcodeSpec { mnemonic: "load", code: 0x03, uses: [true, true, false], flags: 0 },
    OpcodeSpec { mnemonic: "store", code: 0x04, uses: [true, true, false], flags: 0 },
    OpcodeSpec { mnemonic: "add", code: 0x05, uses: [true, true, true], flags: 0 },
    OpcodeSpec { mnemonic: "sub", code: 0x06, uses: [true, true, true], flags: 0 },
    OpcodeSpec { mnemonic: "and", code: 0x07, uses: [true, true, true], flags: 0 },
    OpcodeSpec { mnemonic: "or", code: 0x08, uses: [true, true, true], flags: 0 },
    OpcodeSpec { mnemonic: "xor", code: 0x09, uses: [true, true, true], flags: 0 },
    OpcodeSpec { mnemonic: "shl", code: 0x0A, uses: [true, true, true], flags: 0 },
    OpcodeSpec { mnemonic: "shr", code: 0x0B, uses: [true, true, true], flags: 0 },
    OpcodeSpec { mnemonic: "jump", code: 0x0C, uses: [true, false, false], flags: FLAG_P },
    OpcodeSpec { mnemonic: "call", code: 0x0D, uses: [true, false, false], flags: FLAG_P },
    OpcodeSpec { mnemonic: "ret", code: 0x0E, uses: [false, false, false], flags: 0 },
    OpcodeSpec { mnemonic: "branch", code: 0x0F, uses: [true, true, true], flags: FLAG_P | FLAG_C },
];

pub fn lookup(mnemonic: &str) -> Option<&'static OpcodeSpec> {
    INSTRUCTION_SET.iter().find(|spec| spec.mnemonic == mnemonic)
}

fn mask(width: u32) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}

// Word layout, MSB to LSB: p (1) | c (1) | opcode (w_op) | p3 | p2 | p1.
pub fn pack_instruction(spec: &OpcodeSpec, params: [u32; 3], widths: &FieldWidths) -> u32 {
    let p = u32::from(spec.flags & FLAG_P != 0);
    let c = u32::from(spec.flags & FLAG_C != 0);
    let mut word = (p << 31) | (c << 30);
    word |= (spec.code & mask(widths.opcode)) << (widths.param3 + widths.param2 + widths.param1);
    word |= (params[2] & mask(widths.param3)) << (widths.param2 + widths.param1);
    word |= (params[1] & mask(widths.param2)) << widths.param1;
    word |= params[0] & mask(widths.param1);
    word
}

// Data rows pack their four bytes MSB-first.
pub fn pack_row(bytes: [u8; 4]) -> u32 {
    u32::from_be_bytes(bytes)
}

// Turns the resolved program into output words. Cells left unresolved were
// already reported, so their statements are skipped here.
pub fn encode_program(program: &Program, config: &Config, diags: &mut DiagnosticSink) -> Vec<Word> {
    let mut words = Vec::new();

    for block in &program.blocks {
        match block {
            Block::Function(func) => {
                let Some(start) = func.start_address else {
                    continue;
                };
                for (index, stmt) in func.instructions.iter().enumerate() {
                    let Some(spec) = lookup(&stmt.opcode) else {
                        diags.error(
                            DiagnosticKind::UnknownOpcode,
                            Some(stmt.line),
                            format!("unknown opcode `{}`", stmt.opcode),
                        );
                        continue;
                    };

                    let mut params = [0u32; 3];
                    let mut unresolved = false;
                    for (slot, cell) in stmt.cells.iter().enumerate() {
                        let Some(value) = cell.value else {
                            unresolved = true;
                            continue;
                        };
                        let width = config.widths.param(slot);
                        if spec.uses[slot] {
                            if value < 0 || value >= 1i64 << width {
                                diags.error(
                                    DiagnosticKind::FieldOverflow,
                                    Some(stmt.line),
                                    format!(
                                        "param{} value {} does not fit unsigned in {} bits",
                                        slot + 1,
                                        value,
                                        width
                                    ),
                                );
                            }
                            params[slot] = (value as u32) & mask(width);
                        } else if cell.provided() {
                            diags.error(
                                DiagnosticKind::Lex,
                                Some(stmt.line),
                                format!(
                                    "opcode `{}` does not take param{}",
                                    spec.mnemonic,
                                    slot + 1
                                ),
                            );
                        }
                    }
                    if unresolved {
                        continue;
                    }

                    words.push(Word::Code {
                        address: start + index as u32,
                        word: pack_instruction(spec, params, &config.widths),
                        func: func.name.clone(),
                        mnemonic: spec.mnemonic,
                        params,
                        p: u8::from(spec.flags & FLAG_P != 0),
                        c: u8::from(spec.flags & FLAG_C != 0),
                        alias: stmt.alias.clone(),
                    });
                }
            }
            Block::Memory(mem) => {
                let Some(start) = mem.start_address else {
                    continue;
                };
                for (index, row) in mem.rows.iter().enumerate() {
                    let mut bytes = [0u8; 4];
                    let mut unresolved = false;
                    for (slot, cell) in row.cells.iter().enumerate() {
                        match cell.value {
                            Some(value) => bytes[slot] = (value & 0xFF) as u8,
                            None => unresolved = true,
                        }
                    }
                    if unresolved {
                        continue;
                    }
                    words.push(Word::Data {
                        address: start + index as u32,
                        word: pack_row(bytes),
                        block: mem.name.clone(),
                        bytes,
                        alias: row.alias.clone(),
                    });
                }
            }
        }
    }

    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assembler::{layout, resolver, symbol_table::SymbolTable};
    use crate::parser;

    fn encode(source: &str, config: &Config) -> (Vec<Word>, Vec<crate::errors::Diagnostic>) {
        let mut diags = DiagnosticSink::new();
        let mut program = parser::parse_source(source, &mut diags);
        let mut symbols = SymbolTable::new();
        for decl in program.macros.clone() {
            symbols.define_macro(&decl, &mut diags);
        }
        layout::assign_addresses(&mut program, config, &mut symbols, &mut diags);
        symbols.evaluate_macros(&mut diags);
        resolver::resolve_cells(&mut program, &symbols, &mut diags);
        let words = encode_program(&program, config, &mut diags);
        (words, diags.into_sorted())
    }

    #[test]
    fn test_pack_setreg() {
        let spec = lookup("setreg").unwrap();
        let word = pack_instruction(spec, [0x22, 1, 0], &FieldWidths::default());
        assert_eq!(word, 0x0400_4022);
    }

    #[test]
    fn test_pack_jump_sets_p_flag() {
        let spec = lookup("jump").unwrap();
        let word = pack_instruction(spec, [5, 0, 0], &FieldWidths::default());
        assert_eq!(word, 0x9800_0005);
    }

    #[test]
    fn test_pack_add_three_params() {
        let spec = lookup("add").unwrap();
        let word = pack_instruction(spec, [1, 2, 3], &FieldWidths::default());
        assert_eq!(word, 0x0A18_8001);
    }

    #[test]
    fn test_pack_row_msb_first() {
        assert_eq!(pack_row([0x22, 0xD0, 0x20, 0x20]), 0x22D0_2020);
    }

    #[test]
    fn test_unknown_opcode_reported() {
        let (words, diags) = encode("function f():\n    frobnicate [1] [2] []\n", &Config::default());
        assert!(words.is_empty());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::UnknownOpcode);
    }

    #[test]
    fn test_field_overflow_boundary() {
        // param1 is 14 bits wide by default: 0x3FFF fits, 0x4000 does not
        let (_, diags) = encode("function f():\n    setreg [0x3FFF] [1] []\n", &Config::default());
        assert!(diags.is_empty());
        let (_, diags) = encode("function f():\n    setreg [0x4000] [1] []\n", &Config::default());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::FieldOverflow);
        assert!(diags[0].message.contains("param1"));
    }

    #[test]
    fn test_negative_value_overflows() {
        let (_, diags) = encode("function f():\n    setreg [1 - 2] [1] []\n", &Config::default());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::FieldOverflow);
    }

    #[test]
    fn test_unused_param_slot_rejected() {
        let (_, diags) = encode("function f():\n    nop [1] [] []\n", &Config::default());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::Lex);
    }

    #[test]
    fn test_rows_mask_to_eight_bits() {
        let (words, diags) = encode("#memory m:\n    \"0x1FF\", \"2\", \"3\", \"4\"\n", &Config::default());
        assert!(diags.is_empty());
        let Word::Data { bytes, word, .. } = &words[0] else {
            panic!("expected a data word");
        };
        assert_eq!(*bytes, [0xFF, 2, 3, 4]);
        assert_eq!(*word, 0xFF02_0304);
    }

    #[test]
    fn test_every_word_is_32_bits_of_provenance() {
        let (words, diags) = encode(
            "function f():\n    setreg [7] [1] []\n    jump [f():] [] []\n\
             #memory m:\n    \"1\", \"2\", \"3\", \"4\"\n",
            &Config::default(),
        );
        assert!(diags.is_empty());
        assert_eq!(words.len(), 3);
        let Word::Code { params, p, c, .. } = &words[1] else {
            panic!("expected a code word");
        };
        assert_eq!((*p, *c), (1, 0));
        assert_eq!(params[0], 0);
    }
}
