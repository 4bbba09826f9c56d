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

use clap::ValueEnum;

use crate::parser::cell_builder::parse_int;

// Two flag bits plus the four configurable fields make one 32-bit word.
pub const PARAM_FIELD_BITS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionOffsets {
    pub code: u32,
    pub data: u32,
}

impl Default for SectionOffsets {
    fn default() -> Self {
        Self { code: 0, data: 0x50 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldWidths {
    pub opcode: u32,
    pub param1: u32,
    pub param2: u32,
    pub param3: u32,
}

impl Default for FieldWidths {
    fn default() -> Self {
        Self {
            opcode: 5,
            param1: 14,
            param2: 5,
            param3: 6,
        }
    }
}

impl FieldWidths {
    pub fn sum(&self) -> u32 {
        self.opcode + self.param1 + self.param2 + self.param3
    }

    // Width of parameter slot 0..=2.
    pub fn param(&self, index: usize) -> u32 {
        match index {
            0 => self.param1,
            1 => self.param2,
            _ => self.param3,
        }
    }
}

// Display base for parameters in the readable report (-f).
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DisplayBase {
    Hex,
    Dec,
    Bin,
}

// Accepted for compatibility (-e); the output is a textual bitstring, so
// there is nothing to byte-swap. Rejecting a reinterpretation is deliberate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WordOrder {
    Big,
    Little,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Config {
    pub sections: SectionOffsets,
    pub widths: FieldWidths,
}

impl Config {
    pub fn validate(&self) -> Result<(), String> {
        let sum = self.widths.sum();
        if sum != PARAM_FIELD_BITS {
            return Err(format!(
                "field widths sum to {}, expected {} (opcode={}, param1={}, param2={}, param3={})",
                sum,
                PARAM_FIELD_BITS,
                self.widths.opcode,
                self.widths.param1,
                self.widths.param2,
                self.widths.param3
            ));
        }
        Ok(())
    }
}

fn split_pairs(text: &str) -> Result<Vec<(&str, &str)>, String> {
    text.split(',')
        .map(|part| {
            part.split_once('=')
                .ok_or_else(|| format!("expected key=value, got `{}`", part))
        })
        .collect()
}

fn parse_uint(text: &str) -> Result<u32, String> {
    parse_int(text.trim())
        .and_then(|value| u32::try_from(value).ok())
        .ok_or_else(|| format!("invalid number `{}`", text.trim()))
}

// Parses the `-m code=<N>,data=<N>` flag value.
pub fn parse_section_offsets(text: &str) -> Result<SectionOffsets, String> {
    let mut offsets = SectionOffsets::default();
    let mut seen_code = false;
    let mut seen_data = false;
    for (key, value) in split_pairs(text)? {
        let value = parse_uint(value)?;
        match key.trim() {
            "code" => {
                offsets.code = value;
                seen_code = true;
            }
            "data" => {
                offsets.data = value;
                seen_data = true;
            }
            other => return Err(format!("unknown section `{}`", other)),
        }
    }
    if !seen_code || !seen_data {
        return Err("both code=<N> and data=<N> are required".to_string());
    }
    Ok(offsets)
}

// Parses the `-w opcode=<N>,param1=<N>,param2=<N>,param3=<N>` flag value.
pub fn parse_field_widths(text: &str) -> Result<FieldWidths, String> {
    let mut widths = FieldWidths::default();
    let mut seen = [false; 4];
    for (key, value) in split_pairs(text)? {
        let value = parse_uint(value)?;
        match key.trim() {
            "opcode" => {
                widths.opcode = value;
                seen[0] = true;
            }
            "param1" => {
                widths.param1 = value;
                seen[1] = true;
            }
            "param2" => {
                widths.param2 = value;
                seen[2] = true;
            }
            "param3" => {
                widths.param3 = value;
                seen[3] = true;
            }
            other => return Err(format!("unknown field `{}`", other)),
        }
    }
    if seen != [true; 4] {
        return Err("opcode, param1, param2 and param3 widths are all required".to_string());
    }
    Ok(widths)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_section_offsets() {
        let offsets = parse_section_offsets("code=0,data=0x50").unwrap();
        assert_eq!(offsets, SectionOffsets { code: 0, data: 0x50 });
        let offsets = parse_section_offsets("data=16,code=0b100").unwrap();
        assert_eq!(offsets, SectionOffsets { code: 4, data: 16 });
    }

    #[test]
    fn test_parse_section_offsets_rejects_partial() {
        assert!(parse_section_offsets("code=0").is_err());
        assert!(parse_section_offsets("code=0,heap=1").is_err());
        assert!(parse_section_offsets("code=x,data=1").is_err());
    }

    #[test]
    fn test_parse_field_widths() {
        let widths = parse_field_widths("opcode=5,param1=14,param2=5,param3=6").unwrap();
        assert_eq!(widths, FieldWidths::default());
        assert!(parse_field_widths("opcode=5,param1=14,param2=5").is_err());
    }

    #[test]
    fn test_validate_width_sum() {
        assert!(Config::default().validate().is_ok());
        let config = Config {
            widths: FieldWidths {
                opcode: 6,
                ..FieldWidths::default()
            },
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }
}
