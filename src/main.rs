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

use anyhow::{Context, Result};
use clap::Parser as clap_parser;
use polyasm::assemble_file;
use polyasm::config::{self, Config, DisplayBase, FieldWidths, SectionOffsets, WordOrder};
use polyasm::emitter;
use polyasm::file_reader::AsmFileReader;
use polyasm::logging;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(clap_parser)]
#[clap(version = "0.1.0", about = "Assembler for the PolyAsm 32-bit processor")]
struct Opts {
    /// Input assembly file
    #[clap(short = 'i', value_name = "PATH")]
    input: PathBuf,
    /// Output bitstring file
    #[clap(short = 'o', value_name = "PATH")]
    output: PathBuf,
    /// Section offsets
    #[clap(
        short = 'm',
        value_name = "code=<N>,data=<N>",
        value_parser = config::parse_section_offsets,
        default_value = "code=0,data=0x50"
    )]
    sections: SectionOffsets,
    /// Field widths; must sum to 30
    #[clap(
        short = 'w',
        value_name = "opcode=<N>,param1=<N>,param2=<N>,param3=<N>",
        value_parser = config::parse_field_widths,
        default_value = "opcode=5,param1=14,param2=5,param3=6"
    )]
    widths: FieldWidths,
    /// Also emit <output>_readable.txt
    #[clap(short = 'r')]
    readable: bool,
    /// Also emit <output>.log
    #[clap(short = 'l')]
    log: bool,
    /// Verbose diagnostics
    #[clap(short = 'v')]
    verbose: bool,
    /// Dump the symbol tables as JSON
    #[clap(short = 'd')]
    dump_symbols: bool,
    /// Parameter display base in the readable file
    #[clap(short = 'f', value_enum, default_value = "hex")]
    format: DisplayBase,
    /// Accepted for compatibility; the output is textual, so this is ignored
    #[clap(short = 'e', value_enum, default_value = "big")]
    endianness: WordOrder,
}

fn main() -> ExitCode {
    // clap exits with code 2 on CLI misuse
    let opts: Opts = Opts::parse();
    match run(&opts) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            logging::failure(&format!("{:#}", err));
            ExitCode::from(1)
        }
    }
}

fn run(opts: &Opts) -> Result<bool> {
    let config = Config {
        sections: opts.sections,
        widths: opts.widths,
    };
    // nothing to byte-swap in a textual bitstring
    let _ = opts.endianness;

    let reader = AsmFileReader;
    let output = assemble_file(&opts.input, &config, &reader)?;

    for diagnostic in &output.diagnostics {
        logging::report(diagnostic);
    }
    if opts.verbose {
        logging::info(&format!(
            "resolver reached fixed point after {} pass(es)",
            output.stats.passes
        ));
        logging::info(&format!("emitted {} word(s)", output.words.len()));
    }
    if opts.dump_symbols {
        println!("{}", serde_json::to_string_pretty(&output.symbols)?);
    }
    if opts.log {
        let log_path = suffixed(&opts.output, ".log");
        fs::write(&log_path, emitter::log_lines(&output.diagnostics))
            .with_context(|| format!("Failed to write log file: {}", log_path.display()))?;
    }

    if output.has_errors() {
        return Ok(false);
    }

    fs::write(&opts.output, emitter::bitstring(&output.words))
        .with_context(|| format!("Failed to write output file: {}", opts.output.display()))?;
    if opts.readable {
        let readable_path = suffixed(&opts.output, "_readable.txt");
        fs::write(
            &readable_path,
            emitter::readable_report(&output.words, &config, opts.format),
        )
        .with_context(|| format!("Failed to write readable file: {}", readable_path.display()))?;
    }
    if opts.verbose {
        logging::info(&format!(
            "Successfully assembled {} to {}",
            opts.input.display(),
            opts.output.display()
        ));
    }

    Ok(true)
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}
