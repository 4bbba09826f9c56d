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

//! Pretty-printing diagnostics to the console

use colored::Colorize;

use crate::errors::{Diagnostic, Severity};

/// Pretty-print one diagnostic to the console
pub fn report(diagnostic: &Diagnostic) {
    match diagnostic.severity {
        Severity::Error => eprintln!("{} {}", "error:".red().bold(), diagnostic),
        Severity::Warning => eprintln!("{} {}", "warning:".yellow().bold(), diagnostic),
    }
}

/// Informational line, shown with `-v`
pub fn info(message: &str) {
    eprintln!("{} {}", "info:".cyan().bold(), message);
}

/// Hard failure outside the diagnostic pipeline (I/O and the like)
pub fn failure(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message);
}
