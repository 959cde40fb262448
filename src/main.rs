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
use retasm::assemble;
use retasm::errors::AsmError;
use retasm::export::{export_table, import_labels};
use retasm::file_reader::{AsmFileReader, FileReader};
use retasm::state::{Asm, Pass};
use std::fs;
use std::io::{BufRead, Write};
use std::path::PathBuf;

#[derive(clap_parser)]
#[clap(version = "0.1.0", about = "Retargetable table-driven two-pass assembler")]
struct Opts {
    /// Instruction pattern file
    pattern: PathBuf,
    /// Source file; without one the assembler enters interactive mode
    source: Option<PathBuf>,
    /// Output binary image
    #[clap(short, long)]
    output: Option<PathBuf>,
    /// Write labels and sections as TSV
    #[clap(short, long)]
    export: Option<PathBuf>,
    /// Write the export TSV with ELF section flags
    #[clap(short = 'E', long)]
    export_elf: Option<PathBuf>,
    /// Import labels from a TSV before assembling
    #[clap(short, long)]
    import: Option<PathBuf>,
    /// Enable debug diagnostics
    #[clap(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let opts: Opts = Opts::parse();

    if opts.verbose {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "debug".into()),
            )
            .init();
    }

    let reader = AsmFileReader;

    let (sections, exports, image) = match &opts.source {
        Some(source) => {
            let result = assemble(&opts.pattern, source, opts.import.as_deref(), &reader)?;
            (result.sections, result.exports, result.image)
        }
        None => interactive(&opts, &reader)?,
    };

    if let Some(out) = &opts.output {
        fs::write(out, &image).map_err(|source| AsmError::Write {
            path: out.display().to_string(),
            source,
        })?;
    }

    let (export_path, elf) = match (&opts.export_elf, &opts.export) {
        (Some(p), _) => (Some(p), true),
        (None, Some(p)) => (Some(p), false),
        (None, None) => (None, false),
    };
    if let Some(path) = export_path {
        let table = export_table(&sections, &exports, elf);
        fs::write(path, table).map_err(|source| AsmError::Write {
            path: path.display().to_string(),
            source,
        })?;
    }

    Ok(())
}

/// The REPL: one line per prompt, labels must be unique, every word is
/// written. `?` dumps the label table.
fn interactive(
    opts: &Opts,
    reader: &AsmFileReader,
) -> Result<(
    Vec<retasm::state::SectionRecord>,
    Vec<retasm::state::ExportLabel>,
    Vec<u8>,
)> {
    let mut asm = Asm::new();
    retasm::patfile::load_patterns(&mut asm, &opts.pattern, reader)
        .context("Failed to load the pattern file")?;
    if let Some(imports) = &opts.import {
        match reader.read_to_string(imports) {
            Ok(text) => import_labels(&mut asm, &text),
            Err(_) => println!(" error - cannot open import file '{}'.", imports.display()),
        }
    }

    asm.begin_pass(Pass::Interactive);
    asm.current_file = "(stdin)".to_string();

    let stdin = std::io::stdin();
    loop {
        print!("{:016x}: >> ", asm.pc.to_u64());
        std::io::stdout().flush().ok();
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "?" {
            asm.dump_labels();
            continue;
        }
        asm.line_entry(line, reader);
    }

    let image = asm.image.dump(asm.bts, asm.endian);
    Ok((asm.sections, asm.exports, image))
}
