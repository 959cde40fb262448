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

pub mod assembler;
pub mod errors;
pub mod export;
pub mod expr;
pub mod file_reader;
pub mod floatexpr;
pub mod image;
pub mod int256;
pub mod lexer;
pub mod matcher;
pub mod patfile;
pub mod state;
pub mod vliw;

use anyhow::{Context, Result};
use file_reader::FileReader;
use state::{Asm, ExportLabel, SectionRecord};
use std::path::Path;

/// Everything the two-pass run produces: the flat byte image plus the
/// section and export tables for the TSV writers.
pub struct Assembled {
    pub image: Vec<u8>,
    pub sections: Vec<SectionRecord>,
    pub exports: Vec<ExportLabel>,
}

/// Assemble one source file against a pattern file: load the patterns,
/// optionally import labels, run both passes and flatten the image.
pub fn assemble<F: FileReader>(
    pattern_path: &Path,
    source_path: &Path,
    import_path: Option<&Path>,
    reader: &F,
) -> Result<Assembled> {
    let mut asm = Asm::new();

    patfile::load_patterns(&mut asm, pattern_path, reader)
        .context("Failed to load the pattern file")?;

    if let Some(imports) = import_path {
        match reader.read_to_string(imports) {
            Ok(text) => export::import_labels(&mut asm, &text),
            Err(_) => println!(" error - cannot open import file '{}'.", imports.display()),
        }
    }

    let source = source_path.to_string_lossy().into_owned();
    asm.run_passes(&source, reader);

    Ok(Assembled {
        image: asm.image.dump(asm.bts, asm.endian),
        sections: asm.sections.clone(),
        exports: asm.exports.clone(),
    })
}
