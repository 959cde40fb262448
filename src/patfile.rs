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

//! Pattern-file records.
//!
//! A record is one line of up to six `::`-separated fields:
//! f0 = match pattern, f1 = `.error` expressions, f2 = object recipe,
//! f3 = VLIW slot index. Records that start with a directive name
//! configure the assembler instead of matching source lines.

use crate::errors::AsmError;
use crate::file_reader::FileReader;
use crate::image::Endianness;
use crate::lexer::{CAPITAL, DIGIT, LOWER, get_string, next_field, param_to_space};
use crate::state::Asm;
use std::path::Path;

const MAX_FIELDS: usize = 10;
const INCLUDE_DEPTH_LIMIT: usize = 64;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PatternRecord {
    pub fields: [String; 6],
}

impl PatternRecord {
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|f| f.is_empty())
    }
}

/// Strip the `/* ...` comment (which eats the rest of the line), turn
/// tabs and carriage returns into spaces and trim.
fn clean_line(line: &str) -> String {
    let line = match line.find("/*") {
        Some(pos) => &line[..pos],
        None => line,
    };
    line.replace(['\t', '\r'], " ").trim().to_string()
}

/// Split a cleaned line into a record, mapping the observed field count
/// onto the six slots. A two-part record fills f0 and f2 (the pattern
/// and its recipe); three or more parts fill f0, f1, f2, ... in order.
pub fn parse_record(line: &str) -> Option<PatternRecord> {
    if line.is_empty() {
        return None;
    }
    let bytes = line.as_bytes();
    let mut parts: Vec<String> = Vec::new();
    let mut idx = 0;
    while idx < bytes.len() && parts.len() < MAX_FIELDS {
        let (next, field) = next_field(bytes, idx);
        parts.push(field);
        if next == idx || next >= bytes.len() {
            break;
        }
        idx = next;
    }

    let mut rec = PatternRecord::default();
    match parts.len() {
        0 => return None,
        1 => rec.fields[0] = parts.remove(0),
        2 => {
            rec.fields[2] = parts.remove(1);
            rec.fields[0] = parts.remove(0);
        }
        n => {
            for (i, p) in parts.into_iter().enumerate().take(n.min(6)) {
                rec.fields[i] = p;
            }
        }
    }
    Some(rec)
}

/// Read a pattern file, following nested `.include`s, then apply its
/// configuration directives and snapshot the symbol table.
pub fn load_patterns<F: FileReader + ?Sized>(
    asm: &mut Asm,
    path: &Path,
    reader: &F,
) -> Result<(), AsmError> {
    let text = reader
        .read_to_string(path)
        .map_err(|e| AsmError::PatternFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
    read_pattern_text(asm, &text, reader, 0);

    for i in 0..asm.patterns.len() {
        asm.pattern_directive(i, true);
    }
    asm.snapshot_pat_symbols();
    tracing::debug!(
        records = asm.patterns.len(),
        symbols = asm.pat_symbols.len(),
        "pattern file loaded"
    );
    Ok(())
}

fn read_pattern_text<F: FileReader + ?Sized>(asm: &mut Asm, text: &str, reader: &F, depth: usize) {
    for raw in text.lines() {
        let line = clean_line(raw);
        let (rest, tok) = param_to_space(line.as_bytes(), 0);
        if tok.eq_ignore_ascii_case(".include") {
            let file = get_string(&line.as_bytes()[rest.min(line.len())..]);
            if file.is_empty() {
                continue;
            }
            if depth >= INCLUDE_DEPTH_LIMIT {
                println!(" error - pattern include depth exceeded.");
                continue;
            }
            match reader.read_to_string(Path::new(&file)) {
                Ok(inner) => read_pattern_text(asm, &inner, reader, depth + 1),
                Err(_) => println!(" error - cannot open pattern file '{file}'."),
            }
            continue;
        }
        if let Some(rec) = parse_record(&line) {
            asm.patterns.push(rec);
        }
    }
}

impl Asm {
    /// Handle a pattern record that is a directive rather than a match
    /// pattern. Configuration directives (`.bits`, `.padding`,
    /// `.symbolc`, `.vliw`, `EPIC`) are applied once while the pattern
    /// file loads; `.setsym` and `.clearsym` are re-evaluated every time
    /// the pattern loop passes them.
    pub fn pattern_directive(&mut self, index: usize, at_load: bool) -> bool {
        let rec = self.patterns[index].clone();
        let f0 = rec.fields[0].as_str();
        match f0 {
            ".setsym" => {
                if !rec.fields[1].is_empty() {
                    let (_, v) = self.eval_pattern(rec.fields[2].as_bytes(), 0);
                    self.set_symbol(&rec.fields[1], v);
                }
                true
            }
            ".clearsym" => {
                if !at_load {
                    if rec.fields[2].is_empty() {
                        self.clear_symbol(None);
                    } else {
                        self.clear_symbol(Some(&rec.fields[2]));
                    }
                }
                true
            }
            ".bits" => {
                if at_load {
                    let name = rec.fields[1].trim().trim_matches('"');
                    self.endian = if name.eq_ignore_ascii_case("big") {
                        Endianness::Big
                    } else {
                        Endianness::Little
                    };
                    if !rec.fields[2].is_empty() {
                        let (_, v) = self.eval_pattern(rec.fields[2].as_bytes(), 0);
                        self.bts = v.to_i64().clamp(1, 64);
                    }
                    tracing::debug!(bts = self.bts, endian = ?self.endian, "word format set");
                }
                true
            }
            ".padding" => {
                if at_load && !rec.fields[2].is_empty() {
                    let (_, v) = self.eval_pattern(rec.fields[2].as_bytes(), 0);
                    self.padding = v;
                }
                true
            }
            ".symbolc" => {
                if at_load && !rec.fields[2].is_empty() {
                    self.swordchars =
                        format!("{LOWER}{CAPITAL}{DIGIT}{}", rec.fields[2]);
                }
                true
            }
            ".vliw" => {
                if at_load {
                    self.vliw_directive(&rec);
                }
                true
            }
            _ if f0.eq_ignore_ascii_case("EPIC") => {
                if rec.fields[1].is_empty() {
                    return false;
                }
                if at_load {
                    self.epic_directive(&rec);
                }
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arity_mapping_is_pinned() {
        // one part: pattern only
        let r = parse_record("NOP").unwrap();
        assert_eq!(r.fields[0], "NOP");
        assert!(r.fields[1].is_empty() && r.fields[2].is_empty());

        // two parts: pattern and recipe, skipping the .error slot
        let r = parse_record("NOP :: 0x90").unwrap();
        assert_eq!(r.fields[0], "NOP");
        assert_eq!(r.fields[1], "");
        assert_eq!(r.fields[2], "0x90");

        // three parts: pattern, .error, recipe
        let r = parse_record("NOP :: :: 0x90").unwrap();
        assert_eq!(r.fields[0], "NOP");
        assert_eq!(r.fields[1], "");
        assert_eq!(r.fields[2], "0x90");

        // four parts add the VLIW slot index
        let r = parse_record("A !n :: n>7;0 :: 1,n :: 2").unwrap();
        assert_eq!(r.fields[1], "n>7;0");
        assert_eq!(r.fields[2], "1,n");
        assert_eq!(r.fields[3], "2");
    }

    #[test]
    fn comment_eats_rest_of_line() {
        assert!(parse_record(&clean_line("/* whole line */ NOP :: 0x90")).is_none());
        let r = parse_record(&clean_line("MOV a /* trailing */")).unwrap();
        assert_eq!(r.fields[0], "MOV a");
    }

    #[test]
    fn fields_are_trimmed() {
        let r = parse_record("  ADD a,b   ::   0x01, a, b  ").unwrap();
        assert_eq!(r.fields[0], "ADD a,b");
        assert_eq!(r.fields[2], "0x01, a, b");
    }

    #[test]
    fn setsym_and_snapshot() {
        let mut asm = Asm::new();
        asm.patterns.push(parse_record(".setsym :: R1 :: 1").unwrap());
        asm.patterns.push(parse_record(".setsym :: R2 :: #R1+1").unwrap());
        for i in 0..asm.patterns.len() {
            assert!(asm.pattern_directive(i, true));
        }
        asm.snapshot_pat_symbols();
        assert_eq!(asm.sym_val("r1").to_u64(), 1);
        assert_eq!(asm.sym_val("r2").to_u64(), 2);
    }

    #[test]
    fn bits_directive_sets_word_format() {
        let mut asm = Asm::new();
        asm.patterns
            .push(parse_record(".bits :: \"big\" :: 16").unwrap());
        asm.pattern_directive(0, true);
        assert_eq!(asm.bts, 16);
        assert_eq!(asm.endian, Endianness::Big);
    }

    #[test]
    fn padding_directive() {
        let mut asm = Asm::new();
        asm.patterns.push(parse_record(".padding :: 0xCC").unwrap());
        asm.pattern_directive(0, true);
        assert_eq!(asm.padding.to_u64(), 0xCC);
    }
}
