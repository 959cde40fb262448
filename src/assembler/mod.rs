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

//! The two-pass driver: line preprocessing, label capture, the pattern
//! loop, file inclusion and the per-pass orchestration.

mod builder;
mod directives;

use crate::file_reader::FileReader;
use crate::int256::Int256;
use crate::lexer::{at, collapse_spaces, param_to_space, param_to_subinst, skipspc};
use crate::state::{Asm, ExprMode, Pass};

const INCLUDE_DEPTH_LIMIT: usize = 64;

/// Messages addressed by the `.error` recipe field's code expressions.
const ERRORS: [&str; 7] = [
    "Value out of range.",
    "Invalid syntax.",
    "Address out of range.",
    "",
    "",
    "Register out of range.",
    "Port number out of range.",
];

/// Result of assembling one (sub-)instruction: the recipe words and the
/// VLIW slot index from pattern field f3.
#[derive(Debug, Default, Clone)]
pub struct LineOutput {
    pub words: Vec<Int256>,
    pub slot_index: Int256,
}

/// Strip a `;` comment, honoring `"..."` strings.
fn strip_comment(s: &str) -> String {
    let mut in_string = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_string = !in_string,
            ';' if !in_string => return s[..i].trim().to_string(),
            _ => {}
        }
    }
    s.trim().to_string()
}

/// Number of `!!`-separated sub-instructions; `!!!` and `!!!!` are
/// expression tokens, not separators.
fn count_subinsts(s: &str) -> u64 {
    let b = s.as_bytes();
    let mut cnt = 1;
    let mut i = 0;
    while i < b.len() {
        if b[i..].starts_with(b"!!!!") {
            i += 4;
        } else if b[i..].starts_with(b"!!!") {
            i += 3;
        } else if b[i..].starts_with(b"!!") {
            cnt += 1;
            i += 2;
        } else {
            i += 1;
        }
    }
    cnt
}

/// Position of the first `!!` separator, if the line is a bundle.
fn first_subinst_marker(s: &str) -> Option<usize> {
    let b = s.as_bytes();
    let pos = b.windows(2).position(|w| w == b"!!")?;
    if b[pos..].starts_with(b"!!!") {
        return None;
    }
    Some(pos)
}

fn is_label_word(s: &str, lwordchars: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    let (end, w) = crate::lexer::get_label_word(s.as_bytes(), 0, lwordchars);
    end == s.len() && w == s
}

impl Asm {
    /// Run both passes over one source file.
    pub fn run_passes(&mut self, source: &str, reader: &dyn FileReader) {
        tracing::debug!(source, "pass 1");
        self.begin_pass(Pass::First);
        self.assemble_file(source, reader);
        tracing::debug!(source, "pass 2");
        self.begin_pass(Pass::Second);
        self.assemble_file(source, reader);
    }

    /// Assemble a whole file, pushing the current file/line around the
    /// read so `.include` nests.
    pub fn assemble_file(&mut self, path: &str, reader: &dyn FileReader) {
        if self.file_stack.len() >= INCLUDE_DEPTH_LIMIT {
            println!(" error - include depth exceeded at '{path}'.");
            return;
        }
        self.file_stack
            .push((self.current_file.clone(), self.line_no));
        self.current_file = path.to_string();
        self.line_no = 1;

        match reader.read_to_string(std::path::Path::new(path)) {
            Ok(text) => {
                for line in text.lines() {
                    self.line_entry(line, reader);
                }
            }
            Err(_) => println!(" error - cannot open '{path}'."),
        }

        if let Some((file, ln)) = self.file_stack.pop() {
            self.current_file = file;
            self.line_no = ln;
        }
    }

    /// One source line: echo the listing prefix, assemble, count the
    /// line.
    pub fn line_entry(&mut self, line: &str, reader: &dyn FileReader) -> bool {
        let cl = line.trim_end_matches(['\n', '\r']);
        if self.emits() {
            print!(
                "{:016x} {} {} {} ",
                self.pc.to_u64(),
                self.current_file,
                self.line_no,
                cl
            );
        }
        let ok = self.assemble_line(cl, reader);
        if self.emits() {
            println!();
        }
        self.line_no += 1;
        ok
    }

    /// The line pipeline: normalize whitespace, strip the comment, bind
    /// the label, expand `:label` references, reset the symbol table,
    /// then assemble and emit.
    fn assemble_line(&mut self, line: &str, reader: &dyn FileReader) -> bool {
        let mut l = line.replace('\t', " ");
        l = collapse_spaces(&l);
        l = strip_comment(&l);
        if l.is_empty() {
            return false;
        }
        l = self.label_processing(&l);
        l = self.expand_colon_labels(&l);
        self.clear_symbol(None);
        self.vcnt = Int256::from_u64(count_subinsts(&l));

        if self.vliw.enabled {
            if let Some(pos) = first_subinst_marker(&l) {
                let first = l[..pos].to_string();
                let (ok, out) = self.line_core(&first, reader);
                if !ok {
                    return false;
                }
                return self.vliw_process(&l, out, pos, reader);
            }
        }

        let (ok, out) = self.line_core(&l, reader);
        if !ok {
            return false;
        }
        for (i, w) in out.words.iter().enumerate() {
            let pos = self.pc + Int256::from_u64(i as u64);
            self.emit_word(pos, *w);
        }
        self.pc = self.pc + Int256::from_u64(out.words.len() as u64);
        true
    }

    /// Bind a leading `name:` label. `name: .equ expr` binds to the
    /// expression and consumes the line; a bare label binds to the PC
    /// and leaves the rest of the line to assemble.
    fn label_processing(&mut self, line: &str) -> String {
        let bytes = line.as_bytes();
        let mut depth = 0i32;
        let mut colon = None;
        for (i, &c) in bytes.iter().enumerate() {
            match c {
                b'{' => depth += 1,
                b'}' => depth -= 1,
                b':' if depth == 0 => {
                    if at(bytes, i + 1) != b'=' {
                        colon = Some(i);
                    }
                    break;
                }
                _ => {}
            }
        }
        let Some(pos) = colon else {
            return line.to_string();
        };
        let label = line[..pos].trim().to_string();
        if !is_label_word(&label, &self.lwordchars) {
            return line.to_string();
        }

        let idx = skipspc(bytes, pos + 1);
        let (tok_end, tok) = param_to_space(bytes, idx);
        if tok.eq_ignore_ascii_case(".EQU") {
            let (_, v) = self.eval_assembly(bytes, tok_end);
            let section = self.current_section.clone();
            self.put_label(&label, v, &section);
            return String::new();
        }

        let pc = self.pc;
        let section = self.current_section.clone();
        self.put_label(&label, pc, &section);
        line[pos + 1..].to_string()
    }

    /// The core per-line assembler: directive dispatch, then the pattern
    /// loop. Returns the recipe words without emitting them.
    pub(crate) fn line_core(&mut self, line: &str, reader: &dyn FileReader) -> (bool, LineOutput) {
        let bytes = line.as_bytes();
        let (i1, l_raw) = param_to_space(bytes, 0);
        let (_, l2_raw) = param_to_subinst(bytes, i1);
        let l: String = l_raw.trim().chars().filter(|c| *c != ' ').collect();
        let l2 = l2_raw.trim().to_string();

        if self.asm_directive(&l, &l2, reader) {
            return (true, LineOutput::default());
        }
        if l.is_empty() {
            return (false, LineOutput::default());
        }

        let lin = collapse_spaces(&format!("{l} {l2}"));
        let mut matched = false;
        let mut out = LineOutput::default();

        for i in 0..self.patterns.len() {
            self.reset_vars();
            if self.patterns[i].is_blank() {
                continue;
            }
            if self.pattern_directive(i, false) {
                continue;
            }
            // a record with an empty match pattern terminates the loop
            if self.patterns[i].fields[0].is_empty() {
                matched = true;
                break;
            }

            self.undef_label = false;
            self.exp_mode = ExprMode::Assembly;
            let rec = self.patterns[i].clone();
            if self.match_with_brackets(&lin, &rec.fields[0]) {
                if !rec.fields[1].is_empty() {
                    self.error_directive(&rec.fields[1]);
                }
                if !rec.fields[2].is_empty() {
                    out.words = self.makeobj(&rec.fields[2]);
                }
                if !rec.fields[3].is_empty() {
                    out.slot_index = self.eval_pattern(rec.fields[3].as_bytes(), 0).1;
                }
                matched = true;
                break;
            }
        }

        if self.emits() {
            if self.undef_label {
                println!(" error - undefined label error.");
                return (false, out);
            }
            if !matched {
                println!(" error - Syntax error.");
                return (false, out);
            }
        }
        (true, out)
    }

    /// Pattern field f1: comma-separated `cond;code` pairs; each pair
    /// with a nonzero condition reports the coded message.
    fn error_directive(&mut self, s: &str) {
        if s.trim().is_empty() {
            return;
        }
        let b = s.as_bytes();
        let mut idx = 0;
        while at(b, idx) != 0 {
            if b[idx] == b',' {
                idx += 1;
                continue;
            }
            let start = idx;
            let (ni, u) = self.eval_pattern(b, idx);
            idx = ni;
            if idx == start && at(b, idx) != 0 {
                idx += 1;
                continue;
            }
            if at(b, idx) == b';' {
                idx += 1;
            }
            let start = idx;
            let (ni, t) = self.eval_pattern(b, idx);
            idx = ni;
            if idx == start && at(b, idx) != 0 {
                idx += 1;
                continue;
            }
            if self.emits() && !u.is_zero() {
                let code = t.to_i64();
                let msg = ERRORS.get(code as usize).copied().unwrap_or("");
                println!(" error - code {code} {msg}");
            }
        }
    }

    /// Label dump for the REPL's `?` command.
    pub fn dump_labels(&self) {
        let mut names: Vec<&String> = self.labels.keys().collect();
        names.sort();
        for name in names {
            let entry = &self.labels[name];
            println!("{name}\t{:#x}\t{}", entry.value.to_u64(), entry.section);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_stripping_honors_strings() {
        assert_eq!(strip_comment("nop ; comment"), "nop");
        assert_eq!(
            strip_comment(".ascii \"a;b\" ; real comment"),
            ".ascii \"a;b\""
        );
        assert_eq!(strip_comment("; all comment"), "");
    }

    #[test]
    fn subinst_counting() {
        assert_eq!(count_subinsts("nop"), 1);
        assert_eq!(count_subinsts("a !! b !! c"), 3);
        assert_eq!(count_subinsts("a !! b !!!!"), 2);
        assert_eq!(count_subinsts("x,!!!"), 1);
    }

    #[test]
    fn bundle_marker_detection() {
        assert_eq!(first_subinst_marker("a !! b"), Some(2));
        assert_eq!(first_subinst_marker("plain"), None);
        // a leading !!! token is not a separator
        assert_eq!(first_subinst_marker("x !!! y"), None);
    }
}
