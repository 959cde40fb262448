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

//! Assembly-side directives, dispatched on the first token of the line
//! before the pattern loop runs.

use crate::file_reader::FileReader;
use crate::int256::Int256;
use crate::lexer::{CAPITAL, DIGIT, LOWER, at, get_label_word, get_string, skipspc};
use crate::state::{Asm, ExportLabel};

impl Asm {
    /// Returns true when the line was a directive and is fully handled.
    pub(crate) fn asm_directive(&mut self, l: &str, l2: &str, reader: &dyn FileReader) -> bool {
        match l.to_uppercase().as_str() {
            "SECTION" | "SEGMENT" => {
                if !l2.is_empty() {
                    self.enter_section(l2);
                }
                true
            }
            "ENDSECTION" | "ENDSEGMENT" => {
                self.close_section();
                true
            }
            ".ZERO" => {
                let (_, x) = self.eval_assembly(l2.as_bytes(), 0);
                // writes n+1 zero bytes
                let n = x.to_i64();
                let mut i = 0;
                while i <= n {
                    let pc = self.pc;
                    self.emit_word_quiet(pc, Int256::ZERO);
                    self.pc = pc + Int256::ONE;
                    i += 1;
                }
                true
            }
            ".ASCII" => self.ascii_string(l2),
            ".ASCIIZ" => {
                let ok = self.ascii_string(l2);
                if ok {
                    let pc = self.pc;
                    self.emit_word(pc, Int256::ZERO);
                    self.pc = pc + Int256::ONE;
                }
                ok
            }
            ".INCLUDE" => {
                let file = get_string(l2.as_bytes());
                if !file.is_empty() {
                    self.assemble_file(&file, reader);
                }
                true
            }
            ".ALIGN" => {
                if !l2.is_empty() {
                    let (_, v) = self.eval_assembly(l2.as_bytes(), 0);
                    self.align = v;
                }
                self.pc = self.align_addr(self.pc);
                true
            }
            ".ORG" => {
                let b = l2.as_bytes();
                let (idx, v) = self.eval_assembly(b, 0);
                let rest =
                    String::from_utf8_lossy(&b[idx.min(b.len())..]).to_uppercase();
                if rest.contains(",P") && v > self.pc {
                    let mut i = self.pc;
                    while i < v {
                        let pad = self.padding;
                        self.emit_word_quiet(i, pad);
                        i = i + Int256::ONE;
                    }
                }
                self.pc = v;
                true
            }
            ".LABELC" => {
                if !l2.is_empty() {
                    self.lwordchars = format!("{LOWER}{CAPITAL}{DIGIT}{l2}");
                }
                true
            }
            ".SYMBOLC" => {
                if !l2.is_empty() {
                    self.swordchars = format!("{LOWER}{CAPITAL}{DIGIT}{l2}");
                }
                true
            }
            ".EXPORT" => {
                // only pass 2 and the REPL snapshot the export table
                if !self.emits() {
                    return false;
                }
                let b = l2.as_bytes();
                let mut idx = 0;
                while at(b, idx) != 0 {
                    idx = skipspc(b, idx);
                    let (ni, name) = get_label_word(b, idx, &self.lwordchars);
                    idx = ni;
                    if name.is_empty() {
                        break;
                    }
                    if at(b, idx) == b':' {
                        idx += 1;
                    }
                    let value = self.label_value(&name);
                    let section = self.label_section(&name);
                    self.exports.push(ExportLabel {
                        name,
                        value,
                        section,
                    });
                    if at(b, idx) == b',' {
                        idx += 1;
                    }
                }
                true
            }
            _ => false,
        }
    }

    /// Write the bytes of a quoted string at the PC, handling the `\0`,
    /// `\t` and `\n` escapes. Returns whether the closing quote was
    /// found.
    fn ascii_string(&mut self, l2: &str) -> bool {
        let b = l2.as_bytes();
        let mut idx = skipspc(b, 0);
        if at(b, idx) != b'"' {
            return false;
        }
        idx += 1;
        while idx < b.len() {
            if b[idx] == b'"' {
                return true;
            }
            let ch = if b[idx] == b'\\' && idx + 1 < b.len() {
                match b[idx + 1] {
                    b'0' => {
                        idx += 2;
                        0
                    }
                    b't' => {
                        idx += 2;
                        b'\t'
                    }
                    b'n' => {
                        idx += 2;
                        b'\n'
                    }
                    _ => {
                        idx += 1;
                        b'\\'
                    }
                }
            } else {
                let c = b[idx];
                idx += 1;
                c
            };
            let pc = self.pc;
            self.emit_word(pc, Int256::from_u64(ch as u64));
            self.pc = pc + Int256::ONE;
        }
        false
    }
}
