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

use crate::image::{Endianness, Image, word_bytes};
use crate::int256::Int256;
use crate::lexer::{CAPITAL, DIGIT, LOWER};
use crate::patfile::PatternRecord;
use crate::vliw::VliwConfig;
use std::collections::HashMap;

/// Which pass the driver is running. The interactive REPL behaves like a
/// single pass that both binds labels and emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pass {
    First,
    Second,
    Interactive,
}

/// Expression evaluation mode: in pattern mode single lowercase letters
/// are pattern variables and `!!!`/`!!!!` resolve to the bundle counters;
/// in assembly mode identifiers are always labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprMode {
    Pattern,
    Assembly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LabelEntry {
    pub value: Int256,
    pub section: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SectionRecord {
    pub name: String,
    pub start: Int256,
    pub size: Int256,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportLabel {
    pub name: String,
    pub value: Int256,
    pub section: String,
}

/// The whole assembler state. One instance is owned by the driver and
/// passed down explicitly; nothing else aliases it.
pub struct Asm {
    pub pass: Pass,
    pub pc: Int256,
    pub padding: Int256,
    pub align: Int256,
    pub bts: i64,
    pub endian: Endianness,
    pub exp_mode: ExprMode,
    /// The 26 pattern variables A..Z.
    pub vars: [Int256; 26],
    /// `!!!`: number of sub-instructions on the current line.
    pub vcnt: Int256,
    /// `!!!!`: the bundle stop marker value.
    pub vliw_stop: Int256,
    pub labels: HashMap<String, LabelEntry>,
    pub symbols: HashMap<String, Int256>,
    /// Snapshot of the symbols defined by the pattern file; the no-arg
    /// `.clearsym` restores to this.
    pub pat_symbols: HashMap<String, Int256>,
    pub sections: Vec<SectionRecord>,
    pub exports: Vec<ExportLabel>,
    pub patterns: Vec<PatternRecord>,
    pub vliw: VliwConfig,
    pub lwordchars: String,
    pub swordchars: String,
    pub current_section: String,
    pub current_file: String,
    pub line_no: usize,
    /// Per-line flag: some expression looked up an unresolved label.
    pub undef_label: bool,
    pub image: Image,
    pub file_stack: Vec<(String, usize)>,
}

impl Asm {
    pub fn new() -> Self {
        let alphabet = format!("{LOWER}{CAPITAL}");
        Asm {
            pass: Pass::First,
            pc: Int256::ZERO,
            padding: Int256::ZERO,
            align: Int256::from_u64(16),
            bts: 8,
            endian: Endianness::Little,
            exp_mode: ExprMode::Pattern,
            vars: [Int256::ZERO; 26],
            vcnt: Int256::ONE,
            vliw_stop: Int256::ZERO,
            labels: HashMap::new(),
            symbols: HashMap::new(),
            pat_symbols: HashMap::new(),
            sections: Vec::new(),
            exports: Vec::new(),
            patterns: Vec::new(),
            vliw: VliwConfig::default(),
            lwordchars: format!("{DIGIT}{alphabet}_."),
            swordchars: format!("{DIGIT}{alphabet}_%$-~&|"),
            current_section: ".text".to_string(),
            current_file: String::new(),
            line_no: 1,
            undef_label: false,
            image: Image::new(),
            file_stack: Vec::new(),
        }
    }

    /// True when words actually land in the image (pass 2 and the REPL).
    pub fn emits(&self) -> bool {
        self.pass != Pass::First
    }

    /// Reset the pass-local state, keeping labels, symbols, patterns and
    /// the VLIW configuration.
    pub fn begin_pass(&mut self, pass: Pass) {
        self.pass = pass;
        self.pc = Int256::ZERO;
        self.line_no = 1;
        self.image.clear();
        self.file_stack.clear();
        self.current_section = ".text".to_string();
    }

    // ---- pattern variables ----

    pub fn var(&self, letter: u8) -> Int256 {
        let i = letter.to_ascii_uppercase().wrapping_sub(b'A') as usize;
        if i < 26 { self.vars[i] } else { Int256::ZERO }
    }

    pub fn set_var(&mut self, letter: u8, v: Int256) {
        let i = letter.to_ascii_uppercase().wrapping_sub(b'A') as usize;
        if i < 26 {
            self.vars[i] = v;
        }
    }

    pub fn reset_vars(&mut self) {
        self.vars = [Int256::ZERO; 26];
    }

    // ---- symbols ----

    pub fn sym_val(&self, name: &str) -> Int256 {
        self.symbols
            .get(&name.to_uppercase())
            .copied()
            .unwrap_or(Int256::ZERO)
    }

    pub fn sym_val_ok(&self, name: &str) -> Option<Int256> {
        self.symbols.get(&name.to_uppercase()).copied()
    }

    pub fn set_symbol(&mut self, name: &str, value: Int256) {
        self.symbols.insert(name.to_uppercase(), value);
    }

    /// `.clearsym name` deletes one symbol; the no-arg form restores the
    /// pattern-file snapshot.
    pub fn clear_symbol(&mut self, name: Option<&str>) {
        match name {
            Some(n) if !n.is_empty() => {
                self.symbols.remove(&n.to_uppercase());
            }
            _ => {
                self.symbols = self.pat_symbols.clone();
            }
        }
    }

    pub fn snapshot_pat_symbols(&mut self) {
        self.pat_symbols = self.symbols.clone();
    }

    // ---- labels ----

    /// Look up a label; a miss yields UNDEF and raises the per-line
    /// undefined-label flag.
    pub fn label_value(&mut self, name: &str) -> Int256 {
        match self.labels.get(name) {
            Some(entry) => entry.value,
            None => {
                self.undef_label = true;
                Int256::UNDEF
            }
        }
    }

    pub fn label_section(&mut self, name: &str) -> String {
        match self.labels.get(name) {
            Some(entry) => entry.section.clone(),
            None => {
                self.undef_label = true;
                String::new()
            }
        }
    }

    /// Bind a label. Pass 1 and the REPL reject duplicates; pass 2
    /// expects the label to already exist. A collision with a pattern
    /// symbol is refused in any pass.
    pub fn put_label(&mut self, name: &str, value: Int256, section: &str) -> bool {
        if self.pass != Pass::Second && self.labels.contains_key(name) {
            println!(" error - label already defined.");
            return false;
        }
        if self.pat_symbols.contains_key(name) {
            println!(" error - '{name}' is a pattern file symbol.");
            return false;
        }
        if self.pass == Pass::Second && !self.labels.contains_key(name) {
            println!(" error - label '{name}' missing in pass 2.");
        }
        self.labels.insert(
            name.to_string(),
            LabelEntry {
                value,
                section: section.to_string(),
            },
        );
        true
    }

    // ---- sections ----

    pub fn enter_section(&mut self, name: &str) {
        self.current_section = name.to_string();
        let pc = self.pc;
        if let Some(sec) = self.sections.iter_mut().find(|s| s.name == name) {
            sec.start = pc;
        } else {
            self.sections.push(SectionRecord {
                name: name.to_string(),
                start: pc,
                size: Int256::ZERO,
            });
        }
    }

    pub fn close_section(&mut self) {
        let pc = self.pc;
        let current = self.current_section.clone();
        if let Some(sec) = self.sections.iter_mut().find(|s| s.name == current) {
            sec.size = pc - sec.start;
        }
    }

    // ---- alignment ----

    pub fn align_addr(&self, addr: Int256) -> Int256 {
        if self.align <= Int256::ZERO {
            return addr;
        }
        let a = addr.rem_floor(self.align);
        if a.is_zero() {
            addr
        } else {
            addr + (self.align - a)
        }
    }

    // ---- emission ----

    /// Write one word and echo its bytes into the listing.
    pub fn emit_word(&mut self, pos: Int256, value: Int256) {
        self.write_word(pos, value, true);
    }

    /// Write one word silently (gap fill, `.zero`).
    pub fn emit_word_quiet(&mut self, pos: Int256, value: Int256) {
        self.write_word(pos, value, false);
    }

    fn write_word(&mut self, pos: Int256, value: Int256, listing: bool) {
        if !self.emits() {
            return;
        }
        self.image.store(pos.to_u64(), value.to_u64());
        if listing {
            for b in word_bytes(value.to_u64(), self.bts, self.endian) {
                print!(" 0x{b:02x}");
            }
        }
    }
}

impl Default for Asm {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_labels_rejected_in_first_pass() {
        let mut asm = Asm::new();
        assert!(asm.put_label("x", Int256::from_u64(1), ".text"));
        assert!(!asm.put_label("x", Int256::from_u64(2), ".text"));
        assert_eq!(asm.label_value("x"), Int256::from_u64(1));
    }

    #[test]
    fn second_pass_overwrites() {
        let mut asm = Asm::new();
        asm.put_label("x", Int256::from_u64(1), ".text");
        asm.begin_pass(Pass::Second);
        assert!(asm.put_label("x", Int256::from_u64(5), ".text"));
        assert_eq!(asm.label_value("x"), Int256::from_u64(5));
    }

    #[test]
    fn pattern_symbol_collision_refused() {
        let mut asm = Asm::new();
        asm.set_symbol("R1", Int256::from_u64(1));
        asm.snapshot_pat_symbols();
        assert!(!asm.put_label("R1", Int256::ZERO, ".text"));
    }

    #[test]
    fn missing_label_flags_line() {
        let mut asm = Asm::new();
        assert_eq!(asm.label_value("nope"), Int256::UNDEF);
        assert!(asm.undef_label);
    }

    #[test]
    fn clearsym_restores_snapshot() {
        let mut asm = Asm::new();
        asm.set_symbol("A", Int256::ONE);
        asm.snapshot_pat_symbols();
        asm.set_symbol("B", Int256::from_u64(2));
        asm.clear_symbol(None);
        assert_eq!(asm.sym_val_ok("B"), None);
        assert_eq!(asm.sym_val("A"), Int256::ONE);
        asm.clear_symbol(Some("a"));
        assert_eq!(asm.sym_val_ok("A"), None);
    }

    #[test]
    fn section_bookkeeping() {
        let mut asm = Asm::new();
        asm.pc = Int256::from_u64(4);
        asm.enter_section(".data");
        asm.pc = Int256::from_u64(10);
        asm.close_section();
        let sec = &asm.sections[0];
        assert_eq!(sec.start, Int256::from_u64(4));
        assert_eq!(sec.size, Int256::from_u64(6));
    }

    #[test]
    fn alignment_rounds_up() {
        let mut asm = Asm::new();
        asm.align = Int256::from_u64(4);
        assert_eq!(asm.align_addr(Int256::from_u64(5)), Int256::from_u64(8));
        assert_eq!(asm.align_addr(Int256::from_u64(8)), Int256::from_u64(8));
    }
}
