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

//! VLIW bundling: the `.vliw`/`EPIC` configuration records and the
//! packager that folds the words of several `!!`-separated sub-
//! instructions into one fixed-width bundle with a template bitfield.

use crate::assembler::LineOutput;
use crate::file_reader::FileReader;
use crate::int256::Int256;
use crate::lexer::{at, has_prefix, skipspc};
use crate::patfile::PatternRecord;
use crate::state::Asm;

/// One registered slot composition: the multiset of slot indices it
/// covers and the template expression to stamp into the bundle.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotSet {
    pub indices: Vec<i64>,
    pub template: String,
}

#[derive(Debug, Clone)]
pub struct VliwConfig {
    pub enabled: bool,
    /// Bundle width in bits; negative selects little-endian emission.
    pub bits: i64,
    /// Bits per slot instruction.
    pub inst_bits: i64,
    /// Template field width; negative puts the template in the high bits.
    pub template_bits: i64,
    /// The no-op filler, split into instruction-sized bytes.
    pub nop: Vec<u64>,
    pub set: Vec<SlotSet>,
}

impl Default for VliwConfig {
    fn default() -> Self {
        VliwConfig {
            enabled: false,
            bits: 128,
            inst_bits: 41,
            template_bits: 0,
            nop: Vec::new(),
            set: Vec::new(),
        }
    }
}

/// Low-n-bits mask; n >= 256 masks nothing off.
fn mask_bits(n: i64) -> Int256 {
    Int256::ONE.shl(n.max(0) as u32) - Int256::ONE
}

impl Asm {
    /// `.vliw :: vliwbits :: instbits :: templatebits :: nopword`
    pub fn vliw_directive(&mut self, rec: &PatternRecord) {
        let mut vals = [0i64; 4];
        for (i, v) in vals.iter_mut().enumerate() {
            let f = &rec.fields[i + 1];
            if !f.is_empty() {
                let (_, x) = self.eval_pattern(f.as_bytes(), 0);
                *v = x.to_i64();
            }
        }
        self.vliw.bits = vals[0];
        self.vliw.inst_bits = vals[1];
        self.vliw.template_bits = vals[2];
        self.vliw.enabled = true;

        // nopword split little-endian into instruction-sized bytes
        let n = ((self.vliw.inst_bits.max(0) + 7) / 8) as usize;
        let mut nop = Vec::with_capacity(n);
        let mut val = vals[3];
        for _ in 0..n {
            nop.push((val & 0xff) as u64);
            val >>= 8;
        }
        self.vliw.nop = nop;
        tracing::debug!(
            bits = self.vliw.bits,
            inst_bits = self.vliw.inst_bits,
            template_bits = self.vliw.template_bits,
            "vliw mode enabled"
        );
    }

    /// `EPIC :: index-list :: template-expr`
    pub fn epic_directive(&mut self, rec: &PatternRecord) {
        let s = rec.fields[1].as_bytes();
        let mut indices = Vec::new();
        let mut idx = 0;
        while idx < s.len() {
            let (next, v) = self.eval_pattern(s, idx);
            if next == idx {
                break;
            }
            indices.push(v.to_i64());
            idx = next;
            if at(s, idx) == b',' {
                idx += 1;
            } else {
                break;
            }
        }
        self.vliw.set.push(SlotSet {
            indices,
            template: rec.fields[2].clone(),
        });
    }

    /// Pack the sub-instructions of one source line into a bundle and
    /// emit it at the PC. `first` holds the result of the already
    /// assembled first sub-instruction; `start` indexes the first `!!`.
    pub fn vliw_process(
        &mut self,
        line: &str,
        first: LineOutput,
        start: usize,
        reader: &dyn FileReader,
    ) -> bool {
        if !self.vliw.enabled {
            return false;
        }
        let s = line.as_bytes();
        let mut slots: Vec<Vec<Int256>> = vec![first.words];
        let mut idxlst: Vec<i64> = vec![first.slot_index.to_i64()];
        self.vliw_stop = Int256::ZERO;

        let mut idx = start;
        loop {
            idx = skipspc(s, idx);
            if has_prefix(s, "!!!!", idx) {
                idx += 4;
                self.vliw_stop = Int256::ONE;
                continue;
            }
            if has_prefix(s, "!!", idx) {
                idx += 2;
                let sub_start = idx;
                let mut end = idx;
                while end < s.len() && !(s[end] == b'!' && at(s, end + 1) == b'!') {
                    end += 1;
                }
                let sub = String::from_utf8_lossy(&s[sub_start..end]).into_owned();
                let (ok, out) = self.line_core(&sub, reader);
                if ok {
                    slots.push(out.words);
                    idxlst.push(out.slot_index.to_i64());
                }
                idx = end;
                continue;
            }
            break;
        }

        // a zero-width template forces the single trivial slot set
        if self.vliw.template_bits == 0 {
            self.vliw.set = vec![SlotSet {
                indices: vec![0],
                template: "0".to_string(),
            }];
        }

        let vbits = self.vliw.bits.unsigned_abs() as i64;
        let tbits = self.vliw.template_bits.unsigned_abs() as i64;
        let inst_bits = self.vliw.inst_bits;

        let mut sorted_idxs = idxlst.clone();
        sorted_idxs.sort_unstable();

        for k in self.vliw.set.clone() {
            if self.vliw.template_bits != 0 {
                let mut want = k.indices.clone();
                want.sort_unstable();
                if want != sorted_idxs {
                    continue;
                }
            }

            let (_, templ_val) = self.eval_pattern(k.template.as_bytes(), 0);

            // flatten the slot words to a byte stream and pad with nops
            let mut values: Vec<Int256> = slots.iter().flatten().copied().collect();
            let ibyte = ((inst_bits.max(1) + 7) / 8) as usize;
            let noi = if inst_bits > 0 {
                ((vbits - tbits) / inst_bits) as usize
            } else {
                0
            };
            let needed = ibyte * noi;
            if values.len() > needed && self.emits() {
                println!(" warning - vliw bundle overflow, truncated.");
            }
            while values.len() < needed {
                if self.vliw.nop.is_empty() {
                    values.push(Int256::ZERO);
                } else {
                    for &b in &self.vliw.nop {
                        if values.len() >= needed {
                            break;
                        }
                        values.push(Int256::from_u64(b));
                    }
                }
            }

            // assemble each instruction big-endian from its payload bytes
            let im = mask_bits(inst_bits);
            let byte_mask = Int256::from_u64(0xff);
            let mut packed = Int256::ZERO;
            let mut cnt = 0;
            for _ in 0..noi {
                let mut vv = Int256::ZERO;
                for _ in 0..ibyte {
                    vv = vv.shl(8);
                    if cnt < values.len() {
                        vv = vv | (values[cnt] & byte_mask);
                    }
                    cnt += 1;
                }
                packed = packed.shl(inst_bits as u32) | (vv & im);
            }
            if vbits < 256 {
                packed = packed & mask_bits(vbits);
            }

            let templ = templ_val & mask_bits(tbits);
            let res = if self.vliw.template_bits < 0 {
                packed | templ.shl((vbits - tbits) as u32)
            } else {
                packed.shl(tbits as u32) | templ
            };

            // bundle byte order follows the sign of vliwbits
            let total = (vbits / 8) as usize;
            if self.vliw.bits > 0 {
                for c in 0..total {
                    let shift = vbits as u32 - 8 - 8 * c as u32;
                    let byte = res.shr(shift) & byte_mask;
                    self.emit_word(self.pc + Int256::from_u64(c as u64), byte);
                }
            } else {
                let mut rest = res;
                for c in 0..total {
                    self.emit_word(self.pc + Int256::from_u64(c as u64), rest & byte_mask);
                    rest = rest.shr(8);
                }
            }
            self.pc = self.pc + Int256::from_u64(total as u64);
            return true;
        }

        if self.emits() {
            println!(" error - No vliw instruction-set defined.");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patfile::parse_record;

    fn configure(asm: &mut Asm, line: &str) {
        let rec = parse_record(line).unwrap();
        asm.vliw_directive(&rec);
    }

    #[test]
    fn vliw_directive_parses_fields() {
        let mut asm = Asm::new();
        configure(&mut asm, ".vliw :: 128 :: 41 :: 5 :: 0");
        assert!(asm.vliw.enabled);
        assert_eq!(asm.vliw.bits, 128);
        assert_eq!(asm.vliw.inst_bits, 41);
        assert_eq!(asm.vliw.template_bits, 5);
        assert_eq!(asm.vliw.nop, vec![0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn nopword_splits_little_endian() {
        let mut asm = Asm::new();
        configure(&mut asm, ".vliw :: 64 :: 16 :: 0 :: 0x1234");
        assert_eq!(asm.vliw.nop, vec![0x34, 0x12]);
    }

    #[test]
    fn epic_registers_slot_sets_in_order() {
        let mut asm = Asm::new();
        let rec = parse_record("EPIC :: 0,1 :: 0b00001").unwrap();
        asm.epic_directive(&rec);
        let rec = parse_record("EPIC :: 0,2 :: 0b00010").unwrap();
        asm.epic_directive(&rec);
        assert_eq!(asm.vliw.set.len(), 2);
        assert_eq!(asm.vliw.set[0].indices, vec![0, 1]);
        assert_eq!(asm.vliw.set[1].template, "0b00010");
    }

    #[test]
    fn mask_bits_saturates() {
        assert_eq!(mask_bits(8), Int256::from_u64(0xff));
        assert_eq!(mask_bits(0), Int256::ZERO);
        assert_eq!(mask_bits(256), Int256::UNDEF);
    }
}
