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

//! Source-line / pattern unification.
//!
//! The inner matcher walks both strings left to right, dispatching on the
//! pattern character: literals, case-insensitive uppercase letters,
//! `!!X` factor captures, `!X` expression captures with an optional stop
//! character, and lowercase symbol lookups. The outer matcher handles the
//! optional `[[ ... ]]` groups by trying every subset of them.

use crate::lexer::{at, get_symbol_word, skipspc};
use crate::state::Asm;

// sentinel bytes standing in for [[ and ]] while bracket groups are
// resolved
const OB: u8 = 0x90;
const CB: u8 = 0x91;

/// Replace `[[`/`]]` with the sentinel bytes.
fn to_sentinels(pattern: &str) -> Vec<u8> {
    let s = pattern.as_bytes();
    let mut out = Vec::with_capacity(s.len());
    let mut i = 0;
    while i < s.len() {
        if s[i] == b'[' && at(s, i + 1) == b'[' {
            out.push(OB);
            i += 2;
        } else if s[i] == b']' && at(s, i + 1) == b']' {
            out.push(CB);
            i += 2;
        } else {
            out.push(s[i]);
            i += 1;
        }
    }
    out
}

/// Matched sentinel pairs as (open, close) positions, in opening order.
fn bracket_pairs(t: &[u8]) -> Vec<(usize, usize)> {
    let mut stack = Vec::new();
    let mut pairs = Vec::new();
    for (i, &c) in t.iter().enumerate() {
        if c == OB {
            stack.push(i);
        } else if c == CB {
            if let Some(open) = stack.pop() {
                pairs.push((open, i));
            }
        }
    }
    pairs.sort_unstable();
    pairs
}

/// Remove the spans of the selected pairs (sentinels included).
fn remove_groups(t: &[u8], pairs: &[(usize, usize)], mask: u64) -> Vec<u8> {
    let mut delete = vec![false; t.len()];
    for (k, &(open, close)) in pairs.iter().enumerate() {
        if mask >> k & 1 == 1 {
            for d in delete.iter_mut().take(close + 1).skip(open) {
                *d = true;
            }
        }
    }
    t.iter()
        .zip(&delete)
        .filter(|&(_, &d)| !d)
        .map(|(&c, _)| c)
        .collect()
}

impl Asm {
    /// Outer matcher: try the pattern with every subset of its optional
    /// `[[ ... ]]` groups removed. The first success wins; the no-removal
    /// form is tried first.
    pub fn match_with_brackets(&mut self, source: &str, pattern: &str) -> bool {
        let t = to_sentinels(pattern);
        let pairs = bracket_pairs(&t);
        if pairs.is_empty() {
            self.reset_vars();
            return self.match_line(source.as_bytes(), &t);
        }
        let cnt = pairs.len().min(63);
        for mask in 0..(1u64 << cnt) {
            let candidate = remove_groups(&t, &pairs[..cnt], mask);
            self.reset_vars();
            if self.match_line(source.as_bytes(), &candidate) {
                return true;
            }
        }
        false
    }

    /// Inner matcher over one concrete pattern. Remaining sentinels (from
    /// groups kept in place) are dropped before matching.
    pub fn match_line(&mut self, src: &[u8], pattern: &[u8]) -> bool {
        let pat: Vec<u8> = pattern
            .iter()
            .copied()
            .filter(|&c| c != OB && c != CB)
            .collect();
        let pat = &pat[..];

        let mut si = skipspc(src, 0);
        let mut pi = skipspc(pat, 0);
        loop {
            si = skipspc(src, si);
            pi = skipspc(pat, pi);
            let b = at(src, si);
            let a = at(pat, pi);

            if a == 0 && b == 0 {
                return true;
            }
            if a == b'\\' {
                // escaped literal matches exactly
                pi += 1;
                if at(pat, pi) == b && b != 0 {
                    pi += 1;
                    si += 1;
                    continue;
                }
                return false;
            }
            if a.is_ascii_uppercase() {
                if a == b.to_ascii_uppercase() {
                    si += 1;
                    pi += 1;
                    continue;
                }
                return false;
            }
            if a == b'!' {
                pi += 1;
                let var = at(pat, pi);
                pi += 1;
                if var == b'!' {
                    // !!X: capture the next source token as a factor
                    let var = at(pat, pi);
                    pi += 1;
                    let (ni, v) = self.factor(src, si);
                    si = ni;
                    self.set_var(var, v);
                    continue;
                }
                // !X: full expression up to the stop character; a leading
                // backslash quotes the delimiter, which stays in the
                // pattern and is matched literally afterwards
                pi = skipspc(pat, pi);
                let stop = if at(pat, pi) == b'\\' {
                    pi = skipspc(pat, pi + 1);
                    at(pat, pi)
                } else {
                    at(pat, pi)
                };
                let (ni, v) = self.expression_esc(src, si, stop);
                si = ni;
                self.set_var(var, v);
                continue;
            }
            if a.is_ascii_lowercase() {
                // symbol operand: the word must exist in the symbol store
                pi += 1;
                let (ni, w) = get_symbol_word(src, si, &self.swordchars);
                si = ni;
                match self.sym_val_ok(&w) {
                    Some(v) => {
                        self.set_var(a, v);
                        continue;
                    }
                    None => return false,
                }
            }
            if a == b && a != 0 {
                pi += 1;
                si += 1;
                continue;
            }
            return false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::int256::Int256;

    fn i(v: i64) -> Int256 {
        Int256::from_i64(v)
    }

    fn asm_with_regs() -> Asm {
        let mut asm = Asm::new();
        asm.set_symbol("R0", i(0));
        asm.set_symbol("R1", i(1));
        asm.set_symbol("R2", i(2));
        asm.snapshot_pat_symbols();
        asm
    }

    #[test]
    fn literal_and_uppercase_matching() {
        let mut asm = asm_with_regs();
        assert!(asm.match_line(b"nop", b"NOP"));
        assert!(asm.match_line(b"NOP", b"NOP"));
        assert!(asm.match_line(b" nop ", b"NOP"));
        assert!(!asm.match_line(b"nopx", b"NOP"));
        assert!(!asm.match_line(b"nop", b"NOPS"));
    }

    #[test]
    fn symbol_operands_bind_variables() {
        let mut asm = asm_with_regs();
        assert!(asm.match_line(b"mov r1,r2", b"MOV a,b"));
        assert_eq!(asm.var(b'A'), i(1));
        assert_eq!(asm.var(b'B'), i(2));
        assert!(!asm.match_line(b"mov r9,r2", b"MOV a,b"));
    }

    #[test]
    fn expression_capture_with_delimiter() {
        let mut asm = asm_with_regs();
        assert!(asm.match_line(b"add r1,2+3", b"ADD a,!n"));
        assert_eq!(asm.var(b'N'), i(5));
        // delimited capture: the comma after the expression is matched
        // literally once the capture stops there
        assert!(asm.match_line(b"out 7,r2", b"OUT !p\\,b"));
        assert_eq!(asm.var(b'P'), i(7));
        assert_eq!(asm.var(b'B'), i(2));
    }

    #[test]
    fn factor_capture_takes_one_token() {
        let mut asm = asm_with_regs();
        assert!(asm.match_line(b"ld 4+1", b"LD !!x+!y"));
        // !!x grabs only the factor 4; the +1 stays for the rest of the
        // pattern
        assert_eq!(asm.var(b'X'), i(4));
        assert_eq!(asm.var(b'Y'), i(1));
    }

    #[test]
    fn escaped_literals_match_exactly() {
        let mut asm = asm_with_regs();
        assert!(asm.match_line(b"inc (hl)", b"INC \\(HL\\)"));
        assert!(!asm.match_line(b"inc hl", b"INC \\(HL\\)"));
    }

    #[test]
    fn memory_operand_brackets_are_literal() {
        let mut asm = asm_with_regs();
        assert!(asm.match_line(b"ld r1,[8]", b"LD a,[!n\\]"));
        assert_eq!(asm.var(b'N'), i(8));
    }

    #[test]
    fn optional_group_present_or_absent() {
        let mut asm = asm_with_regs();
        assert!(asm.match_with_brackets("ld r1", "LD a[[,!n]]"));
        assert_eq!(asm.var(b'A'), i(1));
        assert_eq!(asm.var(b'N'), i(0));
        assert!(asm.match_with_brackets("ld r1 , 5", "LD a[[,!n]]"));
        assert_eq!(asm.var(b'N'), i(5));
        assert!(!asm.match_with_brackets("ld r1 , 5, 6", "LD a[[,!n]]"));
    }

    #[test]
    fn sibling_groups_are_independent() {
        let mut asm = asm_with_regs();
        let pat = "OP a[[,!n]][[,b]]";
        assert!(asm.match_with_brackets("op r0", pat));
        assert!(asm.match_with_brackets("op r0,5", pat));
        assert_eq!(asm.var(b'N'), i(5));
        assert!(asm.match_with_brackets("op r0,5,r2", pat));
        assert_eq!(asm.var(b'B'), i(2));
    }

    #[test]
    fn nested_groups() {
        let mut asm = asm_with_regs();
        let pat = "OP a[[,!n[[,!m]]]]";
        assert!(asm.match_with_brackets("op r1", pat));
        assert!(asm.match_with_brackets("op r1,4", pat));
        assert_eq!(asm.var(b'N'), i(4));
        assert!(asm.match_with_brackets("op r1,4,9", pat));
        assert_eq!(asm.var(b'M'), i(9));
    }

    #[test]
    fn variables_reset_between_attempts() {
        let mut asm = asm_with_regs();
        assert!(asm.match_with_brackets("ld r1 , 5", "LD a[[,!n]]"));
        assert_eq!(asm.var(b'N'), i(5));
        assert!(asm.match_with_brackets("ld r1", "LD a[[,!n]]"));
        assert_eq!(asm.var(b'N'), i(0));
    }
}
