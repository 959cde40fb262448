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

//! Object-code builder: expands the repetition macros in a recipe and
//! evaluates its comma-separated expressions into output words.
//!
//! Expansion order: `@@[n,body]`, then `rep[n,body]`, then the `%%`
//! counter with its `%0` reset.

use crate::int256::Int256;
use crate::lexer::{at, has_prefix};
use crate::state::Asm;

/// Replace `%%` with 0,1,2,... left to right; `%0` resets the counter.
fn percent_substitute(input: &str) -> String {
    let s = input.as_bytes();
    let mut out = String::with_capacity(s.len());
    let mut count = 0u64;
    let mut i = 0;
    while i < s.len() {
        if i + 1 < s.len() && s[i] == b'%' && s[i + 1] == b'%' {
            out.push_str(&count.to_string());
            count += 1;
            i += 2;
        } else if i + 1 < s.len() && s[i] == b'%' && s[i + 1] == b'0' {
            count = 0;
            i += 2;
        } else {
            out.push(s[i] as char);
            i += 1;
        }
    }
    out
}

impl Asm {
    /// Expand `@@[n,body]` groups. Returns the expansion and whether the
    /// recipe consisted solely of groups that all produced nothing.
    fn expand_atat(&mut self, input: &str) -> (String, bool) {
        let s = input.as_bytes();
        let mut out = String::with_capacity(s.len());
        let mut all_empty = true;
        let mut i = 0;
        while i < s.len() {
            if has_prefix(s, "@@[", i) && i + 3 < s.len() {
                i += 3;
                let start = i;
                let mut depth = 1;
                while i < s.len() {
                    match s[i] {
                        b'[' => depth += 1,
                        b']' => {
                            if depth == 1 {
                                break;
                            }
                            depth -= 1;
                        }
                        b',' if depth == 1 => break,
                        _ => {}
                    }
                    i += 1;
                }
                let expr = input[start..i].to_string();
                if at(s, i) != b',' {
                    out.push_str("@@[");
                    out.push_str(&expr);
                    all_empty = false;
                    continue;
                }
                i += 1;
                let bstart = i;
                let mut depth = 1;
                while i < s.len() {
                    match s[i] {
                        b'[' => depth += 1,
                        b']' => {
                            if depth == 1 {
                                break;
                            }
                            depth -= 1;
                        }
                        _ => {}
                    }
                    i += 1;
                }
                let body = &input[bstart..i];
                if at(s, i) == b']' {
                    i += 1;
                }
                let (_, n) = self.eval_pattern(expr.as_bytes(), 0);
                let n = n.to_i64();
                if n > 0 {
                    all_empty = false;
                    for rep in 0..n {
                        if rep > 0 {
                            out.push(',');
                        }
                        out.push_str(body);
                    }
                }
            } else {
                out.push(s[i] as char);
                all_empty = false;
                i += 1;
            }
        }
        (out, all_empty)
    }

    /// Expand `rep[n,body]` groups.
    fn expand_rep(&mut self, input: &str) -> String {
        let s = input.as_bytes();
        let mut out = String::with_capacity(s.len());
        let mut i = 0;
        while i < s.len() {
            if has_prefix(s, "rep[", i) {
                i += 4;
                let start = i;
                let mut depth = 0;
                while i < s.len() {
                    match s[i] {
                        b'[' => depth += 1,
                        b']' => {
                            if depth == 0 {
                                break;
                            }
                            depth -= 1;
                        }
                        b',' if depth == 0 => break,
                        _ => {}
                    }
                    i += 1;
                }
                let expr = input[start..i].to_string();
                if at(s, i) != b',' {
                    out.push_str("rep[");
                    out.push_str(&expr);
                    continue;
                }
                i += 1;
                let bstart = i;
                let mut depth = 0;
                while i < s.len() {
                    match s[i] {
                        b'[' => depth += 1,
                        b']' => {
                            if depth == 0 {
                                break;
                            }
                            depth -= 1;
                        }
                        _ => {}
                    }
                    i += 1;
                }
                let body = &input[bstart..i];
                if at(s, i) == b']' {
                    i += 1;
                }
                let (_, n) = self.eval_pattern(expr.as_bytes(), 0);
                for rep in 0..n.to_i64() {
                    if rep > 0 {
                        out.push(',');
                    }
                    out.push_str(body);
                }
            } else {
                out.push(s[i] as char);
                i += 1;
            }
        }
        out
    }

    /// Evaluate a recipe into its word list. A term opening with `;` is
    /// kept only when nonzero; an empty term (consecutive commas, or a
    /// group that expanded to nothing) pads up to the current alignment
    /// with the padding byte.
    pub(crate) fn makeobj(&mut self, recipe: &str) -> Vec<Int256> {
        let (atat, all_empty) = self.expand_atat(recipe);
        if all_empty && atat.is_empty() {
            return Vec::new();
        }
        let expanded = self.expand_rep(&atat);
        let expanded = percent_substitute(&expanded);
        let s = expanded.as_bytes();

        let mut objl: Vec<Int256> = Vec::new();
        let mut idx = 0;
        loop {
            idx = crate::lexer::skipspc(s, idx);
            let c = at(s, idx);
            if c == 0 {
                break;
            }
            if c == b',' {
                idx += 1;
                let p = self.pc + Int256::from_u64(objl.len() as u64);
                let target = self.align_addr(p);
                let mut fill = p;
                while fill < target {
                    objl.push(self.padding);
                    fill = fill + Int256::ONE;
                }
                continue;
            }
            let semicolon = c == b';';
            if semicolon {
                idx += 1;
            }
            let start = idx;
            let (ni, x) = self.eval_pattern(s, idx);
            idx = ni;
            if idx == start && at(s, idx) != 0 {
                idx += 1;
                continue;
            }
            if !semicolon || !x.is_zero() {
                objl.push(x);
            }
            if at(s, idx) == b',' {
                idx += 1;
            }
        }
        objl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn i(v: i64) -> Int256 {
        Int256::from_i64(v)
    }

    #[test]
    fn plain_terms() {
        let mut asm = Asm::new();
        assert_eq!(asm.makeobj("0x90"), vec![i(0x90)]);
        assert_eq!(asm.makeobj("1, 2, 3"), vec![i(1), i(2), i(3)]);
    }

    #[test]
    fn atat_expansion() {
        let mut asm = Asm::new();
        assert_eq!(asm.makeobj("@@[3,7]"), vec![i(7), i(7), i(7)]);
        assert!(asm.makeobj("@@[0,7]").is_empty());
        asm.set_var(b'n', i(2));
        assert_eq!(asm.makeobj("@@[n,5]"), vec![i(5), i(5)]);
    }

    #[test]
    fn rep_expansion_and_counter() {
        let mut asm = Asm::new();
        assert_eq!(asm.makeobj("rep[3,%%]"), vec![i(0), i(1), i(2)]);
        assert_eq!(asm.makeobj("rep[2,%%],%0 %%"), vec![i(0), i(1), i(0)]);
        assert!(asm.makeobj("rep[0,9]").is_empty());
    }

    #[test]
    fn atat_expands_before_rep() {
        let mut asm = Asm::new();
        // the @@ body contains a rep that must survive the first stage
        assert_eq!(asm.makeobj("@@[1,rep[2,4]]"), vec![i(4), i(4)]);
    }

    #[test]
    fn conditional_terms() {
        let mut asm = Asm::new();
        assert_eq!(asm.makeobj(";0,1,;2"), vec![i(1), i(2)]);
        assert_eq!(asm.makeobj(";5"), vec![i(5)]);
        assert!(asm.makeobj(";0").is_empty());
    }

    #[test]
    fn empty_term_pads_to_alignment() {
        let mut asm = Asm::new();
        asm.align = i(4);
        asm.padding = i(0xCC);
        // the vanished group leaves an empty term, which pads
        assert_eq!(
            asm.makeobj("1,@@[0,9],2"),
            vec![i(1), i(0xCC), i(0xCC), i(0xCC), i(2)]
        );
        // ordinary comma-separated terms do not pad
        assert_eq!(asm.makeobj("1,2"), vec![i(1), i(2)]);
    }

    #[test]
    fn pattern_variables_in_recipes() {
        let mut asm = Asm::new();
        asm.set_var(b'a', i(3));
        asm.set_var(b'b', i(4));
        assert_eq!(asm.makeobj("0x40|a<<3|b"), vec![i(0x5c)]);
    }
}
