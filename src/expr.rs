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

//! Precedence-climbing expression evaluator over a byte cursor.
//!
//! Twelve tiers from `factor` (unary, literals) up to the ternary. Every
//! tier returns the advanced cursor together with the value; evaluation
//! never fails, it only raises diagnostics and flags on the assembler
//! state.

use crate::floatexpr;
use crate::int256::Int256;
use crate::lexer::{
    LOWER, at, get_curly, get_float_str, get_int_str, get_label_word, get_symbol_word, has_prefix,
    has_prefix_ci, skipspc,
};
use crate::state::{Asm, ExprMode};

impl Asm {
    /// Evaluate in pattern mode (recipes, directive arguments).
    pub fn eval_pattern(&mut self, s: &[u8], idx: usize) -> (usize, Int256) {
        self.exp_mode = ExprMode::Pattern;
        self.expression(s, idx)
    }

    /// Evaluate in assembly mode (source-line expressions).
    pub fn eval_assembly(&mut self, s: &[u8], idx: usize) -> (usize, Int256) {
        self.exp_mode = ExprMode::Assembly;
        self.expression(s, idx)
    }

    /// Evaluate in the caller's current mode.
    pub fn expression(&mut self, s: &[u8], idx: usize) -> (usize, Int256) {
        let idx = skipspc(s, idx);
        self.term11(s, idx)
    }

    /// Escape-stopchar variant: copy the input from `idx` up to the first
    /// occurrence of `stop` at bracket/paren depth zero, then evaluate the
    /// copy from its start. Depth counting begins at `idx`, so an opening
    /// bracket consumed before the capture is not double-counted.
    pub fn expression_esc(&mut self, s: &[u8], idx: usize, stop: u8) -> (usize, Int256) {
        let mut depth = 0usize;
        let mut copy = Vec::with_capacity(s.len() - idx.min(s.len()));
        for &ch in &s[idx.min(s.len())..] {
            if depth == 0 && ch == stop && stop != 0 {
                break;
            }
            match ch {
                b'(' | b'[' => depth += 1,
                b')' | b']' => depth = depth.saturating_sub(1),
                _ => {}
            }
            copy.push(ch);
        }
        let (end, v) = self.expression(&copy, 0);
        (idx + end, v)
    }

    /// Replace each `:name` with the decimal value of the label. Used on
    /// source lines ahead of pattern matching and inside the decimal
    /// float backend.
    pub fn expand_colon_labels(&mut self, input: &str) -> String {
        let s = input.as_bytes();
        let mut out = String::with_capacity(input.len());
        let mut i = 0;
        while i < s.len() {
            let c = s[i];
            if c == b':'
                && i + 1 < s.len()
                && (s[i + 1].is_ascii_alphabetic() || s[i + 1] == b'.' || s[i + 1] == b'_')
            {
                i += 1;
                let start = i;
                while i < s.len()
                    && (s[i].is_ascii_alphanumeric() || s[i] == b'_' || s[i] == b'.')
                {
                    i += 1;
                }
                let name = std::str::from_utf8(&s[start..i]).unwrap_or("");
                let v = self.label_value(name);
                out.push_str(&v.to_string());
            } else {
                out.push(c as char);
                i += 1;
            }
        }
        out
    }

    // ---- tier 1-2: unary operators and literals ----

    pub fn factor(&mut self, s: &[u8], idx: usize) -> (usize, Int256) {
        let idx = skipspc(s, idx);
        let (idx, x) = if self.exp_mode == ExprMode::Pattern && has_prefix(s, "!!!!", idx) {
            (idx + 4, self.vliw_stop)
        } else if self.exp_mode == ExprMode::Pattern && has_prefix(s, "!!!", idx) {
            (idx + 3, self.vcnt)
        } else if at(s, idx) == b'-' {
            let (idx, t) = self.factor(s, idx + 1);
            (idx, -t)
        } else if at(s, idx) == b'~' {
            let (idx, t) = self.factor(s, idx + 1);
            (idx, !t)
        } else if at(s, idx) == b'@' {
            let (idx, t) = self.factor(s, idx + 1);
            (idx, t.nbit())
        } else if at(s, idx) == b'*' {
            // *(x,n): arithmetic right-shift of x by 8*n
            let mut idx = idx + 1;
            let mut x = Int256::ZERO;
            if at(s, idx) == b'(' {
                let (i2, x1) = self.expression(s, idx + 1);
                idx = i2;
                if at(s, idx) == b',' {
                    let (i3, x2) = self.expression(s, idx + 1);
                    idx = i3;
                    if at(s, idx) == b')' {
                        idx += 1;
                        x = x1.sar((x2 * Int256::from_u64(8)).shift_count());
                    }
                }
            }
            (idx, x)
        } else {
            self.factor1(s, idx)
        };
        (skipspc(s, idx), x)
    }

    fn factor1(&mut self, s: &[u8], idx: usize) -> (usize, Int256) {
        let idx = skipspc(s, idx);
        let c = at(s, idx);

        // character literal with the escape forms \t \n \' \\
        if c == b'\'' {
            if at(s, idx + 1) == b'\\' && at(s, idx + 3) == b'\'' {
                let v = match at(s, idx + 2) {
                    b'n' => Some(0x0a),
                    b't' => Some(0x09),
                    b'\'' => Some(0x27),
                    b'\\' => Some(0x5c),
                    _ => None,
                };
                if let Some(v) = v {
                    return (skipspc(s, idx + 4), Int256::from_u64(v));
                }
            }
            if at(s, idx + 2) == b'\'' {
                return (skipspc(s, idx + 3), Int256::from_u64(at(s, idx + 1) as u64));
            }
        }

        if c == b'(' {
            let (mut idx, x) = self.expression(s, idx + 1);
            if at(s, idx) == b')' {
                idx += 1;
            }
            return (skipspc(s, idx), x);
        }
        if has_prefix(s, "$$", idx) {
            return (skipspc(s, idx + 2), self.pc);
        }
        if c == b'#' {
            let (idx, w) = get_symbol_word(s, idx + 1, &self.swordchars);
            let v = self.sym_val(&w);
            return (skipspc(s, idx), v);
        }
        if has_prefix_ci(s, "0b", idx) {
            let mut idx = idx + 2;
            let mut x = Int256::ZERO;
            while matches!(at(s, idx), b'0' | b'1') {
                x = x.shl(1) | Int256::from_u64((s[idx] - b'0') as u64);
                idx += 1;
            }
            return (skipspc(s, idx), x);
        }
        if has_prefix_ci(s, "0x", idx) {
            let mut idx = idx + 2;
            let mut x = Int256::ZERO;
            while at(s, idx).is_ascii_hexdigit() {
                let c = s[idx].to_ascii_uppercase();
                let d = if c.is_ascii_digit() { c - b'0' } else { c - b'A' + 10 };
                x = x.shl(4) | Int256::from_u64(d as u64);
                idx += 1;
            }
            return (skipspc(s, idx), x);
        }
        if has_prefix_ci(s, "0o", idx) {
            let mut idx = idx + 2;
            let mut x = Int256::ZERO;
            while (b'0'..=b'7').contains(&at(s, idx)) {
                x = x.shl(3) | Int256::from_u64((s[idx] - b'0') as u64);
                idx += 1;
            }
            return (skipspc(s, idx), x);
        }
        if has_prefix(s, "qad", idx) && at(s, skipspc(s, idx + 3)) == b'{' {
            let mut idx = skipspc(s, idx + 3) + 1;
            let (i2, lit) = get_float_str(s, skipspc(s, idx));
            idx = i2;
            if at(s, idx) == b'}' {
                idx += 1;
            }
            let bits = floatexpr::quad_bits(&lit);
            return (skipspc(s, idx), Int256::from_u128(bits));
        }
        if has_prefix(s, "dbl", idx) && at(s, skipspc(s, idx + 3)) == b'{' {
            let (idx, inner) = get_curly(s, idx + 3);
            let x = match inner.as_deref() {
                Some("nan") => Int256::from_u64(0x7ff8000000000000),
                Some("inf") => Int256::from_u64(0x7ff0000000000000),
                Some("-inf") => Int256::from_u64(0xfff0000000000000),
                Some(t) => {
                    let expanded = self.expand_colon_labels(t);
                    Int256::from_u64(floatexpr::double_bits(&expanded))
                }
                None => Int256::ZERO,
            };
            return (skipspc(s, idx), x);
        }
        if has_prefix(s, "flt", idx) && at(s, skipspc(s, idx + 3)) == b'{' {
            let (idx, inner) = get_curly(s, idx + 3);
            let x = match inner.as_deref() {
                Some("nan") => Int256::from_u64(0x7fc00000),
                Some("inf") => Int256::from_u64(0x7f800000),
                Some("-inf") => Int256::from_u64(0xff800000),
                Some(t) => {
                    let expanded = self.expand_colon_labels(t);
                    Int256::from_u64(floatexpr::float_bits(&expanded) as u64)
                }
                None => Int256::ZERO,
            };
            return (skipspc(s, idx), x);
        }
        if c.is_ascii_digit() {
            let (i2, digits) = get_int_str(s, idx);
            let mut x = Int256::ZERO;
            for d in digits.bytes() {
                x = x * Int256::from_u64(10) + Int256::from_u64((d - b'0') as u64);
            }
            return (skipspc(s, i2), x);
        }
        if c == b':'
            && (at(s, idx + 1).is_ascii_alphabetic()
                || at(s, idx + 1) == b'.'
                || at(s, idx + 1) == b'_')
        {
            let (i2, w) = get_label_word(s, idx + 1, &self.lwordchars);
            if i2 != idx + 1 {
                let v = self.label_value(&w);
                return (skipspc(s, i2), v);
            }
            return (skipspc(s, idx + 1), Int256::ZERO);
        }
        if self.exp_mode == ExprMode::Pattern
            && LOWER.as_bytes().contains(&c)
            && !LOWER.as_bytes().contains(&at(s, idx + 1))
        {
            // single lowercase letter: pattern variable, with optional
            // `x:=expr` binding
            if at(s, idx + 1) == b':' && at(s, idx + 2) == b'=' {
                let (idx, x) = self.expression(s, idx + 3);
                self.set_var(c, x);
                return (skipspc(s, idx), x);
            }
            return (skipspc(s, idx + 1), self.var(c));
        }
        if self.lwordchars.as_bytes().contains(&c) || c == b'.' {
            let (i2, w) = get_label_word(s, idx, &self.lwordchars);
            if i2 != idx {
                let v = self.label_value(&w);
                return (skipspc(s, i2), v);
            }
            return (skipspc(s, idx), Int256::ZERO);
        }
        (skipspc(s, idx), Int256::ZERO)
    }

    // ---- tier 3: exponentiation ----

    fn term0_0(&mut self, s: &[u8], idx: usize) -> (usize, Int256) {
        let (mut idx, mut x) = self.factor(s, idx);
        while has_prefix(s, "**", idx) {
            let (i2, t) = self.factor(s, idx + 2);
            idx = i2;
            x = x.pow(t);
        }
        (idx, x)
    }

    // ---- tier 4: multiplicative, with floor division semantics ----

    fn term0(&mut self, s: &[u8], idx: usize) -> (usize, Int256) {
        let (mut idx, mut x) = self.term0_0(s, idx);
        loop {
            if at(s, idx) == b'*' && at(s, idx + 1) != b'*' {
                let (i2, t) = self.term0_0(s, idx + 1);
                idx = i2;
                x = x * t;
            } else if has_prefix(s, "//", idx) {
                let (i2, t) = self.term0_0(s, idx + 2);
                idx = i2;
                if t.is_zero() {
                    eprintln!("Division by 0 error.");
                    x = Int256::ZERO;
                } else {
                    x = x.div_floor(t);
                }
            } else if at(s, idx) == b'%' {
                let (i2, t) = self.term0_0(s, idx + 1);
                idx = i2;
                if t.is_zero() {
                    eprintln!("Division by 0 error.");
                    x = Int256::ZERO;
                } else {
                    x = x.rem_floor(t);
                }
            } else {
                return (idx, x);
            }
        }
    }

    // ---- tier 5: additive ----

    fn term1(&mut self, s: &[u8], idx: usize) -> (usize, Int256) {
        let (mut idx, mut x) = self.term0(s, idx);
        loop {
            match at(s, idx) {
                b'+' => {
                    let (i2, t) = self.term0(s, idx + 1);
                    idx = i2;
                    x = x + t;
                }
                b'-' => {
                    let (i2, t) = self.term0(s, idx + 1);
                    idx = i2;
                    x = x - t;
                }
                _ => return (idx, x),
            }
        }
    }

    // ---- tier 6: shifts; right shift is arithmetic ----

    fn term2(&mut self, s: &[u8], idx: usize) -> (usize, Int256) {
        let (mut idx, mut x) = self.term1(s, idx);
        loop {
            if has_prefix(s, "<<", idx) {
                let (i2, t) = self.term1(s, idx + 2);
                idx = i2;
                x = x.shl(t.shift_count());
            } else if has_prefix(s, ">>", idx) {
                let (i2, t) = self.term1(s, idx + 2);
                idx = i2;
                x = x.sar(t.shift_count());
            } else {
                return (idx, x);
            }
        }
    }

    // ---- tiers 7-9: bitwise and/or/xor ----

    fn term3(&mut self, s: &[u8], idx: usize) -> (usize, Int256) {
        let (mut idx, mut x) = self.term2(s, idx);
        while at(s, idx) == b'&' && at(s, idx + 1) != b'&' {
            let (i2, t) = self.term2(s, idx + 1);
            idx = i2;
            x = x & t;
        }
        (idx, x)
    }

    fn term4(&mut self, s: &[u8], idx: usize) -> (usize, Int256) {
        let (mut idx, mut x) = self.term3(s, idx);
        while at(s, idx) == b'|' && at(s, idx + 1) != b'|' {
            let (i2, t) = self.term3(s, idx + 1);
            idx = i2;
            x = x | t;
        }
        (idx, x)
    }

    fn term5(&mut self, s: &[u8], idx: usize) -> (usize, Int256) {
        let (mut idx, mut x) = self.term4(s, idx);
        while at(s, idx) == b'^' {
            let (i2, t) = self.term4(s, idx + 1);
            idx = i2;
            x = x ^ t;
        }
        (idx, x)
    }

    // ---- tier 10: x'n sign-extension from bit n ----

    fn term6(&mut self, s: &[u8], idx: usize) -> (usize, Int256) {
        let (mut idx, mut x) = self.term5(s, idx);
        while at(s, idx) == b'\'' {
            let (i2, t) = self.term5(s, idx + 1);
            idx = i2;
            if t > Int256::ZERO {
                let n = t.shift_count();
                if n < 256 {
                    let high = Int256::UNDEF.shl(n);
                    x = x & !high;
                    if (x.shr(n - 1) & Int256::ONE) == Int256::ONE {
                        x = x | high;
                    }
                }
            }
        }
        (idx, x)
    }

    // ---- tier 11: comparisons ----

    fn term7(&mut self, s: &[u8], idx: usize) -> (usize, Int256) {
        fn flag(b: bool) -> Int256 {
            if b { Int256::ONE } else { Int256::ZERO }
        }
        let (mut idx, mut x) = self.term6(s, idx);
        loop {
            if has_prefix(s, "<=", idx) {
                let (i2, t) = self.term6(s, idx + 2);
                idx = i2;
                x = flag(x <= t);
            } else if at(s, idx) == b'<' {
                let (i2, t) = self.term6(s, idx + 1);
                idx = i2;
                x = flag(x < t);
            } else if has_prefix(s, ">=", idx) {
                let (i2, t) = self.term6(s, idx + 2);
                idx = i2;
                x = flag(x >= t);
            } else if at(s, idx) == b'>' {
                let (i2, t) = self.term6(s, idx + 1);
                idx = i2;
                x = flag(x > t);
            } else if has_prefix(s, "==", idx) {
                let (i2, t) = self.term6(s, idx + 2);
                idx = i2;
                x = flag(x == t);
            } else if has_prefix(s, "!=", idx) {
                let (i2, t) = self.term6(s, idx + 2);
                idx = i2;
                x = flag(x != t);
            } else {
                return (idx, x);
            }
        }
    }

    // ---- tier 12: logical not/and/or and the ternary ----

    fn term8(&mut self, s: &[u8], idx: usize) -> (usize, Int256) {
        if has_prefix(s, "not(", idx) {
            let (idx, x) = self.expression(s, idx + 3);
            let v = if x.is_zero() { Int256::ONE } else { Int256::ZERO };
            return (idx, v);
        }
        self.term7(s, idx)
    }

    fn term9(&mut self, s: &[u8], idx: usize) -> (usize, Int256) {
        let (mut idx, mut x) = self.term8(s, idx);
        while has_prefix(s, "&&", idx) {
            let (i2, t) = self.term8(s, idx + 2);
            idx = i2;
            x = if !x.is_zero() && !t.is_zero() { Int256::ONE } else { Int256::ZERO };
        }
        (idx, x)
    }

    fn term10(&mut self, s: &[u8], idx: usize) -> (usize, Int256) {
        let (mut idx, mut x) = self.term9(s, idx);
        while has_prefix(s, "||", idx) {
            let (i2, t) = self.term9(s, idx + 2);
            idx = i2;
            x = if !x.is_zero() || !t.is_zero() { Int256::ONE } else { Int256::ZERO };
        }
        (idx, x)
    }

    fn term11(&mut self, s: &[u8], idx: usize) -> (usize, Int256) {
        let (mut idx, mut x) = self.term10(s, idx);
        if at(s, idx) == b'?' {
            let (i2, t) = self.term10(s, idx + 1);
            idx = i2;
            if at(s, idx) == b':' {
                // right-associative: the else arm re-enters this tier
                let (i3, u) = self.term11(s, idx + 1);
                idx = i3;
                x = if x.is_zero() { u } else { t };
            }
        }
        (idx, x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Pass;

    fn asm() -> Asm {
        Asm::new()
    }

    fn eval(asm: &mut Asm, s: &str) -> Int256 {
        asm.eval_pattern(s.as_bytes(), 0).1
    }

    fn i(v: i64) -> Int256 {
        Int256::from_i64(v)
    }

    #[test]
    fn precedence_and_literals() {
        let mut a = asm();
        assert_eq!(eval(&mut a, "1+2*3"), i(7));
        assert_eq!(eval(&mut a, "(1+2)*3"), i(9));
        assert_eq!(eval(&mut a, "0x10|0b1|0o7"), i(0x17));
        assert_eq!(eval(&mut a, "2**10"), i(1024));
        assert_eq!(eval(&mut a, "1<<12"), i(4096));
        assert_eq!(eval(&mut a, "-8>>1"), i(-4));
        assert_eq!(eval(&mut a, "~0"), i(-1));
    }

    #[test]
    fn floor_division_operators() {
        let mut a = asm();
        assert_eq!(eval(&mut a, "(-7)//2"), i(-4));
        assert_eq!(eval(&mut a, "(-7)%2"), i(1));
        assert_eq!(eval(&mut a, "7//2"), i(3));
        assert_eq!(eval(&mut a, "7%-2"), i(-1));
    }

    #[test]
    fn division_by_zero_yields_zero() {
        let mut a = asm();
        assert_eq!(eval(&mut a, "5//0"), i(0));
        assert_eq!(eval(&mut a, "5%0"), i(0));
    }

    #[test]
    fn char_literals() {
        let mut a = asm();
        assert_eq!(eval(&mut a, "'A'"), i(65));
        assert_eq!(eval(&mut a, "'\\n'"), i(0x0a));
        assert_eq!(eval(&mut a, "'\\t'"), i(0x09));
        assert_eq!(eval(&mut a, "'\\''"), i(0x27));
        assert_eq!(eval(&mut a, "'\\\\'"), i(0x5c));
        assert_eq!(eval(&mut a, "'0'+1"), i(49));
    }

    #[test]
    fn sign_extension() {
        let mut a = asm();
        assert_eq!(eval(&mut a, "0xff'8"), i(-1));
        assert_eq!(eval(&mut a, "0x7f'8"), i(0x7f));
        assert_eq!(eval(&mut a, "0x80'8"), i(-128));
    }

    #[test]
    fn comparisons_and_logic() {
        let mut a = asm();
        assert_eq!(eval(&mut a, "1<2"), i(1));
        assert_eq!(eval(&mut a, "2<=1"), i(0));
        assert_eq!(eval(&mut a, "3==3&&4!=5"), i(1));
        assert_eq!(eval(&mut a, "0||0"), i(0));
        assert_eq!(eval(&mut a, "not(0)"), i(1));
        assert_eq!(eval(&mut a, "not(7)"), i(0));
        assert_eq!(eval(&mut a, "-1<0"), i(1));
    }

    #[test]
    fn ternary_is_right_associative() {
        let mut a = asm();
        assert_eq!(eval(&mut a, "1?2:3"), i(2));
        assert_eq!(eval(&mut a, "0?2:3"), i(3));
        assert_eq!(eval(&mut a, "0?1:0?2:3"), i(3));
        assert_eq!(eval(&mut a, "1?1:0?2:3"), i(1));
    }

    #[test]
    fn nbit_and_byte_select() {
        let mut a = asm();
        assert_eq!(eval(&mut a, "@255"), i(8));
        assert_eq!(eval(&mut a, "@-1"), i(1));
        assert_eq!(eval(&mut a, "*(0x1234,1)"), i(0x12));
        assert_eq!(eval(&mut a, "*(0x1234,0)"), i(0x1234));
    }

    #[test]
    fn pattern_variables_and_binding() {
        let mut a = asm();
        a.set_var(b'n', i(5));
        assert_eq!(eval(&mut a, "n+1"), i(6));
        assert_eq!(eval(&mut a, "m:=n*2"), i(10));
        assert_eq!(a.var(b'M'), i(10));
        // assembly mode treats the same text as a label reference
        assert_eq!(a.eval_assembly(b"n", 0).1, Int256::UNDEF);
        assert!(a.undef_label);
    }

    #[test]
    fn symbols_and_pc() {
        let mut a = asm();
        a.set_symbol("width", i(32));
        assert_eq!(eval(&mut a, "#width"), i(32));
        assert_eq!(eval(&mut a, "#missing"), i(0));
        a.pc = i(0x100);
        assert_eq!(eval(&mut a, "$$+2"), i(0x102));
    }

    #[test]
    fn labels_in_assembly_mode() {
        let mut a = asm();
        a.put_label("start", i(0x40), ".text");
        assert_eq!(a.eval_assembly(b"start+1", 0).1, i(0x41));
        assert_eq!(a.eval_assembly(b":start", 0).1, i(0x40));
    }

    #[test]
    fn bundle_counters_in_pattern_mode() {
        let mut a = asm();
        a.vcnt = i(3);
        a.vliw_stop = i(1);
        assert_eq!(eval(&mut a, "!!!"), i(3));
        assert_eq!(eval(&mut a, "!!!!"), i(1));
    }

    #[test]
    fn escape_stopchar_stops_at_depth_zero() {
        let mut a = asm();
        let (end, v) = a.expression_esc(b"3+4,x", 0, b',');
        assert_eq!(v, i(7));
        assert_eq!(end, 3);
        // a comma inside parens does not stop the capture
        let (_, v) = a.expression_esc(b"*(0x1234,1),x", 0, b',');
        assert_eq!(v, i(0x12));
    }

    #[test]
    fn escape_stopchar_respects_brackets() {
        let mut a = asm();
        // a closing bracket as the stop character only counts at depth 0
        let (end, v) = a.expression_esc(b"1+2]rest", 0, b']');
        assert_eq!(v, i(3));
        assert_eq!(end, 3);
    }

    #[test]
    fn colon_label_expansion() {
        let mut a = asm();
        a.put_label("tgt", i(66), ".text");
        assert_eq!(a.expand_colon_labels("jmp :tgt,:tgt"), "jmp 66,66");
        a.begin_pass(Pass::Second);
        assert_eq!(a.expand_colon_labels("x :missing"), "x -1");
    }

    #[test]
    fn float_encoders() {
        let mut a = asm();
        assert_eq!(eval(&mut a, "flt{1.5}"), i(0x3fc00000));
        assert_eq!(eval(&mut a, "flt{inf}"), i(0x7f800000));
        assert_eq!(eval(&mut a, "flt{-inf}"), i(0xff800000));
        assert_eq!(eval(&mut a, "flt{nan}"), i(0x7fc00000));
        assert_eq!(eval(&mut a, "dbl{1.5}"), Int256::from_u64(0x3ff8000000000000));
        assert_eq!(eval(&mut a, "dbl{-2.0}"), Int256::from_u64(0xc000000000000000));
        assert_eq!(
            eval(&mut a, "qad{1.5}"),
            Int256::from_u128(0x3fff_8000_0000_0000_0000_0000_0000_0000)
        );
    }
}
