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

//! Decimal floating-point backend for the `flt{}`, `dbl{}` and `qad{}`
//! encoders.
//!
//! `flt{}`/`dbl{}` run a small f64 expression evaluator that understands
//! the bit-reinterpretation helpers `enfloat(u32)` and `endouble(u64)`;
//! `:label` references are expanded to integers by the caller before the
//! text arrives here. `qad{}` converts a decimal literal to its IEEE-754
//! binary128 pattern with full 112-bit mantissa precision on top of
//! `num-bigint`.

use num_bigint::BigUint;
use num_traits::{One, ToPrimitive, Zero};

/// binary32 bit pattern of a decimal expression.
pub fn float_bits(expr: &str) -> u32 {
    (eval(expr) as f32).to_bits()
}

/// binary64 bit pattern of a decimal expression.
pub fn double_bits(expr: &str) -> u64 {
    eval(expr).to_bits()
}

fn eval(expr: &str) -> f64 {
    let mut p = Parser {
        s: expr.as_bytes(),
        idx: 0,
    };
    p.expr()
}

struct Parser<'a> {
    s: &'a [u8],
    idx: usize,
}

impl Parser<'_> {
    fn peek(&self) -> u8 {
        self.s.get(self.idx).copied().unwrap_or(0)
    }

    fn skip(&mut self) {
        while self.peek() == b' ' {
            self.idx += 1;
        }
    }

    fn eat(&mut self, t: &str) -> bool {
        self.skip();
        if self.s[self.idx.min(self.s.len())..].starts_with(t.as_bytes()) {
            self.idx += t.len();
            true
        } else {
            false
        }
    }

    fn expr(&mut self) -> f64 {
        let mut x = self.term();
        loop {
            if self.eat("+") {
                x += self.term();
            } else if self.eat("-") {
                x -= self.term();
            } else {
                return x;
            }
        }
    }

    fn term(&mut self) -> f64 {
        let mut x = self.power();
        loop {
            self.skip();
            if self.peek() == b'*' && self.s.get(self.idx + 1) != Some(&b'*') {
                self.idx += 1;
                x *= self.power();
            } else if self.eat("/") {
                x /= self.power();
            } else {
                return x;
            }
        }
    }

    fn power(&mut self) -> f64 {
        let x = self.unary();
        if self.eat("**") {
            return x.powf(self.power());
        }
        x
    }

    fn unary(&mut self) -> f64 {
        if self.eat("-") {
            return -self.unary();
        }
        self.primary()
    }

    fn primary(&mut self) -> f64 {
        self.skip();
        if self.eat("(") {
            let x = self.expr();
            self.eat(")");
            return x;
        }
        if self.eat("enfloat(") {
            let a = self.expr();
            self.eat(")");
            return f32::from_bits(a as u32) as f64;
        }
        if self.eat("endouble(") {
            let a = self.expr();
            self.eat(")");
            return f64::from_bits(a as u64);
        }
        if self.eat("inf") {
            return f64::INFINITY;
        }
        if self.eat("nan") {
            return f64::NAN;
        }
        let start = self.idx;
        while self.peek().is_ascii_digit() || self.peek() == b'.' {
            self.idx += 1;
        }
        if matches!(self.peek(), b'e' | b'E') {
            self.idx += 1;
            if matches!(self.peek(), b'+' | b'-') {
                self.idx += 1;
            }
            while self.peek().is_ascii_digit() {
                self.idx += 1;
            }
        }
        std::str::from_utf8(&self.s[start..self.idx])
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(0.0)
    }
}

const QUAD_BIAS: i64 = 16383;
const QUAD_MANT: u64 = 112;

/// binary128 bit pattern of a decimal literal (`inf`, `-inf`, `nan`, or
/// sign/digits/point/exponent). Rounds to nearest, ties to even.
pub fn quad_bits(lit: &str) -> u128 {
    match lit {
        "inf" => return 0x7fff << QUAD_MANT,
        "-inf" => return (1 << 127) | (0x7fff << QUAD_MANT),
        "nan" => return (0x7fff << QUAD_MANT) | (1 << (QUAD_MANT - 1)),
        _ => {}
    }

    let s = lit.as_bytes();
    let mut i = 0;
    let negative = s.first() == Some(&b'-');
    if negative || s.first() == Some(&b'+') {
        i = 1;
    }
    let mut digits = BigUint::zero();
    let mut frac_digits: i64 = 0;
    let mut seen_point = false;
    while i < s.len() {
        match s[i] {
            b'0'..=b'9' => {
                digits = digits * 10u32 + (s[i] - b'0') as u32;
                if seen_point {
                    frac_digits += 1;
                }
            }
            b'.' if !seen_point => seen_point = true,
            _ => break,
        }
        i += 1;
    }
    let mut e10 = -frac_digits;
    if i < s.len() && matches!(s[i], b'e' | b'E') {
        i += 1;
        let exp_neg = s.get(i) == Some(&b'-');
        if exp_neg || s.get(i) == Some(&b'+') {
            i += 1;
        }
        let mut exp: i64 = 0;
        while i < s.len() && s[i].is_ascii_digit() {
            exp = exp * 10 + (s[i] - b'0') as i64;
            i += 1;
        }
        e10 += if exp_neg { -exp } else { exp };
    }

    let sign = if negative { 1u128 << 127 } else { 0 };
    if digits.is_zero() {
        return sign;
    }

    // value = num/den in exact rational form
    let ten = BigUint::from(10u32);
    let (num, den) = if e10 >= 0 {
        (digits * ten.pow(e10 as u32), BigUint::one())
    } else {
        (digits, ten.pow((-e10) as u32))
    };

    // e = floor(log2(num/den))
    let ge = |e: i64| -> bool {
        if e >= 0 {
            num >= (&den << e as u64)
        } else {
            (&num << (-e) as u64) >= den
        }
    };
    let mut e = num.bits() as i64 - den.bits() as i64;
    while ge(e + 1) {
        e += 1;
    }
    while !ge(e) {
        e -= 1;
    }

    // round num/den * 2^(112-e) to a 113-bit significand, ties to even
    let shift = QUAD_MANT as i64 - e;
    let (n, d) = if shift >= 0 {
        (&num << shift as u64, den.clone())
    } else {
        (num.clone(), &den << (-shift) as u64)
    };
    let mut q = &n / &d;
    let r = &n % &d;
    let twice = r << 1u32;
    if twice > d || (twice == d && (&q % 2u32) == BigUint::one()) {
        q += 1u32;
    }
    if q.bits() > QUAD_MANT + 1 {
        q >>= 1u32;
        e += 1;
    }

    let exp_field = e + QUAD_BIAS;
    if exp_field >= 0x7fff {
        return sign | (0x7fff << QUAD_MANT);
    }
    if exp_field <= 0 {
        // subnormals flush to zero
        return sign;
    }
    let frac = (q - (BigUint::one() << QUAD_MANT)).to_u128().unwrap_or(0);
    sign | ((exp_field as u128) << QUAD_MANT) | frac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn f64_expressions() {
        assert_eq!(eval("1.5+2*3"), 7.5);
        assert_eq!(eval("(1+2)/4"), 0.75);
        assert_eq!(eval("2**10"), 1024.0);
        assert_eq!(eval("-2.5e1"), -25.0);
        assert!(eval("nan").is_nan());
        assert_eq!(eval("inf"), f64::INFINITY);
    }

    #[test]
    fn reinterpretation_helpers() {
        assert_eq!(eval("enfloat(1069547520)"), 1.5); // 0x3fc00000
        assert_eq!(eval("endouble(4609434218613702656)"), 1.5); // 0x3ff8...
    }

    #[test]
    fn quad_simple_values() {
        assert_eq!(quad_bits("1.5"), 0x3fff_8000_0000_0000_0000_0000_0000_0000);
        assert_eq!(quad_bits("1"), 0x3fff_0000_0000_0000_0000_0000_0000_0000);
        assert_eq!(quad_bits("2"), 0x4000_0000_0000_0000_0000_0000_0000_0000);
        assert_eq!(quad_bits("-2"), 0xc000_0000_0000_0000_0000_0000_0000_0000);
        assert_eq!(quad_bits("0"), 0);
        assert_eq!(quad_bits("-0.0"), 1 << 127);
    }

    #[test]
    fn quad_full_mantissa_precision() {
        // 0.1 is the classic repeating fraction; the full 112-bit pattern
        // distinguishes a real arbitrary-precision conversion from an f64
        // round-trip
        assert_eq!(quad_bits("0.1"), 0x3ffb_9999_9999_9999_9999_9999_9999_999a);
        assert_eq!(quad_bits("1e3"), quad_bits("1000"));
        assert_eq!(quad_bits("12.5e-1"), quad_bits("1.25"));
    }

    #[test]
    fn quad_specials() {
        assert_eq!(quad_bits("inf"), 0x7fff << 112);
        assert_eq!(quad_bits("-inf"), (1 << 127) | (0x7fff << 112));
        assert_eq!(quad_bits("nan") >> 111, (0x7fff << 1) | 1);
    }
}
