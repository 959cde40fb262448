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

//! Cursor-style scanning helpers shared by the expression evaluator, the
//! pattern matcher and the drivers. All of them work on `(bytes, index)`
//! pairs and return the advanced index.

pub const CAPITAL: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
pub const DIGIT: &str = "0123456789";

/// Byte at `idx`, or 0 past the end of the slice.
pub fn at(s: &[u8], idx: usize) -> u8 {
    s.get(idx).copied().unwrap_or(0)
}

/// Advance past spaces (tabs were already turned into spaces by the line
/// preprocessing).
pub fn skipspc(s: &[u8], mut idx: usize) -> usize {
    while at(s, idx) == b' ' {
        idx += 1;
    }
    idx
}

/// Case-insensitive prefix test at `idx`.
pub fn has_prefix_ci(s: &[u8], t: &str, idx: usize) -> bool {
    let t = t.as_bytes();
    if idx + t.len() > s.len() {
        return false;
    }
    s[idx..idx + t.len()]
        .iter()
        .zip(t)
        .all(|(a, b)| a.to_ascii_uppercase() == b.to_ascii_uppercase())
}

pub fn has_prefix(s: &[u8], t: &str, idx: usize) -> bool {
    s[idx.min(s.len())..].starts_with(t.as_bytes())
}

fn in_class(class: &str, c: u8) -> bool {
    c != 0 && class.as_bytes().contains(&c)
}

/// `[0-9]+` extractor.
pub fn get_int_str(s: &[u8], idx: usize) -> (usize, String) {
    let start = idx;
    let mut idx = idx;
    while at(s, idx).is_ascii_digit() {
        idx += 1;
    }
    (idx, String::from_utf8_lossy(&s[start..idx]).into_owned())
}

/// Decimal float extractor: `inf`, `-inf`, `nan`, or a run of digits,
/// `-`, `.`, `e`, `E`.
pub fn get_float_str(s: &[u8], idx: usize) -> (usize, String) {
    for special in ["-inf", "inf", "nan"] {
        if has_prefix(s, special, idx) {
            return (idx + special.len(), special.to_string());
        }
    }
    let start = idx;
    let mut idx = idx;
    loop {
        let c = at(s, idx);
        if c.is_ascii_digit() || matches!(c, b'-' | b'.' | b'e' | b'E' | b'+') {
            idx += 1;
        } else {
            break;
        }
    }
    (idx, String::from_utf8_lossy(&s[start..idx]).into_owned())
}

/// Curly-delimited argument reader: `{ ... }`. Returns `None` when no
/// opening brace is present; the inner text is whitespace-trimmed.
pub fn get_curly(s: &[u8], idx: usize) -> (usize, Option<String>) {
    let mut idx = skipspc(s, idx);
    if at(s, idx) != b'{' {
        return (idx, None);
    }
    idx += 1;
    let start = idx;
    while at(s, idx) != b'}' && at(s, idx) != 0 {
        idx += 1;
    }
    let inner = String::from_utf8_lossy(&s[start..idx]).trim().to_string();
    if at(s, idx) == b'}' {
        idx += 1;
    }
    (idx, Some(inner))
}

/// Symbol word over `Swordchars`: leading non-digit class character, then
/// class characters. The result is uppercased, matching the symbol store.
pub fn get_symbol_word(s: &[u8], idx: usize, swordchars: &str) -> (usize, String) {
    let start = idx;
    let mut idx = idx;
    let c = at(s, idx);
    if in_class(swordchars, c) && !c.is_ascii_digit() {
        idx += 1;
        while in_class(swordchars, at(s, idx)) {
            idx += 1;
        }
    }
    let w = String::from_utf8_lossy(&s[start..idx]).to_uppercase();
    (idx, w)
}

/// Label word over `Lwordchars`: a leading `.` or a non-digit class
/// character, then class characters. A trailing `:` is consumed but not
/// part of the name, except when it starts `:=`.
pub fn get_label_word(s: &[u8], idx: usize, lwordchars: &str) -> (usize, String) {
    let start = idx;
    let mut idx = idx;
    let c = at(s, idx);
    if c == b'.' || (in_class(lwordchars, c) && !c.is_ascii_digit()) {
        idx += 1;
        while in_class(lwordchars, at(s, idx)) {
            idx += 1;
        }
        if at(s, idx) == b':' && at(s, idx + 1) != b'=' {
            idx += 1;
        }
    }
    let mut end = idx;
    if end > start && s[end - 1] == b':' {
        end -= 1;
    }
    (idx, String::from_utf8_lossy(&s[start..end]).into_owned())
}

/// Whitespace-delimited token after leading spaces.
pub fn param_to_space(s: &[u8], idx: usize) -> (usize, String) {
    let mut idx = skipspc(s, idx);
    let start = idx;
    while idx < s.len() && s[idx] != b' ' {
        idx += 1;
    }
    (idx, String::from_utf8_lossy(&s[start..idx]).into_owned())
}

/// Everything up to the next `!!` sub-instruction separator (or the end
/// of the line).
pub fn param_to_subinst(s: &[u8], idx: usize) -> (usize, String) {
    let mut idx = skipspc(s, idx);
    let start = idx;
    while idx < s.len() && !(s[idx] == b'!' && at(s, idx + 1) == b'!') {
        idx += 1;
    }
    (idx, String::from_utf8_lossy(&s[start..idx]).into_owned())
}

/// One `::`-separated pattern-record field, right-trimmed. The returned
/// index sits after the separator.
pub fn next_field(s: &[u8], idx: usize) -> (usize, String) {
    let mut idx = skipspc(s, idx);
    if idx >= s.len() {
        return (idx, String::new());
    }
    let start = idx;
    let mut end;
    loop {
        if idx + 2 <= s.len() && s[idx] == b':' && s[idx + 1] == b':' {
            end = idx;
            idx += 2;
            break;
        }
        idx += 1;
        if idx >= s.len() {
            end = idx;
            break;
        }
    }
    let field = String::from_utf8_lossy(&s[start..end]).trim_end().to_string();
    (idx, field)
}

/// Quoted-string content: `"..."` with no escape handling; stops at the
/// first closing quote.
pub fn get_string(s: &[u8]) -> String {
    let mut idx = skipspc(s, 0);
    if at(s, idx) != b'"' {
        return String::new();
    }
    idx += 1;
    let start = idx;
    while idx < s.len() && s[idx] != b'"' {
        idx += 1;
    }
    String::from_utf8_lossy(&s[start..idx]).into_owned()
}

/// Collapse runs of spaces to single spaces and trim the ends.
pub fn collapse_spaces(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_space = false;
    for c in s.chars() {
        if c == ' ' {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(c);
            last_space = false;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LW: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_.";
    const SW: &str = "0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ_%$-~&|";

    #[test]
    fn label_word_consumes_colon_but_not_assignment() {
        let (idx, w) = get_label_word(b"loop: nop", 0, LW);
        assert_eq!(w, "loop");
        assert_eq!(idx, 5);
        let (idx, w) = get_label_word(b"a:=1", 0, LW);
        assert_eq!(w, "a");
        assert_eq!(idx, 1);
        let (_, w) = get_label_word(b".start", 0, LW);
        assert_eq!(w, ".start");
        let (idx, w) = get_label_word(b"9bad", 0, LW);
        assert_eq!(w, "");
        assert_eq!(idx, 0);
    }

    #[test]
    fn symbol_word_is_uppercased() {
        let (idx, w) = get_symbol_word(b"r1,x", 0, SW);
        assert_eq!(w, "R1");
        assert_eq!(idx, 2);
        let (_, w) = get_symbol_word(b"%psw", 0, SW);
        assert_eq!(w, "%PSW");
    }

    #[test]
    fn float_extractor_handles_specials() {
        assert_eq!(get_float_str(b"inf}", 0).1, "inf");
        assert_eq!(get_float_str(b"-inf", 0).1, "-inf");
        assert_eq!(get_float_str(b"nan", 0).1, "nan");
        assert_eq!(get_float_str(b"1.5e-3}", 0).1, "1.5e-3");
    }

    #[test]
    fn field_splitting() {
        let line = b"NOP :: :: 0x90";
        let (idx, f0) = next_field(line, 0);
        assert_eq!(f0, "NOP");
        let (idx, f1) = next_field(line, idx);
        assert_eq!(f1, "");
        let (_, f2) = next_field(line, idx);
        assert_eq!(f2, "0x90");
    }

    #[test]
    fn subinst_splitting() {
        let (idx, first) = param_to_subinst(b"add r1 !! sub r2", 0);
        assert_eq!(first, "add r1 ");
        assert_eq!(&b"add r1 !! sub r2"[idx..idx + 2], b"!!");
    }

    #[test]
    fn curly_reader() {
        let (idx, inner) = get_curly(b"{ 1.5 } rest", 0);
        assert_eq!(inner.as_deref(), Some("1.5"));
        assert_eq!(at(b"{ 1.5 } rest", idx), b' ');
        let (_, none) = get_curly(b"nope", 0);
        assert!(none.is_none());
    }
}
