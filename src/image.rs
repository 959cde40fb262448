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

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::collections::HashMap;

/// Byte order of each emitted word, set by the pattern-file `.bits`
/// directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
    Little,
    Big,
}

/// Sparse output image: word position -> word value. The highest written
/// position fixes the size of the final dump; everything unwritten reads
/// as zero.
#[derive(Default)]
pub struct Image {
    words: HashMap<u64, u64>,
}

/// Bytes occupied by one word of `bts` bits (minimum one).
pub fn bytes_per_word(bts: i64) -> usize {
    let b = bts.max(8);
    ((b + 7) / 8) as usize
}

fn word_mask(bts: i64) -> u64 {
    if bts >= 64 { u64::MAX } else { (1u64 << bts) - 1 }
}

/// Serialize one word into its output byte order.
pub fn word_bytes(value: u64, bts: i64, endian: Endianness) -> Vec<u8> {
    let n = bytes_per_word(bts);
    let mut buf = vec![0u8; n];
    match endian {
        Endianness::Little => LittleEndian::write_uint(&mut buf, value & word_mask(bts), n),
        Endianness::Big => BigEndian::write_uint(&mut buf, value & word_mask(bts), n),
    }
    buf
}

impl Image {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&mut self, position: u64, value: u64) {
        self.words.insert(position, value);
    }

    pub fn clear(&mut self) {
        self.words.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Flatten to the final byte image.
    pub fn dump(&self, bts: i64, endian: Endianness) -> Vec<u8> {
        let Some(max) = self.words.keys().copied().max() else {
            return Vec::new();
        };
        let n = bytes_per_word(bts);
        let mut out = Vec::with_capacity((max as usize + 1) * n);
        for pos in 0..=max {
            let v = self.words.get(&pos).copied().unwrap_or(0);
            out.extend_from_slice(&word_bytes(v, bts, endian));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwritten_positions_are_zero() {
        let mut img = Image::new();
        img.store(0, 0x90);
        img.store(3, 0xAB);
        assert_eq!(img.dump(8, Endianness::Little), vec![0x90, 0, 0, 0xAB]);
    }

    #[test]
    fn wide_words_follow_endianness() {
        let mut img = Image::new();
        img.store(0, 0x1234);
        assert_eq!(img.dump(16, Endianness::Little), vec![0x34, 0x12]);
        assert_eq!(img.dump(16, Endianness::Big), vec![0x12, 0x34]);
    }

    #[test]
    fn words_are_masked_to_bts() {
        let mut img = Image::new();
        img.store(0, 0x1ff);
        assert_eq!(img.dump(8, Endianness::Little), vec![0xff]);
        // 12-bit words still occupy two bytes
        assert_eq!(img.dump(12, Endianness::Big), vec![0x01, 0xff]);
    }

    #[test]
    fn empty_image_dumps_nothing() {
        assert!(Image::new().dump(8, Endianness::Little).is_empty());
    }
}
