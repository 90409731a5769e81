//! Short id generation: base62 over the repository sequence.

use crate::{ShortId, ShortIdGenerator};

const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Encode an unsigned 64-bit integer as base62 (0-9, A-Z, a-z). Zero is "0".
pub fn encode_base62(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    // 62^11 > 2^64, so 11 digits always suffice
    let mut digits = Vec::with_capacity(11);
    while n > 0 {
        digits.push(ALPHABET[(n % 62) as usize] as char);
        n /= 62;
    }
    digits.iter().rev().collect()
}

/// Base62 short id generator, deterministic w.r.t. the sequence number and
/// left-padded with '0' up to `min_width`.
#[derive(Clone, Copy, Debug)]
pub struct Base62ShortIdGenerator {
    min_width: usize,
}

impl Base62ShortIdGenerator {
    pub fn new(min_width: usize) -> Self {
        Self { min_width }
    }
}

impl ShortIdGenerator for Base62ShortIdGenerator {
    fn next_short_id(&self, seq: u64) -> ShortId {
        let encoded = encode_base62(seq);
        let padded = format!("{:0>width$}", encoded, width = self.min_width);
        // Alphanumeric by construction.
        ShortId(padded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_known_vectors() {
        assert_eq!(encode_base62(0), "0");
        assert_eq!(encode_base62(61), "z");
        assert_eq!(encode_base62(62), "10");
        assert_eq!(encode_base62(3843), "zz");
        assert_eq!(encode_base62(u64::MAX).len(), 11);
    }

    #[test]
    fn pads_to_min_width() {
        let g = Base62ShortIdGenerator::new(6);
        assert_eq!(g.next_short_id(0).as_str(), "000000");
        assert_eq!(g.next_short_id(62).as_str(), "000010");
        let narrow = Base62ShortIdGenerator::new(2);
        assert_eq!(narrow.next_short_id(3843 * 62).as_str(), "zz0");
    }
}
