//! Alias derivation.
//!
//! An alias is derived exactly once from a link's sequence number and never
//! regenerated. The mapping is a pure function and injective over the whole
//! `u64` range:
//!
//! - sequences below [`COMPACT_SPACE`] are scrambled by an affine bijection
//!   modulo `62^5` and rendered as exactly [`ALIAS_LEN`] base62 characters,
//!   so consecutive links do not get visibly consecutive aliases;
//! - larger sequences are rendered as plain base62, which is always longer
//!   than [`ALIAS_LEN`] and therefore cannot collide with the compact form.

const ALPHABET: &[u8; 62] = b"0123456789abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of every alias derived from a sequence below [`COMPACT_SPACE`].
pub const ALIAS_LEN: usize = 5;

/// Number of distinct compact aliases (`62^5`).
pub const COMPACT_SPACE: u64 = 62 * 62 * 62 * 62 * 62;

// Coprime to 2 and 31, hence invertible modulo 62^5.
const MULTIPLIER: u64 = 387_420_489;
const OFFSET: u64 = 104_729;

/// Derive the alias for a sequence number.
pub fn derive(sequence: u64) -> String {
    if sequence < COMPACT_SPACE {
        let scrambled = (sequence * MULTIPLIER + OFFSET) % COMPACT_SPACE;
        encode(scrambled, ALIAS_LEN)
    } else {
        encode(sequence, 0)
    }
}

/// Returns `true` if `candidate` could have been produced by [`derive`].
pub fn is_well_formed(candidate: &str) -> bool {
    candidate.len() >= ALIAS_LEN && candidate.bytes().all(|b| ALPHABET.contains(&b))
}

/// Base62-encode `value`, left-padding with the zero digit to `min_width`.
fn encode(mut value: u64, min_width: usize) -> String {
    let mut digits = Vec::with_capacity(min_width.max(11));
    while value > 0 {
        digits.push(ALPHABET[(value % 62) as usize]);
        value /= 62;
    }
    while digits.len() < min_width.max(1) {
        digits.push(ALPHABET[0]);
    }
    digits.iter().rev().map(|&b| b as char).collect()
}
