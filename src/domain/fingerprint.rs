use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::sync::Mutex;

const HEX_DIGITS: &[u8] = b"0123456789abcdef";
const BASE36_DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Number of hex characters in a transaction fingerprint (excluding `0x`).
pub const HASH_HEX_LEN: usize = 64;
/// Length of each of the two base-36 fragments that make up an id.
pub const ID_FRAGMENT_LEN: usize = 9;

/// Produces pseudo-random transaction hashes and record identifiers.
///
/// The output is cosmetic only and must never be used where real
/// unpredictability matters. The random source is pluggable so tests can
/// seed it and assert exact values.
pub struct FingerprintGenerator {
    rng: Mutex<Box<dyn RngCore + Send>>,
}

impl FingerprintGenerator {
    /// Creates a generator seeded from OS entropy.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Creates a deterministic generator.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn with_rng<R: RngCore + Send + 'static>(rng: R) -> Self {
        Self {
            rng: Mutex::new(Box::new(rng)),
        }
    }

    /// Returns `0x` followed by 64 lowercase hex characters.
    pub fn generate_hash(&self) -> String {
        let mut hash = String::with_capacity(HASH_HEX_LEN + 2);
        hash.push_str("0x");
        self.push_digits(&mut hash, HEX_DIGITS, HASH_HEX_LEN);
        hash
    }

    /// Returns a short opaque id assembled from two independent base-36 fragments.
    pub fn generate_id(&self) -> String {
        let mut id = String::with_capacity(ID_FRAGMENT_LEN * 2);
        self.push_digits(&mut id, BASE36_DIGITS, ID_FRAGMENT_LEN);
        self.push_digits(&mut id, BASE36_DIGITS, ID_FRAGMENT_LEN);
        id
    }

    fn push_digits(&self, out: &mut String, alphabet: &[u8], count: usize) {
        // A poisoned lock only means another caller panicked mid-draw; the RNG is still usable.
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        for _ in 0..count {
            let idx = rng.gen_range(0..alphabet.len());
            out.push(alphabet[idx] as char);
        }
    }
}

impl Default for FingerprintGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns true when `value` looks like a fingerprint produced by [`FingerprintGenerator::generate_hash`].
pub fn is_valid_hash(value: &str) -> bool {
    value
        .strip_prefix("0x")
        .map(|hex| {
            hex.len() == HASH_HEX_LEN
                && hex.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_hash_shape() {
        let generator = FingerprintGenerator::new();
        for _ in 0..50 {
            let hash = generator.generate_hash();
            assert!(is_valid_hash(&hash), "bad hash: {hash}");
        }
    }

    #[test]
    fn test_id_shape() {
        let generator = FingerprintGenerator::new();
        let id = generator.generate_id();
        assert_eq!(id.len(), ID_FRAGMENT_LEN * 2);
        assert!(id.bytes().all(|b| BASE36_DIGITS.contains(&b)));
    }

    #[test]
    fn test_seeded_generators_agree() {
        let a = FingerprintGenerator::seeded(7);
        let b = FingerprintGenerator::seeded(7);
        assert_eq!(a.generate_hash(), b.generate_hash());
        assert_eq!(a.generate_id(), b.generate_id());
    }

    #[test]
    fn test_ids_rarely_collide() {
        let generator = FingerprintGenerator::seeded(42);
        let ids: HashSet<String> = (0..1000).map(|_| generator.generate_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_is_valid_hash_rejects_uppercase_and_short() {
        assert!(!is_valid_hash("0xABC"));
        assert!(!is_valid_hash(&format!("0x{}", "A".repeat(64))));
        assert!(!is_valid_hash(&"a".repeat(66)));
        assert!(is_valid_hash(&format!("0x{}", "0f".repeat(32))));
    }
}
