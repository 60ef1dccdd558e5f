//! Deterministic derivation
//!
//! Pure, one-way functions of `(original value, seed)`. Nothing here keeps state,
//! so two fields holding the same original identifier map to the same output in
//! any run, on any worker, without a lookup table.

use crate::domain::{DerivationError, Seed, UidRoot};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;

/// Maximum magnitude of a derived time offset (about 100 years)
pub const MAX_OFFSET_SECONDS: i64 = 1_576_800_000;

/// Maximum total length of a unique identifier
pub const UID_MAX_LENGTH: usize = 64;

static UID_REGEX: OnceLock<Regex> = OnceLock::new();

/// SHA-256 over `salt || text`, as lowercase hex
pub fn hash_value(text: &str, salt: &Seed) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.expose().as_bytes());
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Derives a unique identifier under the default `2.25` root
pub fn derive_identifier(original: &str, seed: &Seed) -> Result<String, DerivationError> {
    derive_identifier_with_root(&UidRoot::default(), original, seed)
}

/// Derives a unique identifier under `root`
///
/// The first 128 bits of `SHA-256(len(seed) || seed || original)`, read as a
/// big-endian integer, are rendered as the decimal suffix of `root`. The
/// result never equals `original`: on that (astronomically unlikely)
/// collision the digest is re-derived with a counter.
pub fn derive_identifier_with_root(
    root: &UidRoot,
    original: &str,
    seed: &Seed,
) -> Result<String, DerivationError> {
    let mut round: u32 = 0;
    loop {
        let mut hasher = Sha256::new();
        hasher.update((seed.expose().len() as u64).to_be_bytes());
        hasher.update(seed.expose().as_bytes());
        hasher.update(original.as_bytes());
        if round > 0 {
            hasher.update(round.to_be_bytes());
        }
        let digest = hasher.finalize();

        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&digest[..16]);
        let suffix = u128::from_be_bytes(bytes).to_string();

        let budget = UID_MAX_LENGTH.saturating_sub(root.as_str().len() + 1);
        let suffix = &suffix[..suffix.len().min(budget)];
        let derived = format!("{}.{}", root.as_str(), suffix);

        if !is_valid_uid(&derived) {
            return Err(DerivationError::IdentifierGrammar(derived));
        }
        if derived != original.trim() {
            return Ok(derived);
        }
        round += 1;
    }
}

/// Deterministic signed offset within ±[`MAX_OFFSET_SECONDS`]
///
/// `StdRng` is seeded with the SHA-256 digest of `seed_material`, so the same
/// material always draws the same offset for a given build.
pub fn derive_offset_seconds(seed_material: &str) -> i64 {
    let mut seed = [0u8; 32];
    seed.copy_from_slice(&Sha256::digest(seed_material.as_bytes()));
    let mut rng = StdRng::from_seed(seed);
    rng.gen_range(-MAX_OFFSET_SECONDS..=MAX_OFFSET_SECONDS)
}

/// Identifier grammar: dot-separated numeric components without leading zeros,
/// at most 64 characters
pub fn is_valid_uid(uid: &str) -> bool {
    let regex = UID_REGEX.get_or_init(|| {
        Regex::new(r"^(0|[1-9][0-9]*)(\.(0|[1-9][0-9]*))*$").expect("static regex is valid")
    });
    !uid.is_empty() && uid.len() <= UID_MAX_LENGTH && regex.is_match(uid)
}

/// Load-time check that derivation under `root` produces well-formed identifiers
pub fn self_check(root: &UidRoot) -> Result<(), DerivationError> {
    let check_seed = Seed::new("deident-self-check");
    for sample in ["", "1.2.840.10008.1.1", "0"] {
        derive_identifier_with_root(root, sample, &check_seed)?;
    }
    Ok(())
}
