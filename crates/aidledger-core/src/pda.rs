//! Program-derived addresses.
//!
//! An address is `sha256(seeds.. || program_id || "ProgramDerivedAddress")`
//! and is only valid when it does not decode to an ed25519 point, so no
//! private key can exist for it. [`find_program_address`] appends a nonce
//! seed and walks it down from 255 until a valid address comes out.

use ed25519_dalek::VerifyingKey;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::DerivationError;
use crate::pubkey::Pubkey;

pub const MAX_SEED_LEN: usize = 32;
/// Seed count limit, nonce included.
pub const MAX_SEEDS: usize = 16;

const PDA_MARKER: &[u8] = b"ProgramDerivedAddress";

pub const NGO_SEED: &[u8] = b"ngo";
pub const BATCH_SEED: &[u8] = b"batch";

/// True when `bytes` is the compressed form of a point on the curve.
pub fn is_on_curve(bytes: &[u8; 32]) -> bool {
    VerifyingKey::from_bytes(bytes).is_ok()
}

pub fn create_program_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<Pubkey, DerivationError> {
    if seeds.len() > MAX_SEEDS {
        return Err(DerivationError::TooManySeeds {
            count: seeds.len(),
            max: MAX_SEEDS,
        });
    }
    let mut hasher = Sha256::new();
    for (index, seed) in seeds.iter().enumerate() {
        if seed.len() > MAX_SEED_LEN {
            return Err(DerivationError::MaxSeedLengthExceeded {
                index,
                len: seed.len(),
                max: MAX_SEED_LEN,
            });
        }
        hasher.update(seed);
    }
    hasher.update(program_id.as_bytes());
    hasher.update(PDA_MARKER);
    let hash: [u8; 32] = hasher.finalize().into();

    if is_on_curve(&hash) {
        return Err(DerivationError::InvalidSeeds);
    }
    Ok(Pubkey::new_from_array(hash))
}

/// Find the first off-curve address for `seeds`, returning it with the nonce
/// ("bump") that produced it.
pub fn find_program_address(
    seeds: &[&[u8]],
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), DerivationError> {
    // Room for the nonce seed.
    if seeds.len() >= MAX_SEEDS {
        return Err(DerivationError::TooManySeeds {
            count: seeds.len() + 1,
            max: MAX_SEEDS,
        });
    }
    for bump in (1..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump = seeds.to_vec();
        with_bump.push(&bump_seed);
        match create_program_address(&with_bump, program_id) {
            Ok(address) => {
                debug!(%address, bump, %program_id, "derived program address");
                return Ok((address, bump));
            }
            Err(DerivationError::InvalidSeeds) => continue,
            Err(err) => return Err(err),
        }
    }
    Err(DerivationError::DerivationExhausted)
}

/// NGO account of `admin`: seeds `["ngo", admin]`.
pub fn ngo_address(admin: &Pubkey, program_id: &Pubkey) -> Result<(Pubkey, u8), DerivationError> {
    find_program_address(&[NGO_SEED, admin.as_ref()], program_id)
}

/// Batch `index` of the NGO account `ngo`: seeds `["batch", ngo, index_le]`.
pub fn batch_address(
    ngo: &Pubkey,
    index: u64,
    program_id: &Pubkey,
) -> Result<(Pubkey, u8), DerivationError> {
    let index_seed = index.to_le_bytes();
    find_program_address(&[BATCH_SEED, ngo.as_ref(), &index_seed], program_id)
}
