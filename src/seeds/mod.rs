//! Seed arguments for `derive seeds`.
//!
//! `str:<text>` (or bare text), `hex:<bytes>`, `pk:<base58>`, `u64:<n>`
//! (8 bytes little-endian).

use aidledger_core::Pubkey;
use anyhow::Context;

pub fn parse_seed(arg: &str) -> anyhow::Result<Vec<u8>> {
    let (kind, value) = arg.split_once(':').unwrap_or(("str", arg));
    let bytes = match kind {
        "str" => value.as_bytes().to_vec(),
        "hex" => hex::decode(value.trim()).with_context(|| format!("invalid hex seed {value:?}"))?,
        "pk" => value
            .parse::<Pubkey>()
            .with_context(|| format!("invalid public key seed {value:?}"))?
            .to_bytes()
            .to_vec(),
        "u64" => value
            .parse::<u64>()
            .with_context(|| format!("invalid u64 seed {value:?}"))?
            .to_le_bytes()
            .to_vec(),
        // `ipfs://...` and other text containing a colon.
        _ => arg.as_bytes().to_vec(),
    };
    Ok(bytes)
}
