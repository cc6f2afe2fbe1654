//! Core primitives for the AidLedger toolchain.
//!
//! The on-chain `aidledger` program stores two kinds of accounts: NGO
//! identities and aid distribution batches. This crate exposes the pieces
//! needed to work with them off-chain:
//!
//! * [`tag`]: 8-byte record tags and classification of raw account bytes.
//! * [`cursor`]: bounds-checked sequential reader/writer over account bytes.
//! * [`record`]: the NGO and batch record layouts.
//! * [`pda`]: program-derived address derivation.
//! * [`instruction`]: encoding of the `register_ngo` / `submit_batch` calls.
//! * [`listing`]: decoding of bulk `getProgramAccounts`-style results.
//! * [`client`]: read-only and signing clients over caller supplied
//!   collaborators (account storage, transaction submission).
//! * [`keypair`]: ed25519 keypairs in the ledger CLI file format.
//!
//! Everything here is synchronous and free of I/O; the network sits behind
//! the traits in [`client`].

pub mod client;
pub mod cursor;
pub mod instruction;
pub mod keypair;
pub mod listing;
pub mod pda;
pub mod pubkey;
pub mod record;
pub mod tag;

mod error;

pub use error::{
    ClientError, DecodeError, DerivationError, InstructionError, KeypairError, PubkeyError,
};
pub use keypair::Keypair;
pub use pubkey::Pubkey;
pub use record::{AccountRecord, BatchRecord, NgoRecord, Trailing};
pub use tag::{Discriminator, RecordKind};

/// Program id of the deployed `aidledger` program on devnet.
pub const DEFAULT_PROGRAM_ID: &str = "4wcEn4cPenW3GM1eYfNoAHsmnN1SPNLnLqSCtBruaobD";
