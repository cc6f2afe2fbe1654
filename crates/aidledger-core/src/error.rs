use thiserror::Error;

/// Failure to turn raw account bytes into a record.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The leading tag does not belong to the requested record kind.
    #[error("unknown record kind")]
    UnknownRecordKind,

    /// Not enough bytes left to read `field`.
    #[error("truncated record: {field} needs {needed} bytes, {remaining} remaining")]
    TruncatedRecord {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// A length-prefixed string is not valid UTF-8.
    #[error("invalid utf-8 in {field}")]
    InvalidStringEncoding { field: &'static str },

    /// Bytes left over after the last field.
    #[error("{count} unexpected trailing bytes")]
    TrailingBytes { count: usize },
}

/// Program-derived address failures.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DerivationError {
    #[error("seed {index} is {len} bytes, limit is {max}")]
    MaxSeedLengthExceeded { index: usize, len: usize, max: usize },

    #[error("{count} seeds given, limit is {max}")]
    TooManySeeds { count: usize, max: usize },

    /// The derived point lies on the ed25519 curve.
    #[error("provided seeds do not result in a valid address")]
    InvalidSeeds,

    /// No nonce in 255..=1 produced an off-curve address.
    #[error("unable to find a viable program address nonce")]
    DerivationExhausted,
}

/// Instruction arguments the program would reject, or an underivable account.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InstructionError {
    #[error("metadata uri must not be empty")]
    EmptyMetadataUri,

    #[error(transparent)]
    Derivation(#[from] DerivationError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PubkeyError {
    #[error("invalid base58: {0}")]
    Base58(String),

    #[error("public key must be 32 bytes, got {0}")]
    Length(usize),
}

#[derive(Debug, Error)]
pub enum KeypairError {
    #[error("keypair file is not a JSON byte array: {0}")]
    Format(#[from] serde_json::Error),

    #[error("keypair must be 64 bytes, got {0}")]
    Length(usize),

    #[error("public half does not match secret key")]
    Mismatch,
}

/// Errors surfaced by [`crate::client`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The account storage collaborator failed.
    #[error("account source: {0}")]
    Source(String),

    /// The transaction collaborator failed.
    #[error("transaction sender: {0}")]
    Sender(String),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Derivation(#[from] DerivationError),

    #[error(transparent)]
    Instruction(#[from] InstructionError),
}
