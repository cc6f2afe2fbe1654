//! Record tags.
//!
//! Every account owned by the program starts with an 8-byte tag derived from
//! the account type name. Storage queries return accounts of every kind, so
//! callers classify the leading bytes before decoding anything else.

use std::fmt;

use serde::Serialize;
use sha2::{Digest, Sha256};

pub const TAG_LEN: usize = 8;

/// 8-byte prefix identifying an account type or an instruction.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Discriminator([u8; TAG_LEN]);

impl Discriminator {
    pub const fn new(bytes: [u8; TAG_LEN]) -> Self {
        Self(bytes)
    }

    /// Tag of the account type `name`: `sha256("account:<name>")[..8]`.
    pub fn account(name: &str) -> Self {
        Self::hashed("account", name)
    }

    /// Tag of the instruction `name`: `sha256("global:<name>")[..8]`.
    pub fn instruction(name: &str) -> Self {
        Self::hashed("global", name)
    }

    fn hashed(namespace: &str, name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(namespace.as_bytes());
        hasher.update(b":");
        hasher.update(name.as_bytes());
        let digest = hasher.finalize();
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&digest[..TAG_LEN]);
        Self(tag)
    }

    pub fn as_bytes(&self) -> &[u8; TAG_LEN] {
        &self.0
    }

    /// True when `data` starts with this tag.
    pub fn matches(&self, data: &[u8]) -> bool {
        data.get(..TAG_LEN) == Some(&self.0[..])
    }
}

impl fmt::Debug for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Discriminator({})", hex::encode(self.0))
    }
}

/// Account kinds stored by the program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Ngo,
    Batch,
}

impl RecordKind {
    pub const ALL: [RecordKind; 2] = [RecordKind::Ngo, RecordKind::Batch];

    /// Account type name as declared by the program.
    pub fn type_name(self) -> &'static str {
        match self {
            RecordKind::Ngo => "Ngo",
            RecordKind::Batch => "Batch",
        }
    }

    pub fn tag(self) -> Discriminator {
        match self {
            RecordKind::Ngo => NGO_TAG,
            RecordKind::Batch => BATCH_TAG,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// `sha256("account:Ngo")[..8]`
pub const NGO_TAG: Discriminator = Discriminator::new([196, 139, 181, 149, 140, 80, 247, 106]);
/// `sha256("account:Batch")[..8]`
pub const BATCH_TAG: Discriminator = Discriminator::new([156, 194, 70, 44, 22, 88, 137, 44]);

/// Lookup table from tag to record kind.
#[derive(Clone, Copy, Debug)]
pub struct TagTable<'a> {
    entries: &'a [(Discriminator, RecordKind)],
}

impl TagTable<'static> {
    /// Every record kind the program stores.
    pub const KNOWN: Self = TagTable::new(&[
        (NGO_TAG, RecordKind::Ngo),
        (BATCH_TAG, RecordKind::Batch),
    ]);
}

impl<'a> TagTable<'a> {
    pub const fn new(entries: &'a [(Discriminator, RecordKind)]) -> Self {
        Self { entries }
    }

    /// Classify `data`. Buffers shorter than a tag, or with an unknown tag,
    /// yield `None`.
    pub fn classify(&self, data: &[u8]) -> Option<RecordKind> {
        self.entries
            .iter()
            .find(|(tag, _)| tag.matches(data))
            .map(|(_, kind)| *kind)
    }
}

impl Default for TagTable<'static> {
    fn default() -> Self {
        Self::KNOWN
    }
}

/// Classify `data` against the program's known record kinds.
pub fn classify(data: &[u8]) -> Option<RecordKind> {
    TagTable::KNOWN.classify(data)
}
