//! Decoding of bulk account queries.
//!
//! A program account query returns every account the program owns. Accounts
//! of other kinds are dropped; accounts of the requested kind that fail to
//! decode are kept as error entries so a caller can tell them apart from
//! records that do not exist.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use tracing::warn;

use crate::error::DecodeError;
use crate::pubkey::{Pubkey, PUBKEY_LEN};
use crate::record::{AccountRecord, BatchRecord, NgoRecord, Trailing};

/// `{address, data}` pair as returned by the storage query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawAccount {
    pub address: Pubkey,
    pub data: Vec<u8>,
}

impl RawAccount {
    pub fn new(address: Pubkey, data: Vec<u8>) -> Self {
        Self { address, data }
    }
}

/// One entry of a listing. Serializes as `{"pubkey", "account"}` or
/// `{"pubkey", "error"}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Listed<T> {
    pub address: Pubkey,
    pub outcome: Result<T, DecodeError>,
}

impl<T: Serialize> Serialize for Listed<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("pubkey", &self.address)?;
        match &self.outcome {
            Ok(record) => map.serialize_entry("account", record)?,
            Err(err) => map.serialize_entry("error", &err.to_string())?,
        }
        map.end()
    }
}

impl<T> Listed<T> {
    pub fn record(&self) -> Option<&T> {
        self.outcome.as_ref().ok()
    }

    pub fn error(&self) -> Option<&DecodeError> {
        self.outcome.as_ref().err()
    }
}

/// Decoded entries of one record kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Listing<T> {
    entries: Vec<Listed<T>>,
}

impl<T> Listing<T> {
    pub fn entries(&self) -> &[Listed<T>] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<Listed<T>> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Successfully decoded records with their addresses.
    pub fn records(&self) -> impl Iterator<Item = (&Pubkey, &T)> {
        self.entries
            .iter()
            .filter_map(|e| e.record().map(|r| (&e.address, r)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&Pubkey, &DecodeError)> {
        self.entries
            .iter()
            .filter_map(|e| e.error().map(|err| (&e.address, err)))
    }
}

/// Decode every account tagged as `T`, skipping other kinds.
pub fn list_records<T: AccountRecord>(accounts: &[RawAccount], trailing: Trailing) -> Listing<T> {
    let entries = accounts
        .iter()
        .filter(|acc| T::KIND.tag().matches(&acc.data))
        .map(|acc| {
            let outcome = T::decode_with(&acc.data, trailing);
            if let Err(err) = &outcome {
                warn!(address = %acc.address, kind = %T::KIND, %err, "failed to decode account");
            }
            Listed {
                address: acc.address,
                outcome,
            }
        })
        .collect();
    Listing { entries }
}

pub fn list_ngos(accounts: &[RawAccount], trailing: Trailing) -> Listing<NgoRecord> {
    list_records(accounts, trailing)
}

/// Batches whose `ngo` field is `ngo`, ordered by batch index. Entries that
/// failed to decode come last, in query order.
pub fn list_batches_for_ngo(
    ngo: &Pubkey,
    accounts: &[RawAccount],
    trailing: Trailing,
) -> Listing<BatchRecord> {
    let owned: Vec<RawAccount> = accounts
        .iter()
        .filter(|acc| batch_owner(&acc.data) == Some(&ngo.as_bytes()[..]))
        .cloned()
        .collect();

    let mut listing = list_records::<BatchRecord>(&owned, trailing);
    listing
        .entries
        .sort_by_key(|e| e.record().map_or((1, 0), |b| (0, b.batch_index)));

    for (address, batch) in listing.records() {
        if batch.has_inverted_window() {
            warn!(
                %address,
                start_time = batch.start_time,
                end_time = batch.end_time,
                "batch window ends before it starts"
            );
        }
    }
    listing
}

/// The 32 bytes at the batch `ngo` offset, if the account is long enough.
fn batch_owner(data: &[u8]) -> Option<&[u8]> {
    data.get(BatchRecord::NGO_OFFSET..BatchRecord::NGO_OFFSET + PUBKEY_LEN)
}
