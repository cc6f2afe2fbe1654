//! Offline account source backed by a saved `getProgramAccounts` response.
//!
//! Accepted shapes: the bare result array, or the full JSON-RPC envelope
//! `{"jsonrpc": .., "result": [..]}`. Each entry looks like
//! `{"pubkey": "<base58>", "account": {"data": ["<base64>", "base64"], "owner": ..}}`.

use std::{collections::BTreeMap, fs, path::Path};

use aidledger_core::{client::AccountSource, listing::RawAccount, Pubkey};
use anyhow::{bail, Context};
use base64::{engine::general_purpose, Engine as _};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Deserialize)]
#[serde(untagged)]
enum DumpFile {
    Envelope { result: Vec<KeyedAccount> },
    Bare(Vec<KeyedAccount>),
}

#[derive(Deserialize)]
struct KeyedAccount {
    pubkey: Pubkey,
    account: AccountBody,
}

#[derive(Deserialize)]
struct AccountBody {
    data: (String, String),
    #[serde(default)]
    owner: Option<Pubkey>,
}

struct DumpEntry {
    owner: Option<Pubkey>,
    data: Vec<u8>,
}

/// Accounts loaded from a dump file, keyed by address.
pub struct DumpSource {
    accounts: BTreeMap<Pubkey, DumpEntry>,
}

impl DumpSource {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        Self::from_json(&bytes).with_context(|| format!("parse {}", path.display()))
    }

    pub fn from_json(bytes: &[u8]) -> anyhow::Result<Self> {
        let entries = match serde_json::from_slice::<DumpFile>(bytes)? {
            DumpFile::Envelope { result } => result,
            DumpFile::Bare(list) => list,
        };
        let mut accounts = BTreeMap::new();
        for entry in entries {
            let (payload, encoding) = entry.account.data;
            if encoding != "base64" {
                bail!("account {}: unsupported data encoding {encoding:?}", entry.pubkey);
            }
            let data = general_purpose::STANDARD
                .decode(payload.as_bytes())
                .with_context(|| format!("account {}: invalid base64", entry.pubkey))?;
            accounts.insert(
                entry.pubkey,
                DumpEntry {
                    owner: entry.account.owner,
                    data,
                },
            );
        }
        debug!(accounts = accounts.len(), "loaded account dump");
        Ok(Self { accounts })
    }
}

impl AccountSource for DumpSource {
    type Error = std::convert::Infallible;

    fn program_accounts(&self, program_id: &Pubkey) -> Result<Vec<RawAccount>, Self::Error> {
        let mut out = Vec::with_capacity(self.accounts.len());
        for (address, entry) in &self.accounts {
            match entry.owner {
                Some(owner) if owner != *program_id => {
                    warn!(%address, %owner, "skipping account owned by another program");
                }
                _ => out.push(RawAccount::new(*address, entry.data.clone())),
            }
        }
        Ok(out)
    }

    fn account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.accounts.get(address).map(|e| e.data.clone()))
    }
}
