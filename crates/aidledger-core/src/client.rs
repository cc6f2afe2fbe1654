//! Read-only and signing clients.
//!
//! The caller picks the capability explicitly: [`ReadClient`] only queries,
//! [`SigningClient`] owns a [`Keypair`] and can also submit instructions.
//! Storage queries and transaction submission are delegated to the
//! [`AccountSource`] and [`TransactionSender`] collaborators.

use std::ops::Deref;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::ClientError;
use crate::instruction::{self, Instruction, SubmitBatchArgs};
use crate::keypair::Keypair;
use crate::listing::{list_batches_for_ngo, list_ngos, Listing, RawAccount};
use crate::pda::{batch_address, ngo_address};
use crate::pubkey::Pubkey;
use crate::record::{AccountRecord, BatchRecord, NgoRecord, Trailing};

/// Storage query collaborator.
pub trait AccountSource {
    type Error: std::fmt::Display;

    /// Every account owned by `program_id`, regardless of kind.
    fn program_accounts(&self, program_id: &Pubkey) -> Result<Vec<RawAccount>, Self::Error>;

    /// Data of one account, `None` if it does not exist.
    fn account(&self, address: &Pubkey) -> Result<Option<Vec<u8>>, Self::Error>;
}

/// Transaction submission collaborator. Returns the transaction signature.
pub trait TransactionSender {
    type Error: std::fmt::Display;

    fn send(&self, instructions: &[Instruction], signer: &Keypair) -> Result<String, Self::Error>;
}

fn source_err<E: std::fmt::Display>(err: E) -> ClientError {
    ClientError::Source(err.to_string())
}

/// Query-only access to the program's accounts.
#[derive(Debug)]
pub struct ReadClient<S> {
    source: S,
    program_id: Pubkey,
    trailing: Trailing,
}

impl<S: AccountSource> ReadClient<S> {
    pub fn new(source: S, program_id: Pubkey) -> Self {
        Self {
            source,
            program_id,
            trailing: Trailing::Reject,
        }
    }

    /// Accept zero-padded account data.
    pub fn with_trailing(mut self, trailing: Trailing) -> Self {
        self.trailing = trailing;
        self
    }

    pub fn program_id(&self) -> &Pubkey {
        &self.program_id
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn list_ngos(&self) -> Result<Listing<NgoRecord>, ClientError> {
        let accounts = self
            .source
            .program_accounts(&self.program_id)
            .map_err(source_err)?;
        let listing = list_ngos(&accounts, self.trailing);
        debug!(total = accounts.len(), ngos = listing.len(), "listed ngo accounts");
        Ok(listing)
    }

    pub fn list_batches_for_ngo(&self, ngo: &Pubkey) -> Result<Listing<BatchRecord>, ClientError> {
        let accounts = self
            .source
            .program_accounts(&self.program_id)
            .map_err(source_err)?;
        Ok(list_batches_for_ngo(ngo, &accounts, self.trailing))
    }

    /// NGO account of `admin`, with its address. `Ok(None)` when absent.
    pub fn fetch_ngo(&self, admin: &Pubkey) -> Result<Option<(Pubkey, NgoRecord)>, ClientError> {
        let (address, _) = ngo_address(admin, &self.program_id)?;
        self.fetch(&address)
    }

    /// Batch `index` of the NGO account `ngo`. `Ok(None)` when absent.
    pub fn fetch_batch(
        &self,
        ngo: &Pubkey,
        index: u64,
    ) -> Result<Option<(Pubkey, BatchRecord)>, ClientError> {
        let (address, _) = batch_address(ngo, index, &self.program_id)?;
        self.fetch(&address)
    }

    fn fetch<T: AccountRecord>(&self, address: &Pubkey) -> Result<Option<(Pubkey, T)>, ClientError> {
        match self.source.account(address).map_err(source_err)? {
            Some(data) => Ok(Some((*address, T::decode_with(&data, self.trailing)?))),
            None => Ok(None),
        }
    }
}

/// Result of [`SigningClient::register_ngo`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Registration {
    Submitted { signature: String, ngo: Pubkey },
    /// The NGO account already exists; nothing was sent.
    AlreadyRegistered { ngo: Pubkey },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BatchSubmission {
    pub signature: String,
    pub ngo: Pubkey,
    pub batch: Pubkey,
}

/// Query and submission access, acting as the keypair's owner.
#[derive(Debug)]
pub struct SigningClient<S, T> {
    reader: ReadClient<S>,
    sender: T,
    payer: Keypair,
}

impl<S: AccountSource, T: TransactionSender> SigningClient<S, T> {
    pub fn new(reader: ReadClient<S>, sender: T, payer: Keypair) -> Self {
        Self {
            reader,
            sender,
            payer,
        }
    }

    pub fn payer(&self) -> Pubkey {
        self.payer.pubkey()
    }

    pub fn register_ngo(&self, metadata_uri: &str) -> Result<Registration, ClientError> {
        instruction::check_metadata_uri(metadata_uri)?;
        let admin = self.payer.pubkey();
        let (ngo, _) = ngo_address(&admin, self.reader.program_id())?;
        if self.reader.source().account(&ngo).map_err(source_err)?.is_some() {
            info!(%ngo, %admin, "ngo already registered");
            return Ok(Registration::AlreadyRegistered { ngo });
        }

        let ix = instruction::register_ngo(self.reader.program_id(), &admin, metadata_uri)?;
        let signature = self.send(&[ix])?;
        info!(%ngo, %admin, %signature, "registered ngo");
        Ok(Registration::Submitted { signature, ngo })
    }

    pub fn submit_batch(&self, args: &SubmitBatchArgs) -> Result<BatchSubmission, ClientError> {
        let admin = self.payer.pubkey();
        let program_id = self.reader.program_id();
        let (ngo, _) = ngo_address(&admin, program_id)?;
        let (batch, _) = batch_address(&ngo, args.batch_index, program_id)?;

        let ix = instruction::submit_batch(program_id, &admin, args)?;
        let signature = self.send(&[ix])?;
        info!(%ngo, %batch, index = args.batch_index, %signature, "submitted batch");
        Ok(BatchSubmission {
            signature,
            ngo,
            batch,
        })
    }

    fn send(&self, instructions: &[Instruction]) -> Result<String, ClientError> {
        self.sender
            .send(instructions, &self.payer)
            .map_err(|e| ClientError::Sender(e.to_string()))
    }
}

impl<S, T> Deref for SigningClient<S, T> {
    type Target = ReadClient<S>;

    fn deref(&self) -> &Self::Target {
        &self.reader
    }
}
