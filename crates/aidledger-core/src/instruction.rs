//! Instruction encoding for the program's two entry points.

use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;

use crate::cursor::ByteWriter;
use crate::error::InstructionError;
use crate::pda::{batch_address, ngo_address};
use crate::pubkey::Pubkey;
use crate::tag::Discriminator;

pub const REGISTER_NGO: &str = "register_ngo";
pub const SUBMIT_BATCH: &str = "submit_batch";

/// Length of the default batch window, in seconds.
pub const DEFAULT_BATCH_WINDOW_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountMeta {
    pub pubkey: Pubkey,
    pub is_signer: bool,
    pub is_writable: bool,
}

impl AccountMeta {
    pub fn writable(pubkey: Pubkey, is_signer: bool) -> Self {
        Self {
            pubkey,
            is_signer,
            is_writable: true,
        }
    }

    pub fn readonly(pubkey: Pubkey) -> Self {
        Self {
            pubkey,
            is_signer: false,
            is_writable: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    pub program_id: Pubkey,
    pub accounts: Vec<AccountMeta>,
    #[serde(serialize_with = "as_base64")]
    pub data: Vec<u8>,
}

fn as_base64<S: serde::Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&general_purpose::STANDARD.encode(data))
}

/// Arguments of `submit_batch`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitBatchArgs {
    pub batch_index: u64,
    pub merkle_root: [u8; 32],
    pub data_uri: String,
    pub region: String,
    pub program_tag: String,
    pub start_time: i64,
    pub end_time: i64,
}

impl SubmitBatchArgs {
    /// Demo defaults for batch `batch_index` opening at `now`.
    pub fn demo(batch_index: u64, now: i64) -> Self {
        Self {
            batch_index,
            merkle_root: [0u8; 32],
            data_uri: "ipfs://aidledger-demo-batch".into(),
            region: "Global".into(),
            program_tag: "DemoProgram".into(),
            start_time: now,
            end_time: now + DEFAULT_BATCH_WINDOW_SECS,
        }
    }
}

pub(crate) fn check_metadata_uri(metadata_uri: &str) -> Result<(), InstructionError> {
    if metadata_uri.is_empty() {
        return Err(InstructionError::EmptyMetadataUri);
    }
    Ok(())
}

/// `register_ngo(metadata_uri)`, signed by `admin`.
pub fn register_ngo(
    program_id: &Pubkey,
    admin: &Pubkey,
    metadata_uri: &str,
) -> Result<Instruction, InstructionError> {
    check_metadata_uri(metadata_uri)?;
    let (ngo, _) = ngo_address(admin, program_id)?;

    let mut data = ByteWriter::new();
    data.bytes(Discriminator::instruction(REGISTER_NGO).as_bytes())
        .string(metadata_uri);

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::writable(ngo, false),
            AccountMeta::writable(*admin, true),
            AccountMeta::readonly(Pubkey::SYSTEM_PROGRAM),
        ],
        data: data.into_inner(),
    })
}

/// `submit_batch(..)` for the NGO administered by `admin`.
pub fn submit_batch(
    program_id: &Pubkey,
    admin: &Pubkey,
    args: &SubmitBatchArgs,
) -> Result<Instruction, InstructionError> {
    let (ngo, _) = ngo_address(admin, program_id)?;
    let (batch, _) = batch_address(&ngo, args.batch_index, program_id)?;

    let mut data = ByteWriter::new();
    data.bytes(Discriminator::instruction(SUBMIT_BATCH).as_bytes())
        .u64(args.batch_index)
        .bytes(&args.merkle_root)
        .string(&args.data_uri)
        .string(&args.region)
        .string(&args.program_tag)
        .i64(args.start_time)
        .i64(args.end_time);

    Ok(Instruction {
        program_id: *program_id,
        accounts: vec![
            AccountMeta::writable(ngo, false),
            AccountMeta::writable(batch, false),
            AccountMeta::writable(*admin, true),
            AccountMeta::readonly(Pubkey::SYSTEM_PROGRAM),
        ],
        data: data.into_inner(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::ByteCursor;
    use crate::DEFAULT_PROGRAM_ID;

    fn program() -> Pubkey {
        DEFAULT_PROGRAM_ID.parse().unwrap()
    }

    #[test]
    fn register_ngo_layout() {
        let admin = Pubkey::new_from_array([8u8; 32]);
        let ix = register_ngo(&program(), &admin, "ipfs://meta").unwrap();
        assert_eq!(&ix.data[..8], &[5, 168, 204, 75, 108, 93, 89, 244]);

        let mut c = ByteCursor::new(&ix.data[8..]);
        assert_eq!(c.read_string("uri").unwrap(), "ipfs://meta");
        assert_eq!(c.remaining(), 0);

        assert_eq!(ix.accounts[0].pubkey, ngo_address(&admin, &program()).unwrap().0);
        assert!(ix.accounts[1].is_signer);
        assert_eq!(ix.accounts[2], AccountMeta::readonly(Pubkey::SYSTEM_PROGRAM));
    }

    #[test]
    fn register_ngo_rejects_empty_metadata_uri() {
        let admin = Pubkey::new_from_array([8u8; 32]);
        assert_eq!(
            register_ngo(&program(), &admin, ""),
            Err(InstructionError::EmptyMetadataUri)
        );
    }

    #[test]
    fn submit_batch_layout() {
        let admin = Pubkey::new_from_array([8u8; 32]);
        let args = SubmitBatchArgs::demo(2, 1_700_000_000);
        let ix = submit_batch(&program(), &admin, &args).unwrap();
        assert_eq!(&ix.data[..8], &[219, 171, 120, 113, 27, 245, 80, 20]);

        let mut c = ByteCursor::new(&ix.data[8..]);
        assert_eq!(c.read_u64("index").unwrap(), 2);
        assert_eq!(c.read_array::<32>("root").unwrap(), [0u8; 32]);
        assert_eq!(c.read_string("data_uri").unwrap(), "ipfs://aidledger-demo-batch");
        assert_eq!(c.read_string("region").unwrap(), "Global");
        assert_eq!(c.read_string("tag").unwrap(), "DemoProgram");
        assert_eq!(c.read_i64("start").unwrap(), 1_700_000_000);
        assert_eq!(c.read_i64("end").unwrap(), 1_700_000_000 + DEFAULT_BATCH_WINDOW_SECS);
        assert_eq!(c.remaining(), 0);

        let ngo = ngo_address(&admin, &program()).unwrap().0;
        let batch = batch_address(&ngo, 2, &program()).unwrap().0;
        let keys: Vec<_> = ix.accounts.iter().map(|a| a.pubkey).collect();
        assert_eq!(keys, vec![ngo, batch, admin, Pubkey::SYSTEM_PROGRAM]);
    }

    #[test]
    fn serializes_data_as_base64() {
        let ix = Instruction {
            program_id: program(),
            accounts: vec![],
            data: b"hello".to_vec(),
        };
        let json = serde_json::to_value(&ix).unwrap();
        assert_eq!(json["data"], "aGVsbG8=");
        assert_eq!(json["programId"], DEFAULT_PROGRAM_ID);
    }
}
