//! NGO and batch account layouts.
//!
//! ```text
//! Ngo   : tag[8] admin[32] metadata_uri(str) is_active[1] bump[1] created_at(i64)
//! Batch : tag[8] ngo[32] batch_index(u64) merkle_root[32] data_uri(str)
//!         region(str) program_tag(str) start_time(i64) end_time(i64)
//!         is_flagged[1] bump[1]
//! ```
//!
//! `str` is a u32 little-endian length followed by UTF-8 bytes.

use serde::Serialize;

use crate::cursor::{ByteCursor, ByteWriter};
use crate::error::DecodeError;
use crate::pubkey::{Pubkey, PUBKEY_LEN};
use crate::tag::{RecordKind, TAG_LEN};

const STR_PREFIX_LEN: usize = 4;

/// What to do with bytes left after the last field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Trailing {
    /// Leftover bytes are an error.
    #[default]
    Reject,
    /// Accept leftover bytes if they are all zero (accounts allocated with
    /// fixed maximum space).
    AllowZeroPadding,
}

/// A record stored in a program account behind a [`RecordKind`] tag.
pub trait AccountRecord: Sized {
    const KIND: RecordKind;

    /// Smallest possible encoding, tag included, with empty strings.
    const MIN_LEN: usize;

    /// Decode the fields following the tag.
    fn decode_body(cursor: &mut ByteCursor<'_>) -> Result<Self, DecodeError>;

    /// Encode the fields following the tag.
    fn encode_body(&self, w: &mut ByteWriter);

    fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        Self::decode_with(data, Trailing::Reject)
    }

    fn decode_with(data: &[u8], trailing: Trailing) -> Result<Self, DecodeError> {
        let truncated = || DecodeError::TruncatedRecord {
            field: Self::KIND.type_name(),
            needed: Self::MIN_LEN,
            remaining: data.len(),
        };
        if data.len() < TAG_LEN {
            return Err(truncated());
        }
        if !Self::KIND.tag().matches(data) {
            return Err(DecodeError::UnknownRecordKind);
        }
        if data.len() < Self::MIN_LEN {
            return Err(truncated());
        }
        let mut cursor = ByteCursor::new(data);
        cursor.skip(TAG_LEN, "tag")?;
        let record = Self::decode_body(&mut cursor)?;
        check_trailing(cursor.rest(), trailing)?;
        Ok(record)
    }

    fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::with_capacity(Self::MIN_LEN);
        w.bytes(Self::KIND.tag().as_bytes());
        self.encode_body(&mut w);
        w.into_inner()
    }
}

fn check_trailing(rest: &[u8], trailing: Trailing) -> Result<(), DecodeError> {
    if rest.is_empty() {
        return Ok(());
    }
    match trailing {
        Trailing::AllowZeroPadding if rest.iter().all(|b| *b == 0) => Ok(()),
        _ => Err(DecodeError::TrailingBytes { count: rest.len() }),
    }
}

/// A registered NGO identity, keyed by its administrator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NgoRecord {
    pub admin: Pubkey,
    pub metadata_uri: String,
    pub is_active: bool,
    pub bump: u8,
    /// Unix seconds.
    pub created_at: i64,
}

impl AccountRecord for NgoRecord {
    const KIND: RecordKind = RecordKind::Ngo;
    const MIN_LEN: usize = TAG_LEN + PUBKEY_LEN + STR_PREFIX_LEN + 1 + 1 + 8;

    fn decode_body(c: &mut ByteCursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            admin: c.read_pubkey("admin")?,
            metadata_uri: c.read_string("metadata_uri")?,
            is_active: c.read_bool("is_active")?,
            bump: c.read_u8("bump")?,
            created_at: c.read_i64("created_at")?,
        })
    }

    fn encode_body(&self, w: &mut ByteWriter) {
        w.pubkey(&self.admin)
            .string(&self.metadata_uri)
            .bool(self.is_active)
            .u8(self.bump)
            .i64(self.created_at);
    }
}

/// One aid distribution round submitted by an NGO.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    /// Address of the owning NGO account.
    pub ngo: Pubkey,
    pub batch_index: u64,
    pub merkle_root: [u8; 32],
    pub data_uri: String,
    pub region: String,
    pub program_tag: String,
    pub start_time: i64,
    pub end_time: i64,
    pub is_flagged: bool,
    pub bump: u8,
}

impl BatchRecord {
    /// Offset of the `ngo` key inside the account data.
    pub const NGO_OFFSET: usize = TAG_LEN;

    /// `start_time > end_time`. The program does not enforce the order.
    pub fn has_inverted_window(&self) -> bool {
        self.start_time > self.end_time
    }
}

impl AccountRecord for BatchRecord {
    const KIND: RecordKind = RecordKind::Batch;
    const MIN_LEN: usize =
        TAG_LEN + PUBKEY_LEN + 8 + 32 + 3 * STR_PREFIX_LEN + 8 + 8 + 1 + 1;

    fn decode_body(c: &mut ByteCursor<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            ngo: c.read_pubkey("ngo")?,
            batch_index: c.read_u64("batch_index")?,
            merkle_root: c.read_array("merkle_root")?,
            data_uri: c.read_string("data_uri")?,
            region: c.read_string("region")?,
            program_tag: c.read_string("program_tag")?,
            start_time: c.read_i64("start_time")?,
            end_time: c.read_i64("end_time")?,
            is_flagged: c.read_bool("is_flagged")?,
            bump: c.read_u8("bump")?,
        })
    }

    fn encode_body(&self, w: &mut ByteWriter) {
        w.pubkey(&self.ngo)
            .u64(self.batch_index)
            .bytes(&self.merkle_root)
            .string(&self.data_uri)
            .string(&self.region)
            .string(&self.program_tag)
            .i64(self.start_time)
            .i64(self.end_time)
            .bool(self.is_flagged)
            .u8(self.bump);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tag::{BATCH_TAG, NGO_TAG};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn sample_ngo() -> NgoRecord {
        NgoRecord {
            admin: Pubkey::new_from_array([0u8; 32]),
            metadata_uri: "ipfs://x".into(),
            is_active: true,
            bump: 1,
            created_at: 1_700_000_000,
        }
    }

    fn sample_batch() -> BatchRecord {
        let mut merkle_root = [0u8; 32];
        for (i, b) in merkle_root.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(37);
        }
        BatchRecord {
            ngo: Pubkey::new_from_array([4u8; 32]),
            batch_index: 3,
            merkle_root,
            data_uri: "ipfs://bafy-batch".into(),
            region: "Kassala".into(),
            program_tag: "FoodAid".into(),
            start_time: 1_700_000_000,
            end_time: 1_700_604_800,
            is_flagged: false,
            bump: 254,
        }
    }

    #[test]
    fn decodes_known_ngo_layout() {
        let ngo = sample_ngo();
        let bytes = ngo.encode();
        assert_eq!(bytes.len(), 8 + 32 + 4 + 8 + 1 + 1 + 8);
        assert_eq!(&bytes[..8], NGO_TAG.as_bytes());
        assert_eq!(&bytes[40..44], &8u32.to_le_bytes());
        assert_eq!(&bytes[44..52], b"ipfs://x");

        let decoded = NgoRecord::decode(&bytes).unwrap();
        assert_eq!(decoded, ngo);
        assert_eq!(decoded.metadata_uri.len(), 8);
    }

    #[test]
    fn decodes_batch_preserving_merkle_root() {
        let batch = sample_batch();
        let bytes = batch.encode();
        assert_eq!(&bytes[..8], BATCH_TAG.as_bytes());
        assert_eq!(
            bytes.len(),
            BatchRecord::MIN_LEN + "ipfs://bafy-batch".len() + "Kassala".len() + "FoodAid".len()
        );
        let decoded = BatchRecord::decode(&bytes).unwrap();
        assert_eq!(decoded.merkle_root, batch.merkle_root);
        assert_eq!(decoded, batch);
    }

    #[test]
    fn five_byte_buffer_is_truncated_for_both_kinds() {
        let bytes = [1u8, 2, 3, 4, 5];
        assert!(matches!(
            NgoRecord::decode(&bytes),
            Err(DecodeError::TruncatedRecord { remaining: 5, .. })
        ));
        assert!(matches!(
            BatchRecord::decode(&bytes),
            Err(DecodeError::TruncatedRecord { remaining: 5, .. })
        ));
    }

    #[test]
    fn every_prefix_below_full_length_is_truncated() {
        let bytes = sample_ngo().encode();
        for len in 0..bytes.len() {
            assert!(
                matches!(
                    NgoRecord::decode(&bytes[..len]),
                    Err(DecodeError::TruncatedRecord { .. })
                ),
                "prefix of {len} bytes"
            );
        }
        let bytes = sample_batch().encode();
        for len in 0..bytes.len() {
            assert!(matches!(
                BatchRecord::decode(&bytes[..len]),
                Err(DecodeError::TruncatedRecord { .. })
            ));
        }
    }

    #[test]
    fn wrong_tag_is_unknown_kind() {
        let ngo_bytes = sample_ngo().encode();
        let mut bytes = ngo_bytes.clone();
        bytes[..8].copy_from_slice(&[0xaa; 8]);
        assert_eq!(NgoRecord::decode(&bytes), Err(DecodeError::UnknownRecordKind));

        // A valid NGO account is not a batch, even though it is shorter
        // than any batch.
        assert!(ngo_bytes.len() < BatchRecord::MIN_LEN);
        assert_eq!(
            BatchRecord::decode(&ngo_bytes),
            Err(DecodeError::UnknownRecordKind)
        );

        let junk = [0xffu8; 20];
        assert_eq!(NgoRecord::decode(&junk), Err(DecodeError::UnknownRecordKind));
        assert_eq!(BatchRecord::decode(&junk), Err(DecodeError::UnknownRecordKind));
    }

    fn random_text(rng: &mut StdRng) -> String {
        const PIECES: [&str; 6] = ["", "a", "ipfs://", "Région", "水", "🚚"];
        (0..rng.gen_range(0..6))
            .map(|_| PIECES[rng.gen_range(0..PIECES.len())])
            .collect()
    }

    fn random_i64(rng: &mut StdRng) -> i64 {
        match rng.gen_range(0..4) {
            0 => i64::MIN,
            1 => i64::MAX,
            2 => 0,
            _ => rng.gen(),
        }
    }

    #[test]
    fn random_records_roundtrip() {
        let mut rng = StdRng::seed_from_u64(0xa1d);
        for _ in 0..500 {
            let ngo = NgoRecord {
                admin: Pubkey::new_from_array(rng.gen()),
                metadata_uri: random_text(&mut rng),
                is_active: rng.gen(),
                bump: rng.gen(),
                created_at: random_i64(&mut rng),
            };
            let bytes = ngo.encode();
            assert_eq!(bytes.len(), NgoRecord::MIN_LEN + ngo.metadata_uri.len());
            assert_eq!(NgoRecord::decode(&bytes).unwrap(), ngo);

            let batch = BatchRecord {
                ngo: Pubkey::new_from_array(rng.gen()),
                batch_index: if rng.gen_bool(0.2) { u64::MAX } else { rng.gen() },
                merkle_root: rng.gen(),
                data_uri: random_text(&mut rng),
                region: random_text(&mut rng),
                program_tag: random_text(&mut rng),
                start_time: random_i64(&mut rng),
                end_time: random_i64(&mut rng),
                is_flagged: rng.gen(),
                bump: rng.gen(),
            };
            let bytes = batch.encode();
            let decoded = BatchRecord::decode(&bytes).unwrap();
            assert_eq!(decoded.merkle_root[..], bytes[48..80]);
            assert_eq!(decoded.merkle_root, batch.merkle_root);
            assert_eq!(decoded, batch);
            assert_eq!(decoded.encode(), bytes);
        }
    }

    #[test]
    fn oversized_string_length_is_truncated_not_partial() {
        let mut bytes = sample_ngo().encode();
        bytes[40..44].copy_from_slice(&1_000u32.to_le_bytes());
        assert_eq!(
            NgoRecord::decode(&bytes),
            Err(DecodeError::TruncatedRecord {
                field: "metadata_uri",
                needed: 1_000,
                remaining: 8 + 1 + 1 + 8,
            })
        );
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let mut bytes = sample_batch().encode();
        // First byte of data_uri payload.
        let offset = 8 + 32 + 8 + 32 + 4;
        bytes[offset] = 0xff;
        assert_eq!(
            BatchRecord::decode(&bytes),
            Err(DecodeError::InvalidStringEncoding { field: "data_uri" })
        );
    }

    #[test]
    fn trailing_bytes_follow_the_requested_rule() {
        let mut bytes = sample_ngo().encode();
        bytes.extend_from_slice(&[0u8; 16]);
        assert_eq!(
            NgoRecord::decode(&bytes),
            Err(DecodeError::TrailingBytes { count: 16 })
        );
        assert_eq!(
            NgoRecord::decode_with(&bytes, Trailing::AllowZeroPadding).unwrap(),
            sample_ngo()
        );

        bytes.push(1);
        assert_eq!(
            NgoRecord::decode_with(&bytes, Trailing::AllowZeroPadding),
            Err(DecodeError::TrailingBytes { count: 17 })
        );
    }

    #[test]
    fn nonzero_flag_byte_reads_true() {
        let mut bytes = sample_ngo().encode();
        let flag = bytes.len() - 10;
        bytes[flag] = 2;
        assert!(NgoRecord::decode(&bytes).unwrap().is_active);
    }

    #[test]
    fn inverted_window_is_surfaced_not_corrected() {
        let mut batch = sample_batch();
        assert!(!batch.has_inverted_window());
        batch.start_time = batch.end_time + 1;
        let decoded = BatchRecord::decode(&batch.encode()).unwrap();
        assert!(decoded.has_inverted_window());
        assert_eq!(decoded.start_time, batch.start_time);
    }

    #[test]
    fn serializes_with_api_field_names() {
        let json = serde_json::to_value(sample_ngo()).unwrap();
        assert_eq!(json["metadataUri"], "ipfs://x");
        assert_eq!(json["isActive"], true);
        assert_eq!(json["createdAt"], 1_700_000_000i64);
        assert_eq!(json["admin"], "11111111111111111111111111111111");

        let json = serde_json::to_value(sample_batch()).unwrap();
        assert_eq!(json["batchIndex"], 3);
        assert_eq!(json["programTag"], "FoodAid");
        assert_eq!(json["merkleRoot"].as_array().unwrap().len(), 32);
    }
}
