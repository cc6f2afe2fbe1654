//! ed25519 keypairs in the ledger CLI file format: a JSON array of 64
//! numbers, the 32-byte secret followed by the 32-byte public key.

use ed25519_dalek::{Signer, SigningKey};
use zeroize::Zeroizing;

use crate::error::KeypairError;
use crate::pubkey::Pubkey;

pub const KEYPAIR_LEN: usize = 64;

pub struct Keypair {
    signing: SigningKey,
}

impl Keypair {
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        Self {
            signing: SigningKey::from_bytes(secret),
        }
    }

    /// Parse `secret || public`, checking the public half.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeypairError> {
        if bytes.len() != KEYPAIR_LEN {
            return Err(KeypairError::Length(bytes.len()));
        }
        let mut secret = Zeroizing::new([0u8; 32]);
        secret.copy_from_slice(&bytes[..32]);
        let keypair = Self::from_secret(&secret);
        if keypair.pubkey().as_bytes()[..] != bytes[32..] {
            return Err(KeypairError::Mismatch);
        }
        Ok(keypair)
    }

    pub fn from_json(json: &str) -> Result<Self, KeypairError> {
        let bytes: Zeroizing<Vec<u8>> = Zeroizing::new(serde_json::from_str(json)?);
        Self::from_bytes(&bytes)
    }

    pub fn to_bytes(&self) -> Zeroizing<[u8; KEYPAIR_LEN]> {
        Zeroizing::new(self.signing.to_keypair_bytes())
    }

    pub fn to_json(&self) -> Zeroizing<String> {
        let bytes = self.to_bytes();
        // A byte slice always serializes.
        Zeroizing::new(serde_json::to_string(&bytes[..]).unwrap_or_default())
    }

    pub fn pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.signing.verifying_key().to_bytes())
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing.sign(message).to_bytes()
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair").field("pubkey", &self.pubkey()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier, VerifyingKey};
    use rand::{rngs::StdRng, RngCore, SeedableRng};

    fn random_keypair(seed: u64) -> Keypair {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut secret = [0u8; 32];
        rng.fill_bytes(&mut secret);
        Keypair::from_secret(&secret)
    }

    #[test]
    fn json_file_format_roundtrips_through_public_key() {
        let kp = random_keypair(1);
        let json = kp.to_json();
        assert!(json.starts_with('['));
        let back = Keypair::from_json(&json).unwrap();
        assert_eq!(back.pubkey(), kp.pubkey());
    }

    #[test]
    fn rejects_bad_files() {
        assert!(matches!(
            Keypair::from_json("[1,2,3]"),
            Err(KeypairError::Length(3))
        ));
        assert!(matches!(
            Keypair::from_json("{\"secret\": 1}"),
            Err(KeypairError::Format(_))
        ));

        let mut bytes = random_keypair(2).to_bytes();
        bytes[40] ^= 1;
        assert!(matches!(
            Keypair::from_bytes(&bytes[..]),
            Err(KeypairError::Mismatch)
        ));
    }

    #[test]
    fn signatures_verify_under_pubkey() {
        let kp = random_keypair(3);
        let sig = Signature::from_bytes(&kp.sign(b"aid"));
        let vk = VerifyingKey::from_bytes(kp.pubkey().as_bytes()).unwrap();
        assert!(vk.verify(b"aid", &sig).is_ok());
    }
}
