//! # Ed25519 Signature Verifier
//!
//! Default `SignatureVerifier`. Keys are 32 bytes, signatures 64 bytes; any
//! other shape fails verification.

use ed25519_dalek::{Signature, Verifier, VerifyingKey};

use crate::ports::outbound::SignatureVerifier;

/// Verifies Ed25519 signatures over the event hash.
#[derive(Debug, Default, Clone, Copy)]
pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, data: &[u8], signature: &[u8], public_key: &[u8]) -> bool {
        let Ok(key_bytes) = <[u8; 32]>::try_from(public_key) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&key_bytes) else {
            return false;
        };
        let Ok(signature) = Signature::from_slice(signature) else {
            return false;
        };
        verifying_key.verify(data, &signature).is_ok()
    }
}
