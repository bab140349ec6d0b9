//! PBKDF2-HMAC-SHA256 derivation of PIN hashes

use hmac::Hmac;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{AuthError, AuthResult};
use crate::input::validate_pin;

/// Salt length in bytes (hex-encoded on disk: 32 chars)
pub const SALT_LEN: usize = 16;

/// Derived key length in bytes
pub const HASH_LEN: usize = 32;

/// Production iteration count
pub const DEFAULT_ITERATIONS: u32 = 120_000;

/// PIN KDF parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinKdf {
    pub iterations: u32,
}

impl Default for PinKdf {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

/// Salt and hash as stored in a credential record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinHash {
    pub salt_hex: String,
    pub hash_hex: String,
}

impl PinKdf {
    pub fn new(iterations: u32) -> Self {
        Self { iterations }
    }

    /// Hash a PIN under a fresh random salt
    pub fn hash_new(&self, pin: &str) -> AuthResult<PinHash> {
        validate_pin(pin)?;
        let salt_hex = hex::encode(generate_salt());
        let hash_hex = self.derive_hex(pin, &salt_hex)?;
        Ok(PinHash { salt_hex, hash_hex })
    }

    /// Hash a PIN under an existing hex salt
    pub fn hash_with_salt(&self, pin: &str, salt_hex: &str) -> AuthResult<String> {
        validate_pin(pin)?;
        self.derive_hex(pin, salt_hex)
    }

    /// Recompute and compare in constant time
    pub fn verify(&self, pin: &str, salt_hex: &str, expected_hex: &str) -> AuthResult<bool> {
        let got = self.hash_with_salt(pin, salt_hex)?;
        Ok(constant_time_eq(got.as_bytes(), expected_hex.as_bytes()))
    }

    fn derive_hex(&self, pin: &str, salt_hex: &str) -> AuthResult<String> {
        let salt = hex::decode(salt_hex)
            .map_err(|e| AuthError::KeyDerivation(format!("Stored salt is not hex: {}", e)))?;

        let mut key = Zeroizing::new([0u8; HASH_LEN]);
        pbkdf2::pbkdf2::<Hmac<Sha256>>(pin.as_bytes(), &salt, self.iterations, &mut key[..])
            .map_err(|e| AuthError::KeyDerivation(e.to_string()))?;

        Ok(hex::encode(&key[..]))
    }
}

/// Random salt from the thread RNG
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Length-aware constant-time comparison
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
