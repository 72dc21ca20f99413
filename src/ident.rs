//! ident — opaque volume identifiers.
//!
//! id = hex(HMAC-SHA256(key = salt, msg = device || mount_point))
//!
//! - Deterministic for a fixed (device, mount_point, salt) triple.
//! - Different salts give unrelated ids; raw device/mount strings cannot be
//!   recovered from an id without the salt.
//! - Total over its input domain: the salt is turned into a block-sized HMAC
//!   key up front (hashed if longer than a block, zero-padded otherwise).
//! - Salts that differ only by trailing NUL bytes are the same HMAC key and
//!   give the same ids.

use hmac::digest::{Key, KeyInit};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::fmt;
use zeroize::Zeroize;

type HmacSha256 = Hmac<Sha256>;

/// Derive the identifier of a volume.
pub fn derive_id(device: &[u8], mount_point: &[u8], salt: &[u8]) -> String {
    let mut key = block_key(salt);
    let mut mac = <HmacSha256 as KeyInit>::new(&key);
    key.as_mut_slice().zeroize();
    mac.update(device);
    mac.update(mount_point);
    hex::encode(mac.finalize().into_bytes())
}

// RFC 2104 key preparation: K' = H(K) if |K| > B, then pad with zeros to B.
fn block_key(salt: &[u8]) -> Key<HmacSha256> {
    let mut key = Key::<HmacSha256>::default();
    if salt.len() > key.len() {
        let digest = Sha256::digest(salt);
        key[..digest.len()].copy_from_slice(&digest);
    } else {
        key[..salt.len()].copy_from_slice(salt);
    }
    key
}

/// Process salt. Bytes are wiped from memory on drop.
#[derive(Clone)]
pub struct Salt {
    bytes: Vec<u8>,
}

impl Salt {
    pub fn new<S: Into<Vec<u8>>>(salt: S) -> Self {
        Self { bytes: salt.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Identifier of (device, mount_point) under this salt.
    pub fn derive(&self, device: &str, mount_point: &str) -> String {
        derive_id(device.as_bytes(), mount_point.as_bytes(), &self.bytes)
    }
}

// Никогда не печатаем соль в логах.
impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt(<{} bytes>)", self.bytes.len())
    }
}

impl Drop for Salt {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}
