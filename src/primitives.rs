//! Cryptographic primitives for the exchange.
//!
//! Three digests with fixed, wire-visible output sizes and a 128-bit block
//! cipher in CBC mode. All functions are pure; nothing here holds state.
//!
//! The fast-hash key derivation is part of the wire format and is kept for
//! compatibility; see the caveat in the crate-level documentation before
//! deploying this mechanism in a new system.

use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes128;
use md5::{Digest, Md5};
use sha1::Sha1;
use sha2::Sha256;

use alloc::vec::Vec;

use crate::constants::{BIND_DIGEST_LEN, BLOCK_LEN, FAST_HASH_LEN, VERIFY_DIGEST_LEN};
use crate::errors::{Error, Result};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

/// Fast keyed-derivation hash, used to turn the stored verifier and the
/// exchanged nonces into symmetric key and IV material.
pub fn fast_hash(data: &[u8]) -> [u8; FAST_HASH_LEN] {
    Md5::digest(data).into()
}

/// The digest embedded in the stored verifier (`salt ∥ verify_digest(secret)`).
///
/// The server never recomputes this from a plaintext secret; it only ever
/// consumes the already-stored value. Exposed so that registration tooling
/// and test harnesses can build verifiers with the same primitive.
pub fn verify_digest(data: &[u8]) -> [u8; VERIFY_DIGEST_LEN] {
    Sha1::digest(data).into()
}

/// Transcript-binding digest over the server nonce, peer nonce and stored
/// verifier, making a captured response worthless for any other transcript.
pub fn bind_digest(data: &[u8]) -> [u8; BIND_DIGEST_LEN] {
    Sha256::digest(data).into()
}

/// AES-128-CBC encryption with zero padding.
///
/// The plaintext is padded with zero bytes up to the next block boundary
/// (an aligned plaintext gains no extra block). Padding carries no length
/// information: plaintexts in this protocol are printable ASCII followed by
/// a NUL terminator, and decryption recovers the exact length from that
/// terminator.
pub fn encrypt_cbc(
    key: &[u8; BLOCK_LEN],
    iv: &[u8; BLOCK_LEN],
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    if plaintext.is_empty() {
        return Err(Error::Crypto);
    }
    let mut buf = plaintext.to_vec();
    buf.resize(plaintext.len().next_multiple_of(BLOCK_LEN), 0);
    let len = buf.len();
    Aes128CbcEnc::new(key.into(), iv.into())
        .encrypt_padded_mut::<NoPadding>(&mut buf, len)
        .map_err(|_| Error::Crypto)?;
    Ok(buf)
}

/// AES-128-CBC decryption; inverse of [`encrypt_cbc`].
///
/// Fails with [`Error::Crypto`] if the ciphertext is empty or its length is
/// not a multiple of the block size. The returned plaintext still carries
/// the zero padding; callers truncate at the NUL terminator.
pub fn decrypt_cbc(
    key: &[u8; BLOCK_LEN],
    iv: &[u8; BLOCK_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_LEN != 0 {
        return Err(Error::Crypto);
    }
    let mut buf = ciphertext.to_vec();
    Aes128CbcDec::new(key.into(), iv.into())
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|_| Error::Crypto)?;
    Ok(buf)
}
