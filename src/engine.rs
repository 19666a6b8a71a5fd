//! The two-step protocol engine.
//!
//! [`step1`] consumes the client's identification message and produces the
//! encrypted server challenge; [`step2`] verifies the client's
//! transcript-binding response and produces the freshness-bound
//! confirmation. Both steps gate strictly on the session's current
//! [`Step`](crate::Step): an out-of-sequence call returns
//! [`Error::Protocol`] without touching the context.
//!
//! Ordering inside each step matters and is part of the wire format; the
//! exact derivation formulas are spelled out on the helpers below.

use alloc::string::String;
use alloc::vec::Vec;
use rand_core::CryptoRngCore;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::constants::{
    BIND_DIGEST_LEN, BLOCK_LEN, FAST_HASH_LEN, FIELD_CHALLENGE, FIELD_HASHTYPE, FIELD_NONCE,
    FIELD_PEER_CHALLENGE, FIELD_RESPONSE, FIELD_SALT, HASH_TYPE, MAX_NONCE_LEN, SALT_LEN,
    SERVER_NONCE_LEN,
};
use crate::errors::{Error, Result};
use crate::primitives::{bind_digest, decrypt_cbc, encrypt_cbc, fast_hash};
use crate::session::{SessionContext, Step};
use crate::utils::generate_printable;
use crate::wire::{decode_base64, encode_base64, format, username_field, Message};

/// IV for the challenge cipher: `salt ∥ verifier_fast_hash[0..12]`.
fn challenge_iv(salt: &[u8; SALT_LEN], vfh: &[u8; FAST_HASH_LEN]) -> [u8; BLOCK_LEN] {
    let mut iv = [0u8; BLOCK_LEN];
    iv[..SALT_LEN].copy_from_slice(salt);
    iv[SALT_LEN..].copy_from_slice(&vfh[..BLOCK_LEN - SALT_LEN]);
    iv
}

/// Encrypt a printable ASCII value with its NUL terminator appended.
fn seal_terminated(
    key: &[u8; BLOCK_LEN],
    iv: &[u8; BLOCK_LEN],
    value: &[u8],
) -> Result<Vec<u8>> {
    let mut plaintext = Vec::with_capacity(value.len() + 1);
    plaintext.extend_from_slice(value);
    plaintext.push(0);
    let ciphertext = encrypt_cbc(key, iv, &plaintext);
    plaintext.zeroize();
    ciphertext
}

/// Decrypt a NUL-terminated printable ASCII value (graphic characters and
/// space) of at most `max_len` bytes. A missing terminator, an empty body,
/// or a non-printable byte before the terminator all mean the wrong key or
/// a tampered ciphertext. The decrypted buffer is wiped on every path.
fn open_terminated(
    key: &[u8; BLOCK_LEN],
    iv: &[u8; BLOCK_LEN],
    ciphertext: &[u8],
    max_len: usize,
) -> Result<String> {
    let mut plaintext = decrypt_cbc(key, iv, ciphertext)?;
    let value = match plaintext.iter().position(|&b| b == 0) {
        Some(end) => {
            let body = &plaintext[..end];
            if body.is_empty()
                || body.len() > max_len
                || !body.iter().all(|&b| b.is_ascii_graphic() || b == b' ')
            {
                Err(Error::Crypto)
            } else {
                // Printable ASCII, so the conversion cannot fail.
                String::from_utf8(body.to_vec()).map_err(|_| Error::Crypto)
            }
        }
        None => Err(Error::Crypto),
    };
    plaintext.zeroize();
    value
}

/// Process the client's step-1 message.
///
/// Parses the claimed username, derives the fast hash of the stored
/// verifier, generates a fresh server nonce and replies with
/// `salt=…;challenge=…;hashtype=…`, where the challenge is the nonce
/// encrypted under `key = fast_hash(salted_verifier)` and
/// `iv = salt ∥ key[0..12]`.
///
/// The context is only mutated once every fallible operation has
/// succeeded, so a parse failure leaves the session replayable with a
/// corrected message.
pub fn step1<CSPRNG>(
    ctx: &mut SessionContext,
    rng: &mut CSPRNG,
    input: &str,
) -> Result<String>
where
    CSPRNG: CryptoRngCore,
{
    if ctx.step != Step::Init {
        return Err(Error::Protocol);
    }

    let msg = Message::parse(input)?;
    let username = username_field(&msg)?;

    let vfh = fast_hash(&ctx.salted_verifier);
    let iv = challenge_iv(&ctx.salt, &vfh);
    let server_nonce = generate_printable::<_, SERVER_NONCE_LEN>(rng);
    let encrypted = seal_terminated(&vfh, &iv, server_nonce.as_bytes())?;

    let reply = format(&[
        (FIELD_SALT, &encode_base64(&ctx.salt)),
        (FIELD_CHALLENGE, &encode_base64(&encrypted)),
        (FIELD_HASHTYPE, itoa(HASH_TYPE).as_str()),
    ]);

    ctx.username = Some(username);
    ctx.verifier_fast_hash = Some(vfh);
    ctx.server_nonce = Some(server_nonce);
    ctx.encrypted_server_nonce = encrypted;
    ctx.step = Step::AwaitingResponse;

    Ok(reply)
}

/// Process the client's step-2 message.
///
/// Decrypts the peer challenge back to the peer nonce, derives the session
/// key as `fast_hash(server_nonce ∥ peer_nonce ∥ verifier_fast_hash)`,
/// checks the transcript binding
/// `bind_digest(server_nonce ∥ peer_nonce ∥ salted_verifier)` against the
/// client's response in constant time, and replies with the client's replay
/// counter plus one, encrypted under the session key with an all-zero IV.
///
/// A binding mismatch or a cipher failure moves the session to
/// [`Step::Failed`]; a parse failure leaves it untouched.
pub fn step2(ctx: &mut SessionContext, input: &str) -> Result<String> {
    if ctx.step != Step::AwaitingResponse {
        return Err(Error::Protocol);
    }

    let msg = Message::parse(input)?;
    let response = decode_base64(FIELD_RESPONSE, msg.require(FIELD_RESPONSE)?)?;
    if response.len() != BIND_DIGEST_LEN {
        return Err(Error::Parse(FIELD_RESPONSE));
    }
    let peer_challenge = decode_base64(FIELD_PEER_CHALLENGE, msg.require(FIELD_PEER_CHALLENGE)?)?;
    let counter_ct = decode_base64(FIELD_NONCE, msg.require(FIELD_NONCE)?)?;

    // Step gating guarantees these were set in step 1.
    let (vfh, server_nonce) = match (&ctx.verifier_fast_hash, &ctx.server_nonce) {
        (Some(vfh), Some(nonce)) => (*vfh, nonce.clone()),
        _ => return Err(Error::Protocol),
    };

    let iv = challenge_iv(&ctx.salt, &vfh);
    let peer_nonce = match open_terminated(&vfh, &iv, &peer_challenge, MAX_NONCE_LEN) {
        Ok(nonce) => nonce,
        Err(e) => {
            ctx.fail();
            return Err(e);
        }
    };

    // Session key is derived exactly once per exchange, right here.
    let mut ikm = Vec::with_capacity(server_nonce.len() + peer_nonce.len() + FAST_HASH_LEN);
    ikm.extend_from_slice(server_nonce.as_bytes());
    ikm.extend_from_slice(peer_nonce.as_bytes());
    ikm.extend_from_slice(&vfh);
    let mut session_key = fast_hash(&ikm);
    ikm.zeroize();

    let mut transcript =
        Vec::with_capacity(server_nonce.len() + peer_nonce.len() + ctx.salted_verifier.len());
    transcript.extend_from_slice(server_nonce.as_bytes());
    transcript.extend_from_slice(peer_nonce.as_bytes());
    transcript.extend_from_slice(&ctx.salted_verifier);
    let expected = bind_digest(&transcript);
    transcript.zeroize();

    if expected[..].ct_eq(&response[..]).unwrap_u8() != 1 {
        session_key.zeroize();
        ctx.fail();
        return Err(Error::AuthMismatch);
    }

    let zero_iv = [0u8; BLOCK_LEN];
    let counter = match open_terminated(&session_key, &zero_iv, &counter_ct, 10)
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
    {
        Some(counter) => counter,
        None => {
            session_key.zeroize();
            ctx.fail();
            return Err(Error::Crypto);
        }
    };

    let confirmation = itoa(counter.wrapping_add(1));
    let encrypted = match seal_terminated(&session_key, &zero_iv, confirmation.as_bytes()) {
        Ok(ct) => ct,
        Err(e) => {
            session_key.zeroize();
            ctx.fail();
            return Err(e);
        }
    };

    let reply = format(&[(FIELD_NONCE, &encode_base64(&encrypted))]);

    ctx.peer_nonce = Some(peer_nonce);
    ctx.session_key = Some(session_key);
    ctx.replay_counter = counter;
    ctx.step = Step::Complete;

    Ok(reply)
}

/// Decimal rendering without pulling in formatting machinery at call sites.
fn itoa(value: u32) -> String {
    alloc::format!("{value}")
}
