//! Nonce generation helpers.

use alloc::string::String;
use rand_core::CryptoRngCore;

use crate::wire::encode_base64;

/// Generate a fixed length nonce using a CSPRNG.
///
/// The RNG call may block on entropy availability; callers on
/// latency-sensitive paths should account for that.
#[inline(always)]
pub(crate) fn generate_nonce<CSPRNG, const N: usize>(rng: &mut CSPRNG) -> [u8; N]
where
    CSPRNG: CryptoRngCore,
{
    let mut nonce = [0; N];
    rng.fill_bytes(&mut nonce);
    nonce
}

/// Generate `N` random bytes and return their printable base64 form, the
/// representation the protocol carries inside encrypted challenges.
pub(crate) fn generate_printable<CSPRNG, const N: usize>(rng: &mut CSPRNG) -> String
where
    CSPRNG: CryptoRngCore,
{
    let nonce: [u8; N] = generate_nonce(rng);
    encode_base64(&nonce)
}
