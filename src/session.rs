//! Per-exchange session state.

use alloc::string::String;
use alloc::vec::Vec;
use zeroize::Zeroize;

use crate::constants::{FAST_HASH_LEN, SALT_LEN, VERIFIER_LEN};
use crate::errors::{Error, Result};

/// Protocol position of a session.
///
/// The step only ever moves forward; [`Step::Complete`] and [`Step::Failed`]
/// are absorbing. Which context fields may be read or written is gated on
/// the current step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// Created, no message processed yet.
    Init,
    /// Step 1 done, challenge sent, awaiting the client's response.
    AwaitingResponse,
    /// Step 2 done, the exchange succeeded.
    Complete,
    /// The exchange failed terminally; no further steps are accepted.
    Failed,
}

/// All mutable state of one authentication exchange.
///
/// A context is created by the caller from the credential material the store
/// returned for the claimed user, is processed by exactly one thread, and is
/// destroyed by the caller when the exchange ends or is abandoned. Dropping
/// the context wipes every secret-bearing field, on every exit path.
pub struct SessionContext {
    pub(crate) step: Step,
    pub(crate) username: Option<String>,
    pub(crate) salt: [u8; SALT_LEN],
    pub(crate) salted_verifier: Vec<u8>,
    pub(crate) verifier_fast_hash: Option<[u8; FAST_HASH_LEN]>,
    pub(crate) server_nonce: Option<String>,
    pub(crate) encrypted_server_nonce: Vec<u8>,
    pub(crate) peer_nonce: Option<String>,
    pub(crate) session_key: Option<[u8; FAST_HASH_LEN]>,
    pub(crate) replay_counter: u32,
}

impl SessionContext {
    /// Create a context from the stored credential material for one user.
    ///
    /// `salted_verifier` must be the stored `salt ∥ verify_digest(secret)`
    /// value and must embed the same salt that is passed separately;
    /// inconsistent material is a configuration error, reported distinctly
    /// from an authentication mismatch.
    pub fn new(salt: [u8; SALT_LEN], salted_verifier: &[u8]) -> Result<Self> {
        if salted_verifier.len() != VERIFIER_LEN {
            return Err(Error::Config(String::from("salted verifier length")));
        }
        if salted_verifier[..SALT_LEN] != salt {
            return Err(Error::Config(String::from("salt does not match verifier")));
        }
        Ok(SessionContext {
            step: Step::Init,
            username: None,
            salt,
            salted_verifier: salted_verifier.to_vec(),
            verifier_fast_hash: None,
            server_nonce: None,
            encrypted_server_nonce: Vec::new(),
            peer_nonce: None,
            session_key: None,
            replay_counter: 0,
        })
    }

    /// The session's current protocol position.
    pub fn step(&self) -> Step {
        self.step
    }

    /// The username claimed in step 1, once set.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// The session key derived in step 2.
    ///
    /// `None` until the exchange has completed successfully. The key is
    /// ephemeral to this exchange; it is wiped when the context is dropped.
    pub fn session_key(&self) -> Option<&[u8; FAST_HASH_LEN]> {
        match self.step {
            Step::Complete => self.session_key.as_ref(),
            _ => None,
        }
    }

    /// The encrypted server challenge produced in step 1, for callers that
    /// need to retransmit the step-1 reply verbatim.
    pub fn challenge(&self) -> &[u8] {
        &self.encrypted_server_nonce
    }

    /// The replay counter received in step 2. The server's reply carries
    /// this value plus one (wrapping), encrypted under the session key.
    pub fn replay_counter(&self) -> u32 {
        self.replay_counter
    }

    /// Move to the absorbing failed state.
    pub(crate) fn fail(&mut self) {
        self.step = Step::Failed;
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.salted_verifier.zeroize();
        self.verifier_fast_hash.zeroize();
        self.session_key.zeroize();
        self.peer_nonce.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::VERIFY_DIGEST_LEN;

    #[test]
    fn rejects_truncated_verifier() {
        let err = SessionContext::new([1, 2, 3, 4], &[0u8; VERIFIER_LEN - 1])
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn rejects_verifier_with_foreign_salt() {
        let mut verifier = [0u8; VERIFIER_LEN];
        verifier[..4].copy_from_slice(&[9, 9, 9, 9]);
        let err = SessionContext::new([1, 2, 3, 4], &verifier).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn fresh_context_exposes_no_session_key() {
        let mut verifier = [0u8; SALT_LEN + VERIFY_DIGEST_LEN];
        verifier[..SALT_LEN].copy_from_slice(&[1, 2, 3, 4]);
        let ctx = SessionContext::new([1, 2, 3, 4], &verifier).unwrap();
        assert_eq!(ctx.step(), Step::Init);
        assert!(ctx.session_key().is_none());
    }
}
