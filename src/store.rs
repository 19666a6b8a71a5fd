//! Credential store abstraction.

use alloc::vec::Vec;

use crate::constants::SALT_LEN;

/// Trait the server uses to abstract over storage and retrieval of salted
/// verifiers.
///
/// The store is consulted read-only, once per exchange, before step 1 runs.
/// Implementations are free to back this with a directory service, a
/// database, or an in-memory table in tests.
pub trait CredentialStore {
    /// Look up the credential material for `username`.
    ///
    /// # Return:
    /// `(salt, salted_verifier)` where `salted_verifier` is the stored
    /// `salt ∥ verify_digest(secret)` value, or `None` when the user is
    /// unknown. The salted verifier is secret material; implementations
    /// should avoid keeping extra copies alive.
    fn lookup(&self, username: &[u8]) -> Option<([u8; SALT_LEN], Vec<u8>)>;
}
