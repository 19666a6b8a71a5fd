#![no_std]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

//! Server side of the PPS two-round challenge-response authentication
//! protocol: a client proves knowledge of a secret against a previously
//! stored salted verifier, both sides derive a fresh symmetric session key,
//! and the server returns a freshness-bound confirmation.
//!
//! This crate is a pure in-memory protocol engine. Transport framing,
//! credential storage and session lifecycle belong to the embedding
//! service; the former two are abstracted behind byte-in/byte-out messages
//! and the [`CredentialStore`] trait.
//!
//! # Protocol description
//!
//! The stored credential is `verifier = salt ∥ SHA-1(secret)`. Let
//! `K = MD5(verifier)` and `IV = salt ∥ K[0..12]`; `E` is AES-128-CBC.
//!
//! | Server                               | Data transfer                    | Client                               |
//! |--------------------------------------|----------------------------------|--------------------------------------|
//! |                                      | <- `username`                    |                                      |
//! |`salt, verifier = lookup(username)`   |                                  |                                      |
//! |`Ns = ${0,1}^128` (as base64)         | `salt, E(K, IV, Ns), hashtype` ->|                                      |
//! |                                      |                                  |`K = MD5(verifier)`, decrypt `Ns`     |
//! |                                      |                                  |`Nc = ${0,1}^128` (as base64)         |
//! |                                      |                                  |`r = SHA-256(Ns ∥ Nc ∥ verifier)`     |
//! |                                      |                                  |`sk = MD5(Ns ∥ Nc ∥ K)`               |
//! |                                      |`r, E(K, IV, Nc), E(sk, 0, ctr)`<-|                                      |
//! |decrypt `Nc`, `sk = MD5(Ns ∥ Nc ∥ K)` |                                  |                                      |
//! |verify `r` (constant time)            |                                  |                                      |
//! |decrypt `ctr`                         | `E(sk, 0, ctr+1)` ->             | decrypt and check `ctr+1`            |
//!
//! Wire messages are ASCII `key=value;key=value` pairs with base64 values
//! ([`wire`]); nonces and counters travel NUL-terminated and zero-padded
//! inside the cipher ([`primitives::encrypt_cbc`]).
//!
//! # Usage
//!
//! ```ignore
//! use pps::{Exchange, Outcome};
//!
//! let mut exchange = Exchange::new(store, rand_core::OsRng);
//! let reply = match exchange.message(conn.recv()?) {
//!     Outcome::Continue(reply) => reply,
//!     _ => return deny(conn),
//! };
//! conn.send(reply)?;
//! match exchange.message(conn.recv()?) {
//!     Outcome::Ok(confirmation) => conn.send(confirmation)?,
//!     Outcome::BadAuth | Outcome::Fail => return deny(conn),
//!     Outcome::Continue(_) => unreachable!(),
//! }
//! ```
//!
//! # Security caveats
//!
//! The key- and session-key derivations use an MD5-based fast hash and are
//! fixed by the wire format. MD5 is acceptable here only as a derivation
//! over inputs that are already secret; evaluate whether that meets current
//! guidance before deploying this mechanism in a new system. The
//! `hashtype` tag exists so a stronger derivation can be introduced
//! without breaking the message format.

extern crate alloc;

/// Protocol constants: sizes, bounds and wire field names.
pub mod constants;

mod errors;
mod session;
mod store;
mod utils;

/// The two-step protocol engine.
pub mod engine;

/// Low-level digests and the block cipher, exposed for registration
/// tooling and interoperability testing.
pub mod primitives;

/// The `key=value;…` wire codec.
pub mod wire;

/// Message dispatch and session lifecycle.
pub mod driver;

pub use self::{
    driver::{Exchange, Outcome},
    errors::{Error, Result},
    session::{SessionContext, Step},
    store::CredentialStore,
};

/// Default exchange instantiation over the operating system RNG.
#[cfg(feature = "getrandom")]
pub type OsExchange<S> = Exchange<S, rand_core::OsRng>;
