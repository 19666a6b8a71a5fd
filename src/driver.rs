//! Message dispatcher and session lifecycle.
//!
//! [`Exchange`] is the byte-in/byte-out surface a transport hands messages
//! to. It routes each message to the step matching the session's current
//! position, performs the credential-store lookup for the first message,
//! and owns the [`SessionContext`] so that secret material is destroyed on
//! every exit path, including abandonment.
//!
//! Error categories are surfaced through the [`log`] facade for local
//! telemetry, while the returned [`Outcome`] stays category-free: the
//! embedding service can answer a failed client uniformly without building
//! an error oracle.

use alloc::string::String;
use log::{debug, warn};
use rand_core::CryptoRngCore;
use zeroize::Zeroize;

use crate::engine;
use crate::errors::Error;
use crate::session::{SessionContext, Step};
use crate::store::CredentialStore;
use crate::wire::{username_field, Message};

/// Result of feeding one wire message to an [`Exchange`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Step 1 succeeded; send the contained reply and await step 2.
    Continue(String),
    /// Step 2 succeeded; send the contained confirmation reply.
    Ok(String),
    /// Parse, protocol or configuration failure. The session is destroyed;
    /// the client must start over.
    Fail,
    /// The transcript-binding check failed. The session is destroyed.
    /// Deliberately indistinguishable from a tampered transcript.
    BadAuth,
}

/// Drives one authentication exchange from raw wire messages.
pub struct Exchange<S, CSPRNG>
where
    S: CredentialStore,
    CSPRNG: CryptoRngCore,
{
    store: S,
    rng: CSPRNG,
    ctx: Option<SessionContext>,
}

impl<S, CSPRNG> Exchange<S, CSPRNG>
where
    S: CredentialStore,
    CSPRNG: CryptoRngCore,
{
    /// Create a dispatcher over a credential store and a CSPRNG.
    pub fn new(store: S, rng: CSPRNG) -> Self {
        Exchange {
            store,
            rng,
            ctx: None,
        }
    }

    /// Feed one wire message to the exchange.
    ///
    /// The first message runs step 1 (after looking the claimed user up in
    /// the store); the second runs step 2. Anything after that, and any
    /// failure, destroys the session.
    pub fn message(&mut self, input: &str) -> Outcome {
        let step = match &self.ctx {
            None => Step::Init,
            Some(ctx) => ctx.step(),
        };
        match step {
            Step::Init => self.first_message(input),
            Step::AwaitingResponse => self.second_message(input),
            Step::Complete | Step::Failed => {
                warn!("message received for finished exchange");
                self.ctx = None;
                Outcome::Fail
            }
        }
    }

    /// Abandon the exchange, destroying the session and its secrets.
    pub fn abort(&mut self) {
        self.ctx = None;
    }

    /// The session behind this exchange, while one exists.
    ///
    /// After [`Outcome::Ok`] this is the completed session; the embedding
    /// service reads the session key from here if it wants to protect the
    /// subsequent channel.
    pub fn context(&self) -> Option<&SessionContext> {
        self.ctx.as_ref()
    }

    fn first_message(&mut self, input: &str) -> Outcome {
        let mut ctx = match self.lookup(input) {
            Ok(ctx) => ctx,
            Err(e) => return self.reject(e),
        };
        match engine::step1(&mut ctx, &mut self.rng, input) {
            Ok(reply) => {
                self.ctx = Some(ctx);
                Outcome::Continue(reply)
            }
            Err(e) => self.reject(e),
        }
    }

    fn second_message(&mut self, input: &str) -> Outcome {
        // Step routing above guarantees a live context here.
        let Some(ctx) = self.ctx.as_mut() else {
            return self.reject(Error::Protocol);
        };
        match engine::step2(ctx, input) {
            Ok(reply) => Outcome::Ok(reply),
            Err(e) => self.reject(e),
        }
    }

    /// Peek the claimed identity out of the first message and build a
    /// session from the stored credential material.
    fn lookup(&self, input: &str) -> Result<SessionContext, Error> {
        let msg = Message::parse(input)?;
        let username = username_field(&msg)?;
        // A directory-assigned identity alias overrides the lookup key.
        let key = msg.get(crate::constants::FIELD_USERID).unwrap_or(&username);
        let (salt, mut verifier) = self
            .store
            .lookup(key.as_bytes())
            .ok_or_else(|| Error::Config(String::from("unknown user")))?;
        let ctx = SessionContext::new(salt, &verifier);
        verifier.zeroize();
        ctx
    }

    /// Destroy the session and translate an error to its outcome,
    /// surfacing the category to telemetry only.
    fn reject(&mut self, e: Error) -> Outcome {
        self.ctx = None;
        match e {
            Error::AuthMismatch => {
                debug!("exchange rejected: {e}");
                Outcome::BadAuth
            }
            _ => {
                warn!("exchange failed: {e}");
                Outcome::Fail
            }
        }
    }
}
