use alloc::string::String;
use core::{error, fmt};

/// Errors that can occur during the exchange.
///
/// Every variant aborts the current exchange; none is recovered from
/// transparently. Callers forwarding a failure to the remote client should
/// send a uniform rejection rather than the variant itself, so that the
/// client cannot distinguish a parse failure from a credential mismatch.
#[non_exhaustive]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A wire field was missing, malformed, out of bounds or failed base64
    /// decoding. Carries the name of the offending field.
    Parse(&'static str),
    /// A step was invoked out of sequence for the session's current state.
    Protocol,
    /// Credential material supplied by the store was absent or had an
    /// inconsistent length. Distinct from [`Error::AuthMismatch`] so that
    /// telemetry can tell a broken store from a wrong credential.
    Config(String),
    /// A ciphertext had an invalid length or decrypted to garbage.
    Crypto,
    /// The transcript-binding response did not match the expected value.
    AuthMismatch,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Parse(field) => write!(f, "malformed or missing '{field}' field"),
            Error::Protocol => f.write_str("step invoked out of sequence"),
            Error::Config(what) => write!(f, "invalid credential material: {what}"),
            Error::Crypto => f.write_str("cipher operation failed"),
            Error::AuthMismatch => f.write_str("authentication failed"),
        }
    }
}

impl error::Error for Error {}

/// Result type for the whole crate.
pub type Result<T> = core::result::Result<T, Error>;
