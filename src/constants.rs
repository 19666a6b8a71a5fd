//! Protocol constants: primitive output sizes, wire bounds and field names.

/// Length of the random salt stored alongside the verifier digest.
pub const SALT_LEN: usize = 4;

/// Output length of the fast key-derivation hash.
pub const FAST_HASH_LEN: usize = 16;

/// Output length of the digest embedded in the stored verifier.
pub const VERIFY_DIGEST_LEN: usize = 20;

/// Output length of the transcript-binding digest.
pub const BIND_DIGEST_LEN: usize = 32;

/// Length of a stored salted verifier: salt followed by the verifier digest.
pub const VERIFIER_LEN: usize = SALT_LEN + VERIFY_DIGEST_LEN;

/// Block length of the cipher used for challenges and confirmations.
pub const BLOCK_LEN: usize = 16;

/// Number of random bytes behind the printable server nonce.
pub const SERVER_NONCE_LEN: usize = 16;

/// Tag identifying the hash family used for key derivation, sent to the
/// client in the step-1 reply so future derivations can coexist on the wire.
pub const HASH_TYPE: u32 = 1;

/// Maximum accepted username length in bytes, after base64 decoding.
pub const MAX_USERNAME_LEN: usize = 255;

/// Maximum accepted plaintext nonce length in bytes, after decryption.
pub const MAX_NONCE_LEN: usize = 64;

/// Maximum decoded length of any base64 wire field.
pub const MAX_FIELD_LEN: usize = 256;

/// Maximum accepted length of a whole wire message.
pub const MAX_MESSAGE_LEN: usize = 4096;

/// Wire field: username, raw or base64-encoded.
pub const FIELD_USERNAME: &str = "username";

/// Wire field: directory-assigned identity alias, overrides the lookup key.
pub const FIELD_USERID: &str = "userid";

/// Wire field: base64 salt (step-1 reply).
pub const FIELD_SALT: &str = "salt";

/// Wire field: base64 encrypted server nonce (step-1 reply).
pub const FIELD_CHALLENGE: &str = "challenge";

/// Wire field: decimal hash-family tag (step-1 reply).
pub const FIELD_HASHTYPE: &str = "hashtype";

/// Wire field: base64 transcript-binding response (step-2 request).
pub const FIELD_RESPONSE: &str = "response";

/// Wire field: base64 encrypted peer nonce (step-2 request).
pub const FIELD_PEER_CHALLENGE: &str = "peerchallenge";

/// Wire field: base64 encrypted replay counter (step-2 request and reply).
pub const FIELD_NONCE: &str = "nonce";
