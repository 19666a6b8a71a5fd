use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use aes::Aes128;
use hex_literal::hex;
use md5::{Digest, Md5};
use rand::rngs::OsRng;
use sha1::Sha1;
use sha2::Sha256;

use pps::constants::{
    FIELD_CHALLENGE, FIELD_HASHTYPE, FIELD_NONCE, FIELD_PEER_CHALLENGE, FIELD_RESPONSE, FIELD_SALT,
};
use pps::wire::{decode_base64, encode_base64, format, Message};
use pps::{CredentialStore, Exchange, Outcome};

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

const USERNAME: &str = "jlpicard_1701";
const PASSWORD: &[u8] = b"g04tEd_c4pT41N";
const SALT: [u8; 4] = hex!("01020304");

/// Credential store which can hold the material for one user.
struct SingleUserStore {
    username: Vec<u8>,
    salt: [u8; 4],
    verifier: Vec<u8>,
}

impl SingleUserStore {
    /// Register a user the way provisioning tooling would: store
    /// `salt ∥ SHA-1(secret)`.
    fn register(username: &str, password: &[u8], salt: [u8; 4]) -> Self {
        let mut verifier = salt.to_vec();
        verifier.extend_from_slice(&Sha1::digest(password));
        SingleUserStore {
            username: username.as_bytes().to_vec(),
            salt,
            verifier,
        }
    }
}

impl CredentialStore for SingleUserStore {
    fn lookup(&self, username: &[u8]) -> Option<([u8; 4], Vec<u8>)> {
        (username == self.username).then(|| (self.salt, self.verifier.clone()))
    }
}

/// All the values a correctly behaving client derives during one exchange,
/// computed here independently of the crate's own primitives.
struct Client {
    verifier: Vec<u8>,
    key: [u8; 16],
    iv: [u8; 16],
    server_nonce: String,
    peer_nonce: String,
    session_key: [u8; 16],
}

impl Client {
    /// Digest the server's step-1 reply and fix a peer nonce.
    fn from_step1_reply(password: &[u8], reply: &str, peer_nonce: &str) -> Self {
        let msg = Message::parse(reply).unwrap();
        let salt = decode_base64(FIELD_SALT, msg.get(FIELD_SALT).unwrap()).unwrap();
        assert_eq!(msg.get(FIELD_HASHTYPE), Some("1"));

        let mut verifier = salt.clone();
        verifier.extend_from_slice(&Sha1::digest(password));
        let key: [u8; 16] = Md5::digest(&verifier).into();
        let mut iv = [0u8; 16];
        iv[..4].copy_from_slice(&salt);
        iv[4..].copy_from_slice(&key[..12]);

        let challenge = decode_base64(FIELD_CHALLENGE, msg.get(FIELD_CHALLENGE).unwrap()).unwrap();
        let server_nonce = open(&key, &iv, &challenge);

        let mut ikm = server_nonce.as_bytes().to_vec();
        ikm.extend_from_slice(peer_nonce.as_bytes());
        ikm.extend_from_slice(&key);
        let session_key: [u8; 16] = Md5::digest(&ikm).into();

        Client {
            verifier,
            key,
            iv,
            server_nonce,
            peer_nonce: peer_nonce.to_string(),
            session_key,
        }
    }

    /// The transcript-binding response the server expects.
    fn response(&self) -> [u8; 32] {
        let mut transcript = self.server_nonce.as_bytes().to_vec();
        transcript.extend_from_slice(self.peer_nonce.as_bytes());
        transcript.extend_from_slice(&self.verifier);
        Sha256::digest(&transcript).into()
    }

    /// Build the step-2 request around a given response value and counter.
    fn step2_request(&self, response: &[u8], counter: u32) -> String {
        let peer_challenge = seal(&self.key, &self.iv, self.peer_nonce.as_bytes());
        let counter_ct = seal(&self.session_key, &[0u8; 16], counter.to_string().as_bytes());
        format(&[
            (FIELD_RESPONSE, &encode_base64(response)),
            (FIELD_PEER_CHALLENGE, &encode_base64(&peer_challenge)),
            (FIELD_NONCE, &encode_base64(&counter_ct)),
        ])
    }

    /// Decrypt the confirmation counter out of the server's step-2 reply.
    fn confirmation(&self, reply: &str) -> u32 {
        let msg = Message::parse(reply).unwrap();
        let ct = decode_base64(FIELD_NONCE, msg.get(FIELD_NONCE).unwrap()).unwrap();
        open(&self.session_key, &[0u8; 16], &ct).parse().unwrap()
    }
}

/// Zero-pad, NUL-terminate and encrypt a printable value.
fn seal(key: &[u8; 16], iv: &[u8; 16], value: &[u8]) -> Vec<u8> {
    let mut buf = value.to_vec();
    buf.push(0);
    while buf.len() % 16 != 0 {
        buf.push(0);
    }
    let len = buf.len();
    Aes128CbcEnc::new(key.into(), iv.into())
        .encrypt_padded_mut::<NoPadding>(&mut buf, len)
        .unwrap();
    buf
}

/// Decrypt and cut at the NUL terminator.
fn open(key: &[u8; 16], iv: &[u8; 16], ciphertext: &[u8]) -> String {
    let plaintext = Aes128CbcDec::new(key.into(), iv.into())
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .unwrap();
    let end = plaintext.iter().position(|&b| b == 0).unwrap();
    String::from_utf8(plaintext[..end].to_vec()).unwrap()
}

fn new_exchange() -> Exchange<SingleUserStore, OsRng> {
    let store = SingleUserStore::register(USERNAME, PASSWORD, SALT);
    Exchange::new(store, OsRng)
}

/// Run step 1 and return the client's view of the exchange.
fn run_step1(exchange: &mut Exchange<SingleUserStore, OsRng>, peer_nonce: &str) -> Client {
    let request = format!("username={USERNAME}");
    let reply = match exchange.message(&request) {
        Outcome::Continue(reply) => reply,
        other => panic!("step 1 did not continue: {other:?}"),
    };
    Client::from_step1_reply(PASSWORD, &reply, peer_nonce)
}

const PEER_NONCE: &str = "c29tZSBjbGllbnQgbm9uY2U="; // any printable base64 string

#[test]
fn full_exchange_succeeds_and_confirms_counter() {
    let mut exchange = new_exchange();
    let client = run_step1(&mut exchange, PEER_NONCE);

    let request = client.step2_request(&client.response(), 41);
    let reply = match exchange.message(&request) {
        Outcome::Ok(reply) => reply,
        other => panic!("step 2 did not succeed: {other:?}"),
    };
    assert_eq!(client.confirmation(&reply), 42);

    // The server derived the same session key, independently re-derived here.
    let server_key = exchange.context().unwrap().session_key().unwrap();
    assert_eq!(server_key, &client.session_key);
}

#[test]
fn base64_encoded_username_is_accepted() {
    let mut exchange = new_exchange();
    let request = format!("username={}", encode_base64(USERNAME.as_bytes()));
    assert!(matches!(exchange.message(&request), Outcome::Continue(_)));
}

#[test]
fn server_nonce_is_fresh_per_exchange() {
    let challenge_of = |reply: &str| {
        Message::parse(reply)
            .unwrap()
            .get(FIELD_CHALLENGE)
            .unwrap()
            .to_string()
    };
    let mut first = new_exchange();
    let mut second = new_exchange();
    let request = format!("username={USERNAME}");
    let (a, b) = match (first.message(&request), second.message(&request)) {
        (Outcome::Continue(a), Outcome::Continue(b)) => (challenge_of(&a), challenge_of(&b)),
        other => panic!("step 1 did not continue: {other:?}"),
    };
    assert_ne!(a, b, "two exchanges encrypted an identical server nonce");
}

#[test]
fn any_single_bit_flip_in_the_response_is_rejected() {
    for byte in 0..32 {
        for bit in 0..8 {
            let mut exchange = new_exchange();
            let client = run_step1(&mut exchange, PEER_NONCE);
            let mut response = client.response();
            response[byte] ^= 1 << bit;
            let request = client.step2_request(&response, 7);
            assert_eq!(
                exchange.message(&request),
                Outcome::BadAuth,
                "flip of byte {byte} bit {bit} was not rejected"
            );
            assert!(exchange.context().is_none(), "failed session not destroyed");
        }
    }
}

#[test]
fn replay_counter_wraps_at_u32_max() {
    let mut exchange = new_exchange();
    let client = run_step1(&mut exchange, PEER_NONCE);
    let request = client.step2_request(&client.response(), u32::MAX);
    let reply = match exchange.message(&request) {
        Outcome::Ok(reply) => reply,
        other => panic!("step 2 did not succeed: {other:?}"),
    };
    assert_eq!(client.confirmation(&reply), 0);
}

#[test]
fn unknown_user_fails_without_reaching_authentication() {
    let mut exchange = new_exchange();
    assert_eq!(exchange.message("username=q"), Outcome::Fail);
    assert!(exchange.context().is_none());
}

#[test]
fn malformed_first_message_fails() {
    let mut exchange = new_exchange();
    assert_eq!(exchange.message("no separators here"), Outcome::Fail);
}

#[test]
fn message_after_completion_fails() {
    let mut exchange = new_exchange();
    let client = run_step1(&mut exchange, PEER_NONCE);
    let request = client.step2_request(&client.response(), 1);
    assert!(matches!(exchange.message(&request), Outcome::Ok(_)));
    assert_eq!(exchange.message(&request), Outcome::Fail);
}

#[test]
fn rejected_exchange_can_restart_from_scratch() {
    let mut exchange = new_exchange();
    let client = run_step1(&mut exchange, PEER_NONCE);
    let mut response = client.response();
    response[0] ^= 0x80;
    assert_eq!(
        exchange.message(&client.step2_request(&response, 1)),
        Outcome::BadAuth
    );

    // A brand-new session over the same driver succeeds.
    let client = run_step1(&mut exchange, PEER_NONCE);
    let request = client.step2_request(&client.response(), 1);
    assert!(matches!(exchange.message(&request), Outcome::Ok(_)));
}

#[test]
fn abort_destroys_the_session() {
    let mut exchange = new_exchange();
    let client = run_step1(&mut exchange, PEER_NONCE);
    exchange.abort();
    assert!(exchange.context().is_none());

    // The old client view is now useless: its step-2 request starts a new
    // exchange, which has no username field and fails cleanly.
    let request = client.step2_request(&client.response(), 1);
    assert_eq!(exchange.message(&request), Outcome::Fail);
}

#[test]
fn stale_response_from_another_transcript_is_rejected() {
    // Capture a valid response for one transcript.
    let mut exchange = new_exchange();
    let client = run_step1(&mut exchange, PEER_NONCE);
    let captured = client.response();
    exchange.abort();

    // Replaying it against a fresh transcript must fail: the binding digest
    // covers the fresh server nonce.
    let mut exchange = new_exchange();
    let client = run_step1(&mut exchange, PEER_NONCE);
    let request = client.step2_request(&captured, 1);
    assert_eq!(exchange.message(&request), Outcome::BadAuth);
}
