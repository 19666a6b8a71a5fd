//! Wire codec for the `key=value;key=value` message format.
//!
//! Values are base64 in the standard alphabet unless a field is documented
//! as raw. All decode paths are bounds-checked: oversized input is rejected
//! with a parse error, never truncated.

use alloc::string::String;
use alloc::vec::Vec;
use base64ct::{Base64, Encoding};

use crate::constants::{FIELD_USERNAME, MAX_FIELD_LEN, MAX_MESSAGE_LEN, MAX_USERNAME_LEN};
use crate::errors::{Error, Result};

/// A parsed wire message: ordered `(name, value)` pairs borrowed from the
/// input. Unknown fields are retained but ignored by the protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message<'a> {
    fields: Vec<(&'a str, &'a str)>,
}

impl<'a> Message<'a> {
    /// Parse a message, splitting on `;` and on the first `=` within each
    /// segment. A segment without `=` or a message over the size bound is
    /// rejected.
    pub fn parse(input: &'a str) -> Result<Self> {
        if input.len() > MAX_MESSAGE_LEN {
            return Err(Error::Parse("message"));
        }
        let mut fields = Vec::new();
        for segment in input.split(';') {
            if segment.is_empty() {
                continue;
            }
            let (name, value) = segment.split_once('=').ok_or(Error::Parse("message"))?;
            fields.push((name, value));
        }
        Ok(Message { fields })
    }

    /// Look up the first occurrence of a field by name.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.fields
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    /// Look up a field that the current step requires.
    pub fn require(&self, name: &'static str) -> Result<&'a str> {
        self.get(name).ok_or(Error::Parse(name))
    }

    /// The parsed fields, in wire order.
    pub fn fields(&self) -> &[(&'a str, &'a str)] {
        &self.fields
    }
}

/// Serialize an ordered field list as `name=value;name=value`.
pub fn format(fields: &[(&str, &str)]) -> String {
    let mut out = String::new();
    for (i, (name, value)) in fields.iter().enumerate() {
        if i > 0 {
            out.push(';');
        }
        out.push_str(name);
        out.push('=');
        out.push_str(value);
    }
    out
}

/// Encode bytes with the standard base64 alphabet, with padding.
pub fn encode_base64(bytes: &[u8]) -> String {
    Base64::encode_string(bytes)
}

/// Decode a base64 field value, attributing failures to `field`.
///
/// Rejects invalid alphabet or padding and any decoded value longer than
/// [`MAX_FIELD_LEN`](crate::constants::MAX_FIELD_LEN).
pub fn decode_base64(field: &'static str, value: &str) -> Result<Vec<u8>> {
    if value.len() > MAX_FIELD_LEN.div_ceil(3) * 4 {
        return Err(Error::Parse(field));
    }
    let bytes = Base64::decode_vec(value).map_err(|_| Error::Parse(field))?;
    if bytes.len() > MAX_FIELD_LEN {
        return Err(Error::Parse(field));
    }
    Ok(bytes)
}

/// Extract the username from a step-1 message.
///
/// The field is accepted in either form: if the value is strict
/// standard-alphabet base64 and decodes to valid UTF-8 it is used decoded,
/// otherwise it is taken raw. Usernames over the length bound are rejected,
/// never truncated.
pub fn username_field(msg: &Message<'_>) -> Result<String> {
    let value = msg.require(FIELD_USERNAME)?;
    let username = match Base64::decode_vec(value) {
        Ok(decoded) => String::from_utf8(decoded).map_err(|_| Error::Parse(FIELD_USERNAME))?,
        Err(_) => String::from(value),
    };
    if username.is_empty() || username.len() > MAX_USERNAME_LEN {
        return Err(Error::Parse(FIELD_USERNAME));
    }
    Ok(username)
}
