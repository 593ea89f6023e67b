//! Canonical message construction and HMAC-SHA256 signing.
//!
//! The signed message is `timestamp + "\n" + nonce + "\n" + body`, built from the
//! header values exactly as received. Re-serializing the timestamp or trimming the
//! nonce would break verification for a legitimate sender.

use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD};
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::constants::SIGNATURE_LEN;
use crate::security::signature_eq;

type HmacSha256 = Hmac<Sha256>;

/// How a provided signature header value is decoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureEncoding {
    /// Standard Base64, padded or unpadded. Canonical output format.
    Base64,
    /// Hexadecimal, either case.
    Hex,
    /// Decide by shape: 64 hex digits are hex, anything else is Base64.
    ///
    /// The shapes cannot collide for a 32-byte tag: Base64 of 32 bytes is 43 or 44
    /// characters, and 64 characters of Base64 decode to 48 bytes.
    #[default]
    Auto,
}

impl std::str::FromStr for SignatureEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base64" => Ok(Self::Base64),
            "hex" => Ok(Self::Hex),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown signature encoding '{other}'")),
        }
    }
}

/// Build the canonical byte sequence that the sender signed.
pub fn canonical_message(timestamp: &str, nonce: &str, body: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(timestamp.len() + nonce.len() + body.len() + 2);
    message.extend_from_slice(timestamp.as_bytes());
    message.push(b'\n');
    message.extend_from_slice(nonce.as_bytes());
    message.push(b'\n');
    message.extend_from_slice(body);
    message
}

/// Compute HMAC-SHA256 over the canonical message.
pub fn sign(secret: &[u8], timestamp: &str, nonce: &str, body: &[u8]) -> [u8; SIGNATURE_LEN] {
    let mut mac = new_mac(secret);
    // Streamed in pieces; identical to hashing `canonical_message(..)`.
    mac.update(timestamp.as_bytes());
    mac.update(b"\n");
    mac.update(nonce.as_bytes());
    mac.update(b"\n");
    mac.update(body);
    let mut tag = [0u8; SIGNATURE_LEN];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    tag
}

/// Signature as a sender attaches it: standard padded Base64.
pub fn sign_base64(secret: &[u8], timestamp: &str, nonce: &str, body: &[u8]) -> String {
    STANDARD.encode(sign(secret, timestamp, nonce, body))
}

/// Signature as lowercase hex, for senders configured with hex output.
pub fn sign_hex(secret: &[u8], timestamp: &str, nonce: &str, body: &[u8]) -> String {
    hex::encode(sign(secret, timestamp, nonce, body))
}

/// Decode a provided signature header value under the given policy.
///
/// Returns `None` for anything that is not well-formed in the accepted encodings.
/// The length of the decoded bytes is not checked here.
pub fn decode_signature(provided: &str, encoding: SignatureEncoding) -> Option<Vec<u8>> {
    match encoding {
        SignatureEncoding::Base64 => decode_base64(provided),
        SignatureEncoding::Hex => hex::decode(provided).ok(),
        SignatureEncoding::Auto => {
            if provided.len() == SIGNATURE_LEN * 2
                && provided.bytes().all(|b| b.is_ascii_hexdigit())
            {
                hex::decode(provided).ok()
            } else {
                decode_base64(provided)
            }
        }
    }
}

/// Recompute the expected tag and compare it to the provided signature.
///
/// The MAC is always computed, even when the provided value fails to decode, and the
/// comparison runs in constant time over the decoded bytes.
pub fn verify_signature(
    secret: &[u8],
    timestamp: &str,
    nonce: &str,
    body: &[u8],
    provided: &str,
    encoding: SignatureEncoding,
) -> bool {
    let expected = sign(secret, timestamp, nonce, body);
    let decoded = decode_signature(provided, encoding).unwrap_or_default();
    signature_eq(&expected, &decoded)
}

fn new_mac(secret: &[u8]) -> HmacSha256 {
    // HMAC is defined for keys of every length, so this cannot fail.
    match HmacSha256::new_from_slice(secret) {
        Ok(mac) => mac,
        Err(_) => unreachable!("HMAC-SHA256 accepts keys of any length"),
    }
}

fn decode_base64(s: &str) -> Option<Vec<u8>> {
    STANDARD
        .decode(s)
        .or_else(|_| STANDARD_NO_PAD.decode(s))
        .ok()
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().fold(String::new(), |mut s, b| {
            use std::fmt::Write;
            let _ = write!(s, "{b:02x}");
            s
        })
    }

    pub fn decode(s: &str) -> Result<Vec<u8>, ()> {
        if s.len() % 2 != 0 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(());
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| ()))
            .collect()
    }
}
