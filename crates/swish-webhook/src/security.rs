//! Constant-time comparison helpers.
//!
//! Both helpers are built on `subtle::ConstantTimeEq`; nothing in this crate
//! compares secret material with `==`.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::constants::SIGNATURE_LEN;

/// Compare a freshly computed HMAC tag against decoded signature bytes.
///
/// A length mismatch fails immediately: the tag length is public, the content is not.
/// Equal-length inputs are compared without data-dependent branches.
pub fn signature_eq(expected: &[u8; SIGNATURE_LEN], provided: &[u8]) -> bool {
    if provided.len() != SIGNATURE_LEN {
        return false;
    }
    expected.as_slice().ct_eq(provided).into()
}

/// Constant-time comparison of two opaque secrets of arbitrary length.
///
/// Both inputs are hashed to fixed-length SHA-256 digests first, so timing reveals
/// neither content nor length. Used for bearer tokens where the caller controls
/// the length of the provided value.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let ha = Sha256::digest(a);
    let hb = Sha256::digest(b);
    ha.ct_eq(&hb).into()
}
