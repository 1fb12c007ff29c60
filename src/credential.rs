//! Fixed-length numeric credential.

use core::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::PASS_LEN;

/// Exactly `PASS_LEN` digit values, one per byte (0..=9 when captured from
/// the keypad; received bytes are kept raw).
///
/// The digits are wiped when the value is dropped and never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Credential([u8; PASS_LEN]);

impl Credential {
    /// The value a never-provisioned store reads as.
    pub const BLANK: [u8; PASS_LEN] = [0; PASS_LEN];

    pub const fn new(digits: [u8; PASS_LEN]) -> Self {
        Self(digits)
    }

    pub const fn blank() -> Self {
        Self(Self::BLANK)
    }

    pub fn digits(&self) -> &[u8; PASS_LEN] {
        &self.0
    }

    /// Exact byte-for-byte comparison. Visits every digit regardless of
    /// where the first difference is.
    pub fn matches(&self, other: &Credential) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    pub fn is_blank(&self) -> bool {
        self.matches(&Self::blank())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(")?;
        for _ in 0..PASS_LEN {
            f.write_str("*")?;
        }
        f.write_str(")")
    }
}
