//! Content fingerprints and platform tags.
//!
//! The fingerprint is a 31-multiplier rolling hash over the UTF-16 code units
//! of `title + body`, wrapped to 32-bit signed arithmetic and rendered as the
//! base-36 magnitude. Browser surfaces compute the same value for the same
//! text, so a tag derived here matches one rendered by a page or worker.

use std::fmt;

use serde::{Deserialize, Serialize};

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Short deterministic token derived from notification text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fingerprint of a notification's title and body.
pub fn fingerprint(title: &str, body: &str) -> Fingerprint {
    let hash = title
        .encode_utf16()
        .chain(body.encode_utf16())
        .fold(0i32, |hash, unit| {
            hash.wrapping_shl(5)
                .wrapping_sub(hash)
                .wrapping_add(i32::from(unit))
        });

    Fingerprint(to_base36(hash.unsigned_abs()))
}

fn to_base36(mut value: u32) -> String {
    if value == 0 {
        return "0".to_string();
    }

    let mut digits = Vec::with_capacity(7);
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    digits.into_iter().map(char::from).collect()
}

/// Platform notification tag: `<prefix>-<fingerprint>`.
///
/// The same tag is used for claims, broadcast announcements, and the rendered
/// notification itself, so the platform's "same tag replaces" rule acts as a
/// second layer of suppression.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    value: String,
    fingerprint: Fingerprint,
}

impl Tag {
    pub fn new(prefix: &str, fingerprint: Fingerprint) -> Self {
        Self {
            value: format!("{}-{}", prefix, fingerprint),
            fingerprint,
        }
    }

    /// Tag for a title/body pair.
    pub fn derive(prefix: &str, title: &str, body: &str) -> Self {
        Self::new(prefix, fingerprint(title, body))
    }

    /// Recover a tag announced by another surface.
    ///
    /// Returns `None` for a foreign prefix or a malformed fingerprint.
    pub fn parse(prefix: &str, raw: &str) -> Option<Self> {
        let token = raw.strip_prefix(prefix)?.strip_prefix('-')?;
        if token.is_empty()
            || !token
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
        {
            return None;
        }

        Some(Self::new(prefix, Fingerprint(token.to_string())))
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
