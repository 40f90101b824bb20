//! Per-identity permission overrides.
//!
//! Stored form is `"<resource-domain>:<hex-nibble>"`, e.g. `"inventory:products:f"`.
//! The domain is everything before the last `:`; the nibble is one hexadecimal
//! character decoding to a [`PermissionMask`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{PermissionMask, ResourceDomain};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OverrideError {
    #[error("malformed override '{0}' (expected '<domain>:<hex digit>')")]
    Malformed(String),

    #[error("override '{0}' names an unknown resource domain")]
    UnknownDomain(String),

    #[error("override '{0}' does not end in a single hexadecimal digit")]
    InvalidMask(String),

    #[error("more than one override for resource domain '{0}'")]
    Duplicate(ResourceDomain),
}

/// A decoded override: an absolute mask for one resource domain.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Override {
    pub domain: ResourceDomain,
    pub mask: PermissionMask,
}

impl Override {
    pub fn new(domain: ResourceDomain, mask: PermissionMask) -> Self {
        Self { domain, mask }
    }
}

impl core::fmt::Display for Override {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}:{}", self.domain, self.mask.to_hex_digit())
    }
}

impl core::str::FromStr for Override {
    type Err = OverrideError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (domain, nibble) = split(s).ok_or_else(|| OverrideError::Malformed(s.to_string()))?;
        let domain: ResourceDomain = domain
            .parse()
            .map_err(|_| OverrideError::UnknownDomain(s.to_string()))?;
        let mask = decode_nibble(nibble).ok_or_else(|| OverrideError::InvalidMask(s.to_string()))?;
        Ok(Self { domain, mask })
    }
}

fn split(raw: &str) -> Option<(&str, &str)> {
    raw.rsplit_once(':')
}

fn decode_nibble(nibble: &str) -> Option<PermissionMask> {
    let mut chars = nibble.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => PermissionMask::from_hex_digit(c),
        _ => None,
    }
}

/// Find the override mask an identity carries for `domain`.
///
/// The first entry whose domain part equals `domain` decides. If that entry's
/// nibble does not decode, the result is `None` (no override) rather than an
/// error; role defaults then apply.
pub fn find_override<S: AsRef<str>>(overrides: &[S], domain: ResourceDomain) -> Option<PermissionMask> {
    overrides
        .iter()
        .filter_map(|raw| split(raw.as_ref()))
        .find(|(d, _)| *d == domain.as_str())
        .and_then(|(_, nibble)| decode_nibble(nibble))
}

/// Validated override list, as accepted at write time.
///
/// Rejects malformed strings and more than one override for the same domain,
/// so that stored data never depends on first-match precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct OverrideSet(Vec<Override>);

impl OverrideSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse<S: AsRef<str>>(raw: &[S]) -> Result<Self, OverrideError> {
        let mut seen = HashSet::new();
        let mut overrides = Vec::with_capacity(raw.len());
        for s in raw {
            let parsed: Override = s.as_ref().parse()?;
            if !seen.insert(parsed.domain) {
                return Err(OverrideError::Duplicate(parsed.domain));
            }
            overrides.push(parsed);
        }
        Ok(Self(overrides))
    }

    /// Insert or replace the override for `entry.domain`.
    pub fn set(&mut self, entry: Override) {
        match self.0.iter_mut().find(|o| o.domain == entry.domain) {
            Some(existing) => existing.mask = entry.mask,
            None => self.0.push(entry),
        }
    }

    pub fn remove(&mut self, domain: ResourceDomain) -> Option<Override> {
        let idx = self.0.iter().position(|o| o.domain == domain)?;
        Some(self.0.remove(idx))
    }

    pub fn get(&self, domain: ResourceDomain) -> Option<PermissionMask> {
        self.0.iter().find(|o| o.domain == domain).map(|o| o.mask)
    }

    /// Stored string form, in insertion order.
    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl TryFrom<Vec<String>> for OverrideSet {
    type Error = OverrideError;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OverrideSet> for Vec<String> {
    fn from(value: OverrideSet) -> Self {
        value.to_strings()
    }
}
