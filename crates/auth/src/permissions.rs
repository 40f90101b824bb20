use core::ops::BitOr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single requested action.
///
/// Each variant is exactly one bit of a [`PermissionMask`], so a request can
/// never ask for a composite of several actions at once.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    /// The bit this action occupies in a permission mask.
    pub const fn bit(self) -> u8 {
        match self {
            Action::Create => 8,
            Action::Read => 4,
            Action::Update => 2,
            Action::Delete => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Action {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Action::Create),
            "read" => Ok(Action::Read),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            other => Err(PermissionError::UnknownAction(other.to_string())),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PermissionError {
    #[error("permission mask out of range: {0} (expected 0..=15)")]
    OutOfRange(u8),

    #[error("unknown action '{0}'")]
    UnknownAction(String),
}

/// 4-bit permission set over {create, read, update, delete}.
///
/// Bit layout is fixed: `CREATE=8, READ=4, UPDATE=2, DELETE=1`. Values above
/// `0xF` cannot be constructed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PermissionMask(u8);

impl PermissionMask {
    pub const NONE: PermissionMask = PermissionMask(0);
    pub const CREATE: PermissionMask = PermissionMask(8);
    pub const READ: PermissionMask = PermissionMask(4);
    pub const UPDATE: PermissionMask = PermissionMask(2);
    pub const DELETE: PermissionMask = PermissionMask(1);
    pub const FULL: PermissionMask = PermissionMask(0xF);

    pub fn new(bits: u8) -> Result<Self, PermissionError> {
        if bits > 0xF {
            return Err(PermissionError::OutOfRange(bits));
        }
        Ok(Self(bits))
    }

    /// Decode a single hexadecimal character (`0`-`9`, `a`-`f`, `A`-`F`).
    pub fn from_hex_digit(c: char) -> Option<Self> {
        c.to_digit(16).map(|d| Self(d as u8))
    }

    /// Lower-case hexadecimal form, as stored in override strings.
    pub fn to_hex_digit(self) -> char {
        char::from_digit(u32::from(self.0), 16).unwrap_or('0')
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// `(mask & action) == action`.
    pub fn allows(self, action: Action) -> bool {
        self.0 & action.bit() == action.bit()
    }

    /// The actions this mask grants, in bit order (create first).
    pub fn actions(self) -> impl Iterator<Item = Action> {
        Action::ALL.into_iter().filter(move |a| self.allows(*a))
    }
}

impl From<Action> for PermissionMask {
    fn from(action: Action) -> Self {
        Self(action.bit())
    }
}

impl TryFrom<u8> for PermissionMask {
    type Error = PermissionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PermissionMask> for u8 {
    fn from(value: PermissionMask) -> Self {
        value.0
    }
}

impl BitOr for PermissionMask {
    type Output = PermissionMask;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOr<Action> for PermissionMask {
    type Output = PermissionMask;

    fn bitor(self, rhs: Action) -> Self::Output {
        Self(self.0 | rhs.bit())
    }
}

impl core::fmt::Display for PermissionMask {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:04b}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn read_update_mask_grants_exactly_read_and_update() {
        let mask = PermissionMask::READ | PermissionMask::UPDATE;
        assert_eq!(mask.bits(), 6);
        assert!(mask.allows(Action::Read));
        assert!(mask.allows(Action::Update));
        assert!(!mask.allows(Action::Create));
        assert!(!mask.allows(Action::Delete));
        assert_eq!(mask.actions().collect::<Vec<_>>(), vec![Action::Read, Action::Update]);
    }

    #[test]
    fn masks_above_fifteen_are_rejected() {
        assert_eq!(PermissionMask::new(16), Err(PermissionError::OutOfRange(16)));
        assert!(serde_json::from_str::<PermissionMask>("42").is_err());
        assert_eq!(serde_json::from_str::<PermissionMask>("15").unwrap(), PermissionMask::FULL);
    }

    #[test]
    fn hex_digits_decode_in_either_case() {
        assert_eq!(PermissionMask::from_hex_digit('F'), Some(PermissionMask::FULL));
        assert_eq!(PermissionMask::from_hex_digit('f'), Some(PermissionMask::FULL));
        assert_eq!(PermissionMask::from_hex_digit('6').map(|m| m.bits()), Some(6));
        assert_eq!(PermissionMask::from_hex_digit('g'), None);
        assert_eq!(PermissionMask::FULL.to_hex_digit(), 'f');
    }

    #[test]
    fn action_names_parse() {
        for action in Action::ALL {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
        assert!("write".parse::<Action>().is_err());
    }

    proptest! {
        #[test]
        fn empty_mask_allows_nothing_and_full_mask_allows_everything(idx in 0usize..4) {
            let action = Action::ALL[idx];
            prop_assert!(!PermissionMask::NONE.allows(action));
            prop_assert!(PermissionMask::FULL.allows(action));
        }

        #[test]
        fn hex_digit_round_trips_for_every_valid_mask(bits in 0u8..=15) {
            let mask = PermissionMask::new(bits).unwrap();
            prop_assert_eq!(PermissionMask::from_hex_digit(mask.to_hex_digit()), Some(mask));
        }
    }
}
