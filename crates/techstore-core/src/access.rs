//! # Access Levels
//!
//! Maps the numeric role id stored on a user to one of three coarse tiers.
//!
//! ```text
//! ┌──────────┬─────────┬────────────────────────────────────────────────────┐
//! │ role_id  │ level   │ may                                                │
//! ├──────────┼─────────┼────────────────────────────────────────────────────┤
//! │ 1        │ Level1  │ everything, incl. users and the session log        │
//! │ 2        │ Level2  │ catalogs, clients, sales, credits (no user admin)  │
//! │ 3        │ Level3  │ read catalogs and reports                          │
//! │ other    │ ✗       │ rejected: CoreError::UnknownRole                   │
//! └──────────┴─────────┴────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};

/// Role id of the administrator tier.
pub const ROLE_ADMIN_ID: i64 = 1;
/// Role id of the operator tier.
pub const ROLE_OPERATOR_ID: i64 = 2;
/// Role id of the occasional (read-only) tier.
pub const ROLE_OCCASIONAL_ID: i64 = 3;

/// Access tier of an authenticated user.
///
/// Variants are declared from most to least privileged, so `Ord` compares
/// privilege: `Level1 < Level2` means Level1 is *more* privileged. Use
/// [`AccessLevel::at_least`] rather than raw comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    Level1,
    Level2,
    Level3,
}

impl AccessLevel {
    /// Resolves a stored role id.
    ///
    /// ## Example
    /// ```rust
    /// use techstore_core::AccessLevel;
    ///
    /// assert_eq!(AccessLevel::from_role_id(2).unwrap(), AccessLevel::Level2);
    /// assert!(AccessLevel::from_role_id(9).is_err());
    /// ```
    pub fn from_role_id(role_id: i64) -> CoreResult<Self> {
        match role_id {
            ROLE_ADMIN_ID => Ok(AccessLevel::Level1),
            ROLE_OPERATOR_ID => Ok(AccessLevel::Level2),
            ROLE_OCCASIONAL_ID => Ok(AccessLevel::Level3),
            other => Err(CoreError::UnknownRole(other)),
        }
    }

    /// The role id that maps to this level.
    pub const fn role_id(&self) -> i64 {
        match self {
            AccessLevel::Level1 => ROLE_ADMIN_ID,
            AccessLevel::Level2 => ROLE_OPERATOR_ID,
            AccessLevel::Level3 => ROLE_OCCASIONAL_ID,
        }
    }

    /// 1, 2 or 3.
    pub const fn number(&self) -> u8 {
        match self {
            AccessLevel::Level1 => 1,
            AccessLevel::Level2 => 2,
            AccessLevel::Level3 => 3,
        }
    }

    /// True when this level grants at least the privileges of `required`.
    #[inline]
    pub fn at_least(&self, required: AccessLevel) -> bool {
        *self <= required
    }

    pub fn can_manage_users(&self) -> bool {
        self.at_least(AccessLevel::Level1)
    }

    pub fn can_view_session_log(&self) -> bool {
        self.at_least(AccessLevel::Level1)
    }

    pub fn can_manage_entities(&self) -> bool {
        self.at_least(AccessLevel::Level2)
    }

    pub fn can_register_sales(&self) -> bool {
        self.at_least(AccessLevel::Level2)
    }

    pub fn can_read_catalogs(&self) -> bool {
        true
    }

    /// Display name for menus.
    pub fn label(&self) -> &'static str {
        match self {
            AccessLevel::Level1 => "Administrator",
            AccessLevel::Level2 => "Operator",
            AccessLevel::Level3 => "Occasional",
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Level {} ({})", self.number(), self.label())
    }
}
