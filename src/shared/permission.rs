//! Permission model
//!
//! Typed permission bitmask plus the resource and grantee tags the ACL
//! engine understands. Bit positions are persisted as plain integers, so
//! they must never move.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use crate::shared::error::SharedError;

/// Set of permission bits granted on a resource
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PermissionSet(u8);

impl PermissionSet {
    pub const NONE: Self = Self(0);
    pub const READ: Self = Self(1 << 0);
    pub const WRITE: Self = Self(1 << 1);
    pub const DELETE: Self = Self(1 << 2);
    pub const SHARE: Self = Self(1 << 3);
    pub const ADMIN: Self = Self(1 << 4);

    /// Read-only role
    pub const VIEWER: Self = Self::READ;
    /// Read and write role
    pub const EDITOR: Self = Self(Self::READ.0 | Self::WRITE.0);
    /// Everything except ADMIN
    pub const OWNER: Self = Self(Self::READ.0 | Self::WRITE.0 | Self::DELETE.0 | Self::SHARE.0);
    /// All five bits
    pub const FULL_ACCESS: Self = Self(Self::OWNER.0 | Self::ADMIN.0);

    const NAMED: [(Self, &'static str); 5] = [
        (Self::READ, "READ"),
        (Self::WRITE, "WRITE"),
        (Self::DELETE, "DELETE"),
        (Self::SHARE, "SHARE"),
        (Self::ADMIN, "ADMIN"),
    ];

    /// Build a set from a raw integer, rejecting unknown bits
    pub fn from_bits(bits: i64) -> Result<Self, SharedError> {
        if bits < 0 || bits > i64::from(Self::FULL_ACCESS.0) {
            return Err(SharedError::validation(
                "permissions",
                format!("{} is not a valid permission bitmask", bits),
            ));
        }
        Ok(Self(bits as u8))
    }

    /// Raw bitmask, as persisted
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Union
    #[must_use]
    pub const fn add(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Subtraction
    #[must_use]
    pub const fn remove(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// True when every bit of `required` is present
    pub const fn has(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for PermissionSet {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.add(rhs)
    }
}

impl BitOrAssign for PermissionSet {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.add(rhs);
    }
}

impl fmt::Display for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let mut first = true;
        for (bit, name) in Self::NAMED {
            if self.has(bit) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for PermissionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PermissionSet({})", self)
    }
}

impl FromStr for PermissionSet {
    type Err = SharedError;

    /// Accepts a role name (`viewer`, `editor`, `owner`, `admin`,
    /// `full_access`) or a decimal bitmask.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "viewer" => Ok(Self::VIEWER),
            "editor" => Ok(Self::EDITOR),
            "owner" => Ok(Self::OWNER),
            "admin" | "full_access" => Ok(Self::FULL_ACCESS),
            _ => {
                let bits: i64 = trimmed.parse().map_err(|_| {
                    SharedError::validation("permissions", format!("invalid permission: {}", s))
                })?;
                Self::from_bits(bits)
            }
        }
    }
}

impl Serialize for PermissionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> Deserialize<'de> for PermissionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Bits(i64),
            Name(String),
        }

        let parsed = match Raw::deserialize(deserializer)? {
            Raw::Bits(bits) => Self::from_bits(bits),
            Raw::Name(name) => name.parse(),
        };
        parsed.map_err(serde::de::Error::custom)
    }
}

/// Kinds of resource that can carry access control entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceType {
    Task,
    FarmArea,
    Team,
    Document,
}

impl ResourceType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "TASK",
            Self::FarmArea => "FARM_AREA",
            Self::Team => "TEAM",
            Self::Document => "DOCUMENT",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceType {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "TASK" => Ok(Self::Task),
            "FARM_AREA" => Ok(Self::FarmArea),
            "TEAM" => Ok(Self::Team),
            "DOCUMENT" => Ok(Self::Document),
            other => Err(SharedError::UnknownResourceType(other.to_string())),
        }
    }
}

/// Who an access control entry grants to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GranteeType {
    User,
    Team,
    Public,
}

impl GranteeType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Team => "TEAM",
            Self::Public => "PUBLIC",
        }
    }
}

impl fmt::Display for GranteeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GranteeType {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USER" => Ok(Self::User),
            "TEAM" => Ok(Self::Team),
            "PUBLIC" => Ok(Self::Public),
            other => Err(SharedError::validation(
                "grantee_type",
                format!("unknown grantee type: {}", other),
            )),
        }
    }
}

/// A grantee whose shape has been checked: USER and TEAM carry an id,
/// PUBLIC never does.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Grantee {
    User(String),
    Team(String),
    Public,
}

impl Grantee {
    pub fn new(grantee_type: GranteeType, grantee_id: Option<String>) -> Result<Self, SharedError> {
        match (grantee_type, grantee_id) {
            (GranteeType::Public, None) => Ok(Self::Public),
            (GranteeType::Public, Some(_)) => Err(SharedError::validation(
                "grantee_id",
                "PUBLIC grants cannot name a grantee",
            )),
            (GranteeType::User | GranteeType::Team, None) => Err(SharedError::validation(
                "grantee_id",
                format!("{} grants require a grantee_id", grantee_type),
            )),
            (_, Some(id)) if id.trim().is_empty() => Err(SharedError::validation(
                "grantee_id",
                "grantee_id cannot be empty",
            )),
            (GranteeType::User, Some(id)) => Ok(Self::User(id)),
            (GranteeType::Team, Some(id)) => Ok(Self::Team(id)),
        }
    }

    pub fn grantee_type(&self) -> GranteeType {
        match self {
            Self::User(_) => GranteeType::User,
            Self::Team(_) => GranteeType::Team,
            Self::Public => GranteeType::Public,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::User(id) | Self::Team(id) => Some(id),
            Self::Public => None,
        }
    }
}
