use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Username of the bootstrap administrator account.
pub const ADMIN_USERNAME: &str = "ADMIN";

#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value:?}")]
pub struct ParseEnumError {
    kind: &'static str,
    value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(ParseEnumError::new("role", other)),
        }
    }
}

/// Account workflow status. New registrations wait for an admin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Pending,
    Active,
}

impl UserStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
        }
    }
}

impl FromStr for UserStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "active" => Ok(Self::Active),
            other => Err(ParseEnumError::new("status", other)),
        }
    }
}

/// Password reset workflow, stored as an integer column.
///
/// `None -> Requested` by the user, `Requested -> Granted` by an admin,
/// `Granted -> None` once the user has chosen a new password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResetState {
    None,
    Requested,
    Granted,
}

impl ResetState {
    pub fn as_i64(self) -> i64 {
        match self {
            Self::None => 0,
            Self::Requested => 1,
            Self::Granted => 2,
        }
    }

    pub fn from_i64(value: i64) -> Result<Self, ParseEnumError> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Requested),
            2 => Ok(Self::Granted),
            other => Err(ParseEnumError::new("reset state", &other.to_string())),
        }
    }
}

/// Whether a signed document is the first issue or a revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Remarks {
    Original,
    Revision,
}

impl Remarks {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Original => "original",
            Self::Revision => "revision",
        }
    }
}

impl FromStr for Remarks {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original" => Ok(Self::Original),
            "revision" => Ok(Self::Revision),
            other => Err(ParseEnumError::new("remarks", other)),
        }
    }
}

impl fmt::Display for Remarks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_parse_their_own_names() {
        for role in [Role::User, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        for status in [UserStatus::Pending, UserStatus::Active] {
            assert_eq!(status.as_str().parse::<UserStatus>().unwrap(), status);
        }
        for remarks in [Remarks::Original, Remarks::Revision] {
            assert_eq!(remarks.as_str().parse::<Remarks>().unwrap(), remarks);
        }
    }

    #[test]
    fn reset_state_rejects_unknown_codes() {
        assert_eq!(ResetState::from_i64(2).unwrap(), ResetState::Granted);
        assert!(ResetState::from_i64(7).is_err());
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Remarks::Revision).unwrap(), "\"revision\"");
        assert_eq!(serde_json::to_string(&ResetState::Granted).unwrap(), "\"granted\"");
    }
}
