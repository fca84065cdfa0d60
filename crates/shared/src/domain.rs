use std::{collections::BTreeSet, fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(CategoryId);
id_newtype!(PublicationId);
id_newtype!(ReportId);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown role tag '{0}'")]
pub struct UnknownRole(pub String);

/// Role tag carried by a user account.
///
/// Ordering follows display precedence: the smallest role present decides the
/// user's [`UserKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Admin,
    Professor,
    Professional,
    Student,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Admin,
        Role::Professor,
        Role::Professional,
        Role::Student,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            Role::Admin => "ROLE_ADMIN",
            Role::Professor => "ROLE_PROFESSEUR",
            Role::Professional => "ROLE_PROFESSIONNEL",
            Role::Student => "ROLE_ETUDIANT",
        }
    }

    pub fn kind(self) -> UserKind {
        match self {
            Role::Admin => UserKind::Administrator,
            Role::Professor => UserKind::Professor,
            Role::Professional => UserKind::Professional,
            Role::Student => UserKind::Student,
        }
    }
}

impl FromStr for Role {
    type Err = UnknownRole;

    /// Accepts wire names, with the doubled `ROLE_ROLE_` prefix some tokens
    /// carry, and the short operator spellings used on the command line.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let upper = raw.trim().to_ascii_uppercase();
        let mut name = upper.as_str();
        while let Some(rest) = name.strip_prefix("ROLE_") {
            name = rest;
        }
        match name {
            "ADMIN" | "ADMINISTRATEUR" => Ok(Role::Admin),
            "PROFESSEUR" | "PROFESSOR" => Ok(Role::Professor),
            "PROFESSIONNEL" | "PROFESSIONAL" => Ok(Role::Professional),
            "ETUDIANT" | "STUDENT" => Ok(Role::Student),
            _ => Err(UnknownRole(raw.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire_name())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Parses a role list, dropping tags this client does not know about.
pub fn parse_roles<I, S>(raw: I) -> BTreeSet<Role>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter()
        .filter_map(|tag| match tag.as_ref().parse::<Role>() {
            Ok(role) => Some(role),
            Err(err) => {
                tracing::warn!(%err, "ignoring role tag");
                None
            }
        })
        .collect()
}

pub(crate) fn deserialize_roles<'de, D>(deserializer: D) -> Result<BTreeSet<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<String>::deserialize(deserializer)?;
    Ok(parse_roles(raw))
}

/// Display/filter type of a user, derived from its roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserKind {
    #[serde(rename = "ETUDIANT")]
    Student,
    #[serde(rename = "PROFESSEUR")]
    Professor,
    #[serde(rename = "PROFESSIONNEL")]
    Professional,
    #[serde(rename = "ADMINISTRATEUR")]
    Administrator,
}

impl UserKind {
    /// Highest-precedence role wins; an account with no known role displays
    /// as a student.
    pub fn from_roles(roles: &BTreeSet<Role>) -> Self {
        roles
            .iter()
            .next()
            .map(|role| role.kind())
            .unwrap_or(UserKind::Student)
    }

    pub fn role(self) -> Role {
        match self {
            UserKind::Student => Role::Student,
            UserKind::Professor => Role::Professor,
            UserKind::Professional => Role::Professional,
            UserKind::Administrator => Role::Admin,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UserKind::Student => "Student",
            UserKind::Professor => "Professor",
            UserKind::Professional => "Professional",
            UserKind::Administrator => "Administrator",
        }
    }
}

impl fmt::Display for UserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessLevel {
    Super,
    Admin,
    Moderateur,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicationKind {
    Article,
    Memoir,
    Project,
    Report,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicationStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportStatus {
    Pending,
    Resolved,
    Dismissed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_doubled_role_prefix() {
        assert_eq!("ROLE_ROLE_ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert_eq!("role_etudiant".parse::<Role>(), Ok(Role::Student));
        assert!("ROLE_GUEST".parse::<Role>().is_err());
    }

    #[test]
    fn admin_takes_precedence_over_other_roles() {
        let roles = parse_roles(["ROLE_ETUDIANT", "ROLE_ADMIN", "ROLE_PROFESSEUR"]);
        assert_eq!(UserKind::from_roles(&roles), UserKind::Administrator);

        let roles = parse_roles(["ROLE_ETUDIANT", "ROLE_PROFESSIONNEL"]);
        assert_eq!(UserKind::from_roles(&roles), UserKind::Professional);
    }

    #[test]
    fn unknown_roles_are_dropped() {
        let roles = parse_roles(["ROLE_GUEST"]);
        assert!(roles.is_empty());
        assert_eq!(UserKind::from_roles(&roles), UserKind::Student);
    }
}
