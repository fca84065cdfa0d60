//! Authenticated operator session.
//!
//! A [`Session`] is created by [`crate::AuthClient::login`] (or restored from a
//! saved token) and handed to an [`crate::ApiClient`]. Dropping it, or calling
//! [`crate::ApiClient::logout`], ends the session; nothing is kept in global
//! state.

use std::{collections::BTreeSet, fmt};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::domain::{parse_roles, Role};

use crate::error::ClientError;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RolesClaim {
    Joined(String),
    List(Vec<String>),
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[serde(default)]
    roles: Option<RolesClaim>,
    #[serde(default)]
    exp: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub email: String,
    pub roles: BTreeSet<Role>,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}

#[derive(Clone)]
pub struct Session {
    token: String,
    principal: Principal,
    expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Reads the principal out of a bearer token.
    ///
    /// The signature is not checked here; the backend verifies it on every
    /// request.
    pub fn from_token(token: impl Into<String>) -> Result<Self, ClientError> {
        let token: String = token.into();
        let token = token.trim().to_string();
        let mut parts = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(ClientError::Session(
                "expected three dot-separated segments".to_string(),
            ));
        };

        let decoded = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .map_err(|e| ClientError::Session(format!("payload is not base64url: {e}")))?;
        let claims: Claims = serde_json::from_slice(&decoded)
            .map_err(|e| ClientError::Session(format!("payload is not valid claims: {e}")))?;

        let roles = match claims.roles {
            Some(RolesClaim::Joined(joined)) => parse_roles(
                joined
                    .split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty()),
            ),
            Some(RolesClaim::List(list)) => parse_roles(list),
            None => BTreeSet::new(),
        };
        let expires_at = claims
            .exp
            .and_then(|exp| DateTime::<Utc>::from_timestamp(exp, 0));

        Ok(Self {
            principal: Principal {
                email: claims.sub,
                roles,
            },
            expires_at,
            token,
        })
    }

    pub fn bearer(&self) -> &str {
        &self.token
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("principal", &self.principal)
            .field("expires_at", &self.expires_at)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
pub(crate) fn unsigned_token(claims: serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}
