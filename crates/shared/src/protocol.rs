use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    domain::{
        deserialize_roles, AccessLevel, CategoryId, PublicationId, PublicationKind,
        PublicationStatus, ReportId, ReportStatus, Role, UserId, UserKind,
    },
    error::FieldError,
};

const MIN_NAME_LEN: usize = 2;
const MIN_PASSWORD_LEN: usize = 6;

/// A user account as returned by `GET /users`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    #[serde(rename = "nom")]
    pub family_name: String,
    #[serde(rename = "prenom")]
    pub given_name: String,
    pub email: String,
    #[serde(rename = "solde", default)]
    pub balance: f64,
    #[serde(default, deserialize_with = "deserialize_roles")]
    pub roles: BTreeSet<Role>,
    #[serde(flatten)]
    pub profile_fields: ProfileFields,
}

impl User {
    pub fn kind(&self) -> UserKind {
        UserKind::from_roles(&self.roles)
    }

    /// A user with no recognised role matches as the kind it displays as.
    pub fn has_any_role(&self, roles: &BTreeSet<Role>) -> bool {
        if self.roles.is_empty() {
            return roles.contains(&self.kind().role());
        }
        self.roles.iter().any(|role| roles.contains(role))
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.family_name, self.given_name)
    }

    /// Type-specific fields, selected by [`User::kind`].
    pub fn profile(&self) -> Profile {
        let fields = self.profile_fields.clone();
        match self.kind() {
            UserKind::Student => Profile::Student {
                school: fields.school,
                university: fields.university,
                speciality: fields.speciality,
                level: fields.level,
            },
            UserKind::Professor => Profile::Professor {
                university: fields.university,
                research_domain: fields.research_domain,
                grade: fields.grade,
            },
            UserKind::Professional => Profile::Professional {
                company: fields.company,
                sector: fields.sector,
                position: fields.position,
            },
            UserKind::Administrator => Profile::Administrator {
                access_level: fields
                    .access_level
                    .and_then(|raw| serde_json::from_value(serde_json::Value::String(raw)).ok()),
            },
        }
    }
}

/// Flat optional profile columns as the backend serialises them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileFields {
    #[serde(rename = "ecole", default, skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(rename = "universite", default, skip_serializing_if = "Option::is_none")]
    pub university: Option<String>,
    #[serde(rename = "specialite", default, skip_serializing_if = "Option::is_none")]
    pub speciality: Option<String>,
    #[serde(rename = "niveau", default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(rename = "domaineRecherche", default, skip_serializing_if = "Option::is_none")]
    pub research_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(rename = "entreprise", default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(rename = "secteur", default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
    #[serde(rename = "poste", default, skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(rename = "niveauAcces", default, skip_serializing_if = "Option::is_none")]
    pub access_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Profile {
    #[serde(rename = "ETUDIANT")]
    Student {
        #[serde(rename = "ecole", default, skip_serializing_if = "Option::is_none")]
        school: Option<String>,
        #[serde(rename = "universite", default, skip_serializing_if = "Option::is_none")]
        university: Option<String>,
        #[serde(rename = "specialite", default, skip_serializing_if = "Option::is_none")]
        speciality: Option<String>,
        #[serde(rename = "niveau", default, skip_serializing_if = "Option::is_none")]
        level: Option<String>,
    },
    #[serde(rename = "PROFESSEUR")]
    Professor {
        #[serde(rename = "universite", default, skip_serializing_if = "Option::is_none")]
        university: Option<String>,
        #[serde(rename = "domaineRecherche", default, skip_serializing_if = "Option::is_none")]
        research_domain: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        grade: Option<String>,
    },
    #[serde(rename = "PROFESSIONNEL")]
    Professional {
        #[serde(rename = "entreprise", default, skip_serializing_if = "Option::is_none")]
        company: Option<String>,
        #[serde(rename = "secteur", default, skip_serializing_if = "Option::is_none")]
        sector: Option<String>,
        #[serde(rename = "poste", default, skip_serializing_if = "Option::is_none")]
        position: Option<String>,
    },
    #[serde(rename = "ADMINISTRATEUR")]
    Administrator {
        #[serde(rename = "niveauAcces", default, skip_serializing_if = "Option::is_none")]
        access_level: Option<AccessLevel>,
    },
}

impl Profile {
    pub fn empty(kind: UserKind) -> Self {
        match kind {
            UserKind::Student => Profile::Student {
                school: None,
                university: None,
                speciality: None,
                level: None,
            },
            UserKind::Professor => Profile::Professor {
                university: None,
                research_domain: None,
                grade: None,
            },
            UserKind::Professional => Profile::Professional {
                company: None,
                sector: None,
                position: None,
            },
            UserKind::Administrator => Profile::Administrator { access_level: None },
        }
    }

    pub fn kind(&self) -> UserKind {
        match self {
            Profile::Student { .. } => UserKind::Student,
            Profile::Professor { .. } => UserKind::Professor,
            Profile::Professional { .. } => UserKind::Professional,
            Profile::Administrator { .. } => UserKind::Administrator,
        }
    }
}

/// Body of `POST /users`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewUser {
    #[serde(rename = "nom")]
    pub family_name: String,
    #[serde(rename = "prenom")]
    pub given_name: String,
    pub email: String,
    pub password: String,
    pub roles: Vec<Role>,
    #[serde(flatten)]
    pub profile: Profile,
}

impl NewUser {
    pub fn new(
        family_name: impl Into<String>,
        given_name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        profile: Profile,
    ) -> Self {
        Self {
            family_name: family_name.into(),
            given_name: given_name.into(),
            email: email.into(),
            password: password.into(),
            roles: vec![profile.kind().role()],
            profile,
        }
    }

    /// Rejects input the backend is known to refuse before a request is made.
    pub fn validate(&self) -> Result<(), FieldError> {
        validate_name("nom", &self.family_name)?;
        validate_name("prenom", &self.given_name)?;
        validate_email(&self.email)?;
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(FieldError::new(
                "password",
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }
        Ok(())
    }
}

/// Body of `PUT /users/{id}`; absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserUpdate {
    #[serde(rename = "nom", skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(rename = "prenom", skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(rename = "solde", skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<UserKind>,
    #[serde(flatten)]
    pub profile_fields: ProfileFields,
}

impl UserUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<(), FieldError> {
        if let Some(name) = &self.family_name {
            validate_name("nom", name)?;
        }
        if let Some(name) = &self.given_name {
            validate_name("prenom", name)?;
        }
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(password) = &self.password {
            if password.chars().count() < MIN_PASSWORD_LEN {
                return Err(FieldError::new(
                    "password",
                    format!("must be at least {MIN_PASSWORD_LEN} characters"),
                ));
            }
        }
        Ok(())
    }
}

fn validate_name(field: &str, value: &str) -> Result<(), FieldError> {
    if value.trim().chars().count() < MIN_NAME_LEN {
        return Err(FieldError::new(
            field,
            format!("must be at least {MIN_NAME_LEN} characters"),
        ));
    }
    Ok(())
}

fn validate_email(value: &str) -> Result<(), FieldError> {
    let value = value.trim();
    let valid = value
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(FieldError::new("email", "is not a valid address"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDraft {
    pub name: String,
    pub description: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Publication {
    pub id: PublicationId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub kind: PublicationKind,
    pub status: PublicationStatus,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub author_id: Option<UserId>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PublicationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category_id: Option<CategoryId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: ReportId,
    pub reason: String,
    #[serde(default)]
    pub description: String,
    pub publication_id: PublicationId,
    pub reporter_id: UserId,
    pub status: ReportStatus,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportStatusUpdate {
    pub status: ReportStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response; the backend answers either a bare token string or an
/// object carrying it.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TokenResponse {
    Raw(String),
    Token { token: String },
    AccessToken {
        #[serde(rename = "accessToken")]
        access_token: String,
    },
}

impl TokenResponse {
    pub fn into_token(self) -> String {
        match self {
            TokenResponse::Raw(token) => token,
            TokenResponse::Token { token } => token,
            TokenResponse::AccessToken { access_token } => access_token,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailRequest {
    pub to: Vec<String>,
    pub subject: String,
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailAck {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub failed_recipients: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Accepts RFC 3339 or a zone-less `LocalDateTime` (read as UTC); anything
/// else decodes to `None`.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| {
        DateTime::parse_from_rfc3339(&raw)
            .map(|ts| ts.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_backend_user_with_profile_fields() {
        let user: User = serde_json::from_value(json!({
            "id": "u1",
            "nom": "Alaoui",
            "prenom": "Sara",
            "email": "sara@binet.ma",
            "solde": 120.5,
            "roles": ["ROLE_PROFESSEUR", "ROLE_UNKNOWN"],
            "universite": "UM5",
            "grade": "PES"
        }))
        .expect("decode");

        assert_eq!(user.kind(), UserKind::Professor);
        assert_eq!(user.roles.len(), 1);
        assert_eq!(
            user.profile(),
            Profile::Professor {
                university: Some("UM5".into()),
                research_domain: None,
                grade: Some("PES".into()),
            }
        );
    }

    #[test]
    fn new_user_serialises_flat_with_type_tag() {
        let new_user = NewUser::new(
            "Benali",
            "Omar",
            "omar@binet.ma",
            "secret1",
            Profile::Professional {
                company: Some("OCP".into()),
                sector: None,
                position: Some("Engineer".into()),
            },
        );
        let value = serde_json::to_value(&new_user).expect("encode");
        assert_eq!(value["type"], "PROFESSIONNEL");
        assert_eq!(value["entreprise"], "OCP");
        assert_eq!(value["roles"], json!(["ROLE_PROFESSIONNEL"]));
        assert!(value.get("secteur").is_none());
    }

    #[test]
    fn new_user_validation_reports_field() {
        let new_user = NewUser::new(
            "B",
            "Omar",
            "omar@binet.ma",
            "secret1",
            Profile::empty(UserKind::Student),
        );
        let err = new_user.validate().expect_err("short name");
        assert_eq!(err.field, "nom");

        let new_user = NewUser::new(
            "Benali",
            "Omar",
            "not-an-email",
            "secret1",
            Profile::empty(UserKind::Student),
        );
        assert_eq!(new_user.validate().expect_err("email").field, "email");
    }

    #[test]
    fn token_response_accepts_all_shapes() {
        let raw: TokenResponse = serde_json::from_value(json!("abc")).expect("raw");
        let wrapped: TokenResponse = serde_json::from_value(json!({"token": "def"})).expect("obj");
        let access: TokenResponse =
            serde_json::from_value(json!({"accessToken": "ghi"})).expect("access");
        assert_eq!(raw.into_token(), "abc");
        assert_eq!(wrapped.into_token(), "def");
        assert_eq!(access.into_token(), "ghi");
    }

    #[test]
    fn category_timestamps_accept_local_datetime() {
        let category: Category = serde_json::from_value(json!({
            "id": "c1",
            "name": "Informatique",
            "createdAt": "2024-01-15T10:30:00",
            "updatedAt": "2024-01-20T08:30:00Z"
        }))
        .expect("decode");
        assert!(category.is_active);
        assert!(category.created_at.is_some());
        assert!(category.updated_at.is_some());
    }
}
