//! User record (account owner of orders and notifications).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pharmacy_core::{
    Column, ColumnType, DomainError, DomainResult, Entity, EntityKind, Row, UserId,
};

use crate::Role;

const MAX_USERNAME_LEN: usize = 100;
const MAX_CREDENTIAL_LEN: usize = 100;

/// Opaque, already-hashed password credential.
///
/// Hashing and verification are handled by the authentication layer; the
/// value is never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordCredential(String);

impl PasswordCredential {
    pub fn new(hashed: impl Into<String>) -> DomainResult<Self> {
        let hashed = hashed.into();
        if hashed.is_empty() {
            return Err(DomainError::validation("password credential cannot be empty"));
        }
        if hashed.chars().count() > MAX_CREDENTIAL_LEN {
            return Err(DomainError::validation(format!(
                "password credential exceeds {MAX_CREDENTIAL_LEN} characters"
            )));
        }
        Ok(Self(hashed))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for PasswordCredential {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordCredential(***)")
    }
}

/// Registration input.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password_credential: String,
    pub email: String,
    pub display_name: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_credential: PasswordCredential,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub version: u64,
}

impl User {
    /// Validate registration input into an unsaved user.
    pub fn register(input: NewUser, now: DateTime<Utc>) -> DomainResult<Self> {
        let username = input.username.trim().to_string();
        if username.is_empty() {
            return Err(DomainError::validation("username cannot be empty"));
        }
        if username.chars().count() > MAX_USERNAME_LEN {
            return Err(DomainError::validation(format!(
                "username exceeds {MAX_USERNAME_LEN} characters"
            )));
        }

        Ok(Self {
            id: UserId::UNASSIGNED,
            username,
            password_credential: PasswordCredential::new(input.password_credential)?,
            email: input.email.trim().to_string(),
            display_name: input.display_name.trim().to_string(),
            role: input.role,
            created_at: now,
            last_login_at: None,
            version: 0,
        })
    }

    pub fn record_login(&mut self, at: DateTime<Utc>) {
        self.last_login_at = Some(at);
    }
}

impl Entity for User {
    type Id = UserId;

    const KIND: EntityKind = EntityKind::User;

    const COLUMNS: &'static [Column] = &[
        Column::required("username", ColumnType::Text),
        Column::required("password_credential", ColumnType::Text),
        Column::required("email", ColumnType::Text),
        Column::required("display_name", ColumnType::Text),
        Column::required("role", ColumnType::Text),
        Column::required("created_at", ColumnType::Timestamp),
        Column::nullable("last_login_at", ColumnType::Timestamp),
    ];

    fn id(&self) -> UserId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with("username", self.username.as_str())
            .with("password_credential", self.password_credential.expose())
            .with("email", self.email.as_str())
            .with("display_name", self.display_name.as_str())
            .with("role", self.role.as_str())
            .with("created_at", self.created_at)
            .with("last_login_at", self.last_login_at)
    }

    fn from_row(id: UserId, version: u64, row: &Row) -> DomainResult<Self> {
        Ok(Self {
            id,
            username: row.text("username")?,
            password_credential: PasswordCredential::new(row.text("password_credential")?)
                .map_err(|e| DomainError::decode(e.to_string()))?,
            email: row.text("email")?,
            display_name: row.text("display_name")?,
            role: row
                .text("role")?
                .parse()
                .map_err(|e: DomainError| DomainError::decode(e.to_string()))?,
            created_at: row.timestamp("created_at")?,
            last_login_at: row.opt_timestamp("last_login_at")?,
            version,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            password_credential: "$argon2id$v=19$stub".to_string(),
            email: "ana@example.com".to_string(),
            display_name: "Ana".to_string(),
            role: Role::Customer,
        }
    }

    #[test]
    fn register_trims_and_leaves_key_unassigned() {
        let user = User::register(input("  ana "), Utc::now()).unwrap();
        assert_eq!(user.username, "ana");
        assert_eq!(user.id, UserId::UNASSIGNED);
        assert_eq!(user.last_login_at, None);
    }

    #[test]
    fn register_rejects_blank_username() {
        assert!(matches!(
            User::register(input("   "), Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn register_rejects_overlong_username() {
        let long = "u".repeat(MAX_USERNAME_LEN + 1);
        assert!(User::register(input(&long), Utc::now()).is_err());
    }

    #[test]
    fn credential_is_not_printed_or_serialized() {
        let user = User::register(input("ana"), Utc::now()).unwrap();
        assert!(!format!("{user:?}").contains("argon2"));
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn row_codec_preserves_fields() {
        let mut user = User::register(input("ana"), Utc::now()).unwrap();
        user.record_login(Utc::now());
        let decoded = User::from_row(UserId::new(9), 2, &user.to_row()).unwrap();
        assert_eq!(decoded.id, UserId::new(9));
        assert_eq!(decoded.version, 2);
        assert_eq!(decoded.username, user.username);
        assert_eq!(decoded.last_login_at, user.last_login_at);
        assert_eq!(decoded.role, Role::Customer);
    }
}
