// src/models/user.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    db::{Document, Field, FieldPath, Filter, Model, NoRelation, Schema, Stored, Unexpanded},
    error::AppError,
    utils::hash::{hash_password, verify_password},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

/// Registered site account, stored in the `users` collection.
///
/// The serialized form is the storage format and therefore includes the
/// password hash; hand [`UserProfile`] to anything user-facing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SiteUser {
    /// Unique username.
    pub username: String,

    /// Argon2 password hash (PHC string).
    pub password: String,

    #[serde(default)]
    pub role: Role,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub email: Option<String>,

    /// Personal website.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub website: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weibo: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,

    /// Invite code presented at signup.
    #[serde(rename = "inviteCode", default, skip_serializing_if = "Option::is_none")]
    pub invite_code: Option<String>,

    /// Whether the account is active.
    #[serde(default = "active")]
    pub status: bool,
}

fn active() -> bool {
    true
}

impl SiteUser {
    /// New active user with role `user`; the password is hashed here.
    pub fn new(username: impl Into<String>, password: &str) -> Result<Self, AppError> {
        Ok(Self {
            username: username.into(),
            password: hash_password(password)?,
            role: Role::User,
            email: None,
            website: None,
            weibo: None,
            address: None,
            github: None,
            signature: None,
            job: None,
            invite_code: None,
            status: true,
        })
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn set_password(&mut self, password: &str) -> Result<(), AppError> {
        self.password = hash_password(password)?;
        Ok(())
    }

    /// True only for the exact password this account was stored with.
    pub fn valid_password(&self, candidate: &str) -> bool {
        verify_password(candidate, &self.password)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Public view of a user, used when relations are expanded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: i64,
    pub username: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl From<&Stored<SiteUser>> for UserProfile {
    fn from(user: &Stored<SiteUser>) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            role: user.role,
            website: user.website.clone(),
            github: user.github.clone(),
            signature: user.signature.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum SiteUserField {
    Id,
    CreatedAt,
    UpdatedAt,
    Username,
    Role,
    Email,
    InviteCode,
    Status,
}

impl Field for SiteUserField {
    fn path(self) -> FieldPath {
        match self {
            SiteUserField::Id => FieldPath::Id,
            SiteUserField::CreatedAt => FieldPath::CreatedAt,
            SiteUserField::UpdatedAt => FieldPath::UpdatedAt,
            SiteUserField::Username => FieldPath::Doc("username"),
            SiteUserField::Role => FieldPath::Doc("role"),
            SiteUserField::Email => FieldPath::Doc("email"),
            SiteUserField::InviteCode => FieldPath::Doc("inviteCode"),
            SiteUserField::Status => FieldPath::Doc("status"),
        }
    }
}

static SCHEMA: Schema = Schema {
    name: "users",
    required: &["username", "password"],
    unique: &["username"],
};

impl Document for SiteUser {
    type Field = SiteUserField;
    type Relation = NoRelation;
    type Expanded = Unexpanded;

    fn schema() -> &'static Schema {
        &SCHEMA
    }
}

impl Model<SiteUser> {
    pub async fn find_by_username(&self, username: &str) -> Result<Option<Stored<SiteUser>>, AppError> {
        self.find_one(&Filter::eq(SiteUserField::Username, username))
            .await
    }

    /// Public profiles for the given ids, in no particular order.
    pub async fn profiles(&self, ids: &[i64]) -> Result<Vec<UserProfile>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let users = self
            .find(&Filter::any_of(SiteUserField::Id, ids.iter().copied()), &[], 0, None)
            .await?;
        Ok(users.iter().map(UserProfile::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_defaults() {
        let user = SiteUser::new("alice", "s3cret!").unwrap();
        assert_eq!(user.role, Role::User);
        assert!(user.status);
        assert!(!user.is_admin());
        assert_ne!(user.password, "s3cret!");
    }

    #[test]
    fn valid_password_rejects_near_misses() {
        let user = SiteUser::new("alice", "s3cret!").unwrap();
        assert!(user.valid_password("s3cret!"));
        assert!(!user.valid_password(""));
        assert!(!user.valid_password("s3cret"));
        assert!(!user.valid_password("s3cret!!"));
        assert!(!user.valid_password("S3cret!"));
    }

    #[test]
    fn legacy_document_fills_defaults() {
        let user: SiteUser = serde_json::from_value(serde_json::json!({
            "username": "bob",
            "password": "x",
            "inviteCode": "abc"
        }))
        .unwrap();
        assert_eq!(user.role, Role::User);
        assert!(user.status);
        assert_eq!(user.invite_code.as_deref(), Some("abc"));
    }

    #[test]
    fn role_uses_lowercase_names() {
        let admin = SiteUser::new("root", "pw").unwrap().with_role(Role::Admin);
        let value = serde_json::to_value(&admin).unwrap();
        assert_eq!(value["role"], "admin");
        assert_eq!(value["status"], true);
        assert!(value.get("email").is_none());
    }

    #[test]
    fn email_format_is_validated() {
        let mut user = SiteUser::new("carol", "pw").unwrap();
        user.email = Some("not-an-email".into());
        assert!(user.validate().is_err());
        user.email = Some("carol@example.com".into());
        assert!(user.validate().is_ok());
    }
}
