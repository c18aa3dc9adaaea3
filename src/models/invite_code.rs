// src/models/invite_code.rs

use chrono::Utc;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    db::{Document, Field, FieldPath, Model, NoRelation, Schema, Stored, Unexpanded},
    error::AppError,
};

/// A single-use signup code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct InviteCode {
    /// Unique across the collection.
    pub code: String,

    #[serde(default)]
    pub used: bool,
}

impl InviteCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            used: false,
        }
    }

    /// Fresh random code (simple-format UUID v4).
    pub fn generate() -> Self {
        Self::new(uuid::Uuid::new_v4().simple().to_string())
    }
}

#[derive(Debug, Clone, Copy)]
pub enum InviteCodeField {
    Id,
    CreatedAt,
    UpdatedAt,
    Code,
    Used,
}

impl Field for InviteCodeField {
    fn path(self) -> FieldPath {
        match self {
            InviteCodeField::Id => FieldPath::Id,
            InviteCodeField::CreatedAt => FieldPath::CreatedAt,
            InviteCodeField::UpdatedAt => FieldPath::UpdatedAt,
            InviteCodeField::Code => FieldPath::Doc("code"),
            InviteCodeField::Used => FieldPath::Doc("used"),
        }
    }
}

static SCHEMA: Schema = Schema {
    name: "invitecodes",
    required: &["code"],
    unique: &["code"],
};

impl Document for InviteCode {
    type Field = InviteCodeField;
    type Relation = NoRelation;
    type Expanded = Unexpanded;

    fn schema() -> &'static Schema {
        &SCHEMA
    }
}

impl Model<InviteCode> {
    /// Generates and stores `n` unused codes.
    pub async fn issue(&self, n: usize) -> Result<Vec<Stored<InviteCode>>, AppError> {
        let mut issued = Vec::with_capacity(n);
        for _ in 0..n {
            issued.push(self.create(InviteCode::generate()).await?);
        }
        tracing::info!("Issued {} invite codes", issued.len());
        Ok(issued)
    }

    /// Marks `code` as used. Returns `false` if the code does not exist or
    /// was already redeemed; a code can be redeemed only once.
    pub async fn redeem(&self, code: &str) -> Result<bool, AppError> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET doc = json_set(doc, '$.used', json('true')), updated_at = ? \
             WHERE json_extract(doc, '$.code') = ? \
             AND IFNULL(json_extract(doc, '$.used'), 0) = 0",
            self.name()
        ))
        .bind(Utc::now())
        .bind(code)
        .execute(self.pool())
        .await
        .map_err(|e| {
            tracing::error!("Failed to redeem invite code: {:?}", e);
            AppError::from(e)
        })?;

        Ok(result.rows_affected() == 1)
    }
}
