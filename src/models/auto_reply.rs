// src/models/auto_reply.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    db::{Document, Field, FieldPath, Filter, Model, NoRelation, Schema, Unexpanded},
    error::AppError,
};

/// Keyword-triggered reply content for the WeChat robot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct AutoReplyRule {
    /// Trigger keyword, unique.
    pub key: String,
    pub value: String,
}

impl AutoReplyRule {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum AutoReplyField {
    Id,
    CreatedAt,
    UpdatedAt,
    Key,
    Value,
}

impl Field for AutoReplyField {
    fn path(self) -> FieldPath {
        match self {
            AutoReplyField::Id => FieldPath::Id,
            AutoReplyField::CreatedAt => FieldPath::CreatedAt,
            AutoReplyField::UpdatedAt => FieldPath::UpdatedAt,
            AutoReplyField::Key => FieldPath::Doc("key"),
            AutoReplyField::Value => FieldPath::Doc("value"),
        }
    }
}

static SCHEMA: Schema = Schema {
    name: "robots",
    required: &["key", "value"],
    unique: &["key"],
};

impl Document for AutoReplyRule {
    type Field = AutoReplyField;
    type Relation = NoRelation;
    type Expanded = Unexpanded;

    fn schema() -> &'static Schema {
        &SCHEMA
    }
}

impl Model<AutoReplyRule> {
    pub async fn reply_for(&self, key: &str) -> Result<Option<String>, AppError> {
        let rule = self.find_one(&Filter::eq(AutoReplyField::Key, key)).await?;
        Ok(rule.map(|r| r.doc.value))
    }
}
