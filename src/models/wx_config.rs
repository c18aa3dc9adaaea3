// src/models/wx_config.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    db::{Document, Field, FieldPath, Filter, Model, NoRelation, Schema, Sort, Stored, Unexpanded},
    error::AppError,
};

/// WeChat official-account credentials. The collection holds one record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct WxConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(rename = "appid", default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,

    #[serde(rename = "appSecret", default, skip_serializing_if = "Option::is_none")]
    pub app_secret: Option<String>,

    #[serde(rename = "encodingAESKey", default, skip_serializing_if = "Option::is_none")]
    pub encoding_aes_key: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub enum WxConfigField {
    Id,
    CreatedAt,
    UpdatedAt,
    Token,
    AppId,
}

impl Field for WxConfigField {
    fn path(self) -> FieldPath {
        match self {
            WxConfigField::Id => FieldPath::Id,
            WxConfigField::CreatedAt => FieldPath::CreatedAt,
            WxConfigField::UpdatedAt => FieldPath::UpdatedAt,
            WxConfigField::Token => FieldPath::Doc("token"),
            WxConfigField::AppId => FieldPath::Doc("appid"),
        }
    }
}

static SCHEMA: Schema = Schema {
    name: "wxes",
    required: &[],
    unique: &[],
};

impl Document for WxConfig {
    type Field = WxConfigField;
    type Relation = NoRelation;
    type Expanded = Unexpanded;

    fn schema() -> &'static Schema {
        &SCHEMA
    }
}

impl Model<WxConfig> {
    /// The oldest record wins if more than one was ever written.
    pub async fn current(&self) -> Result<Option<Stored<WxConfig>>, AppError> {
        let mut found = self
            .find(&Filter::All, &[Sort::asc(WxConfigField::Id)], 0, Some(1))
            .await?;
        Ok(found.pop())
    }

    /// Replaces the current configuration, creating it on first use.
    pub async fn upsert(&self, config: WxConfig) -> Result<Stored<WxConfig>, AppError> {
        match self.current().await? {
            Some(mut existing) => {
                existing.doc = config;
                self.save(&mut existing).await?;
                Ok(existing)
            }
            None => self.create(config).await,
        }
    }
}
