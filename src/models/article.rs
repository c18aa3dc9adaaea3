// src/models/article.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    db::{Document, Field, FieldPath, Model, Schema, Stored},
    error::AppError,
    models::user::{SiteUser, UserProfile},
    utils::html::clean_html,
};

/// Stored `type` value of an original article.
pub const ARTICLE_TYPE_ORIGINAL: &str = "原创";
/// Stored `type` value of a shared (reposted) article.
pub const ARTICLE_TYPE_SHARED: &str = "分享";

/// A comment embedded in its article. It has no identity of its own and
/// is addressed by its position in [`Article::comments`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Comment {
    /// Author (`users` id).
    #[serde(rename = "_user", default, skip_serializing_if = "Option::is_none")]
    pub author: Option<i64>,

    #[validate(length(min = 1, message = "Comment content is required"))]
    pub content: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Blog article, stored in the `articles` collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Article {
    pub title: String,

    /// Markdown source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Pinned to the top of listings.
    #[serde(default)]
    pub up: bool,

    #[serde(default)]
    pub recommend: bool,

    /// Rendered, sanitised HTML.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    /// Outline (table of contents).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,

    #[serde(default)]
    pub views: i64,

    /// Favorite count.
    #[serde(default)]
    pub favorite: i64,

    #[serde(rename = "type", default = "original_type")]
    pub kind: String,

    #[serde(default = "Utc::now")]
    pub created_time: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_time: DateTime<Utc>,

    /// Related link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Identifier of the article at its source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    /// Owner (`users` id).
    #[serde(rename = "_user", default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<i64>,

    #[serde(rename = "children", default)]
    #[validate(nested)]
    pub comments: Vec<Comment>,
}

fn original_type() -> String {
    ARTICLE_TYPE_ORIGINAL.to_string()
}

impl Article {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            title: title.into(),
            content: None,
            up: false,
            recommend: false,
            html: None,
            index: None,
            views: 0,
            favorite: 0,
            kind: original_type(),
            created_time: now,
            updated_time: now,
            url: None,
            source: None,
            source_id: None,
            tags: Vec::new(),
            owner: None,
            comments: Vec::new(),
        }
    }

    pub fn is_shared(&self) -> bool {
        self.kind == ARTICLE_TYPE_SHARED
    }

    /// Stores `raw` after stripping anything unsafe.
    pub fn set_html(&mut self, raw: &str) {
        self.html = Some(clean_html(raw));
    }

    /// Appends a comment and returns its index.
    pub fn add_comment(&mut self, author: Option<i64>, content: impl Into<String>) -> Result<usize, AppError> {
        let now = Utc::now();
        let comment = Comment {
            author,
            content: content.into(),
            created_at: now,
            updated_at: now,
        };
        comment
            .validate()
            .map_err(|e| AppError::ConstraintViolation(e.to_string()))?;

        self.comments.push(comment);
        Ok(self.comments.len() - 1)
    }

    pub fn remove_comment(&mut self, index: usize) -> Option<Comment> {
        (index < self.comments.len()).then(|| self.comments.remove(index))
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ArticleField {
    Id,
    CreatedAt,
    UpdatedAt,
    Title,
    Type,
    Up,
    Recommend,
    Views,
    Favorite,
    Tags,
    Owner,
    Source,
    SourceId,
}

impl Field for ArticleField {
    fn path(self) -> FieldPath {
        match self {
            ArticleField::Id => FieldPath::Id,
            ArticleField::CreatedAt => FieldPath::CreatedAt,
            ArticleField::UpdatedAt => FieldPath::UpdatedAt,
            ArticleField::Title => FieldPath::Doc("title"),
            ArticleField::Type => FieldPath::Doc("type"),
            ArticleField::Up => FieldPath::Doc("up"),
            ArticleField::Recommend => FieldPath::Doc("recommend"),
            ArticleField::Views => FieldPath::Doc("views"),
            ArticleField::Favorite => FieldPath::Doc("favorite"),
            ArticleField::Tags => FieldPath::Doc("tags"),
            ArticleField::Owner => FieldPath::Doc("_user"),
            ArticleField::Source => FieldPath::Doc("source"),
            ArticleField::SourceId => FieldPath::Doc("source_id"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleRelation {
    /// Resolve `_user` into the owner's profile.
    Owner,
    /// Resolve every comment's `_user`.
    CommentAuthors,
}

#[derive(Debug, Default, Serialize)]
pub struct ArticleExpanded {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_profile: Option<UserProfile>,

    /// Aligned with `children`; `None` where the author is unknown.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub comment_authors: Vec<Option<UserProfile>>,
}

static SCHEMA: Schema = Schema {
    name: "articles",
    required: &["title"],
    unique: &[],
};

#[async_trait]
impl Document for Article {
    type Field = ArticleField;
    type Relation = ArticleRelation;
    type Expanded = ArticleExpanded;

    fn schema() -> &'static Schema {
        &SCHEMA
    }

    async fn expand(
        pool: &SqlitePool,
        records: &[Stored<Self>],
        relations: &[ArticleRelation],
    ) -> Result<Vec<ArticleExpanded>, AppError> {
        let owners = relations.contains(&ArticleRelation::Owner);
        let authors = relations.contains(&ArticleRelation::CommentAuthors);
        if !owners && !authors {
            return Ok(records.iter().map(|_| ArticleExpanded::default()).collect());
        }

        let mut ids = Vec::new();
        for article in records {
            if owners {
                ids.extend(article.owner);
            }
            if authors {
                ids.extend(article.comments.iter().filter_map(|c| c.author));
            }
        }
        ids.sort_unstable();
        ids.dedup();

        let profiles: HashMap<i64, UserProfile> = Model::<SiteUser>::bind(pool.clone())
            .profiles(&ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let lookup = |id: Option<i64>| id.and_then(|id| profiles.get(&id).cloned());

        Ok(records
            .iter()
            .map(|article| ArticleExpanded {
                owner_profile: if owners { lookup(article.owner) } else { None },
                comment_authors: if authors {
                    article.comments.iter().map(|c| lookup(c.author)).collect()
                } else {
                    Vec::new()
                },
            })
            .collect())
    }
}

impl Model<Article> {
    /// Atomically bumps the view counter.
    pub async fn increment_views(&self, id: i64) -> Result<(), AppError> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET doc = json_set(doc, '$.views', \
             IFNULL(json_extract(doc, '$.views'), 0) + 1), updated_at = ? WHERE id = ?",
            self.name()
        ))
        .bind(Utc::now())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Article #{} not found", id)));
        }
        Ok(())
    }
}
