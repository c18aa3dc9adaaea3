// src/models/reader.rs

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use validator::Validate;

use crate::{
    db::{Document, Field, FieldPath, Filter, Model, Schema, Stored},
    error::AppError,
    models::article::{Article, ArticleField},
};

/// A visitor known through the external comment system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Reader {
    pub username: String,

    /// Id in the external comment system.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duoshuo_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(url)]
    pub avatar_url: Option<String>,

    /// Ids of favorited articles, oldest first.
    #[serde(default)]
    pub favorites: Vec<i64>,
}

impl Reader {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            duoshuo_id: None,
            url: None,
            avatar_url: None,
            favorites: Vec::new(),
        }
    }

    /// Returns `false` if the article was already a favorite.
    pub fn favorite(&mut self, article_id: i64) -> bool {
        if self.has_favorited(article_id) {
            return false;
        }
        self.favorites.push(article_id);
        true
    }

    /// Returns `false` if the article was not a favorite.
    pub fn unfavorite(&mut self, article_id: i64) -> bool {
        let before = self.favorites.len();
        self.favorites.retain(|id| *id != article_id);
        self.favorites.len() != before
    }

    pub fn has_favorited(&self, article_id: i64) -> bool {
        self.favorites.contains(&article_id)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum ReaderField {
    Id,
    CreatedAt,
    UpdatedAt,
    Username,
    DuoshuoId,
    Favorites,
}

impl Field for ReaderField {
    fn path(self) -> FieldPath {
        match self {
            ReaderField::Id => FieldPath::Id,
            ReaderField::CreatedAt => FieldPath::CreatedAt,
            ReaderField::UpdatedAt => FieldPath::UpdatedAt,
            ReaderField::Username => FieldPath::Doc("username"),
            ReaderField::DuoshuoId => FieldPath::Doc("duoshuo_id"),
            ReaderField::Favorites => FieldPath::Doc("favorites"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderRelation {
    /// Resolve `favorites` into the article records.
    Favorites,
}

#[derive(Debug, Default, Serialize)]
pub struct ReaderExpanded {
    /// Favorited articles still present, in `favorites` order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite_articles: Option<Vec<Stored<Article>>>,
}

static SCHEMA: Schema = Schema {
    name: "readers",
    required: &["username"],
    unique: &[],
};

#[async_trait]
impl Document for Reader {
    type Field = ReaderField;
    type Relation = ReaderRelation;
    type Expanded = ReaderExpanded;

    fn schema() -> &'static Schema {
        &SCHEMA
    }

    async fn expand(
        pool: &SqlitePool,
        records: &[Stored<Self>],
        relations: &[ReaderRelation],
    ) -> Result<Vec<ReaderExpanded>, AppError> {
        if !relations.contains(&ReaderRelation::Favorites) {
            return Ok(records.iter().map(|_| ReaderExpanded::default()).collect());
        }

        let mut ids: Vec<i64> = records.iter().flat_map(|r| r.favorites.iter().copied()).collect();
        ids.sort_unstable();
        ids.dedup();

        let articles = Model::<Article>::bind(pool.clone())
            .find(&Filter::any_of(ArticleField::Id, ids), &[], 0, None)
            .await?;
        let by_id: HashMap<i64, Stored<Article>> =
            articles.into_iter().map(|a| (a.id, a)).collect();

        Ok(records
            .iter()
            .map(|reader| ReaderExpanded {
                favorite_articles: Some(
                    reader
                        .favorites
                        .iter()
                        .filter_map(|id| by_id.get(id).cloned())
                        .collect(),
                ),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn favorites_stay_unique() {
        let mut reader = Reader::new("visitor");
        assert!(reader.favorite(3));
        assert!(!reader.favorite(3));
        assert!(reader.favorite(7));
        assert_eq!(reader.favorites, vec![3, 7]);

        assert!(reader.unfavorite(3));
        assert!(!reader.unfavorite(3));
        assert!(!reader.has_favorited(3));
        assert!(reader.has_favorited(7));
    }

    #[test]
    fn avatar_must_be_a_url() {
        let mut reader = Reader::new("visitor");
        reader.avatar_url = Some("not a url".into());
        assert!(reader.validate().is_err());
        reader.avatar_url = Some("https://example.com/a.png".into());
        assert!(reader.validate().is_ok());
    }
}
