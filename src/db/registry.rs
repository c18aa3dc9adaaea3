// src/db/registry.rs

use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard, PoisonError},
};

use sqlx::SqlitePool;

use crate::{
    db::model::{Document, Model},
    error::AppError,
    models::{
        article::Article, auto_reply::AutoReplyRule, invite_code::InviteCode, reader::Reader,
        user::SiteUser, wx_config::WxConfig,
    },
};

/// Owns one handle per collection.
///
/// Built once at startup and passed by reference to whatever needs data
/// access. Every schema name can be defined exactly once per registry.
#[derive(Debug)]
pub struct Registry {
    pool: SqlitePool,
    defined: Mutex<HashSet<&'static str>>,
    wx_configs: Model<WxConfig>,
    invite_codes: Model<InviteCode>,
    auto_replies: Model<AutoReplyRule>,
    readers: Model<Reader>,
    users: Model<SiteUser>,
    articles: Model<Article>,
}

impl Registry {
    /// Defines all collections against `pool`.
    pub async fn open(pool: SqlitePool) -> Result<Self, AppError> {
        let defined = Mutex::new(HashSet::new());

        let wx_configs = define_on::<WxConfig>(&pool, &defined).await?;
        let invite_codes = define_on::<InviteCode>(&pool, &defined).await?;
        let auto_replies = define_on::<AutoReplyRule>(&pool, &defined).await?;
        let readers = define_on::<Reader>(&pool, &defined).await?;
        let users = define_on::<SiteUser>(&pool, &defined).await?;
        let articles = define_on::<Article>(&pool, &defined).await?;

        tracing::info!("Schema registry ready");

        Ok(Self {
            pool,
            defined,
            wx_configs,
            invite_codes,
            auto_replies,
            readers,
            users,
            articles,
        })
    }

    /// Defines an additional collection.
    /// Fails with `DuplicateSchema` if the name is already taken.
    pub async fn define<D: Document>(&self) -> Result<Model<D>, AppError> {
        define_on::<D>(&self.pool, &self.defined).await
    }

    pub fn is_defined(&self, name: &str) -> bool {
        lock_names(&self.defined).contains(name)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn wx_configs(&self) -> &Model<WxConfig> {
        &self.wx_configs
    }

    pub fn invite_codes(&self) -> &Model<InviteCode> {
        &self.invite_codes
    }

    pub fn auto_replies(&self) -> &Model<AutoReplyRule> {
        &self.auto_replies
    }

    pub fn readers(&self) -> &Model<Reader> {
        &self.readers
    }

    pub fn users(&self) -> &Model<SiteUser> {
        &self.users
    }

    pub fn articles(&self) -> &Model<Article> {
        &self.articles
    }
}

async fn define_on<D: Document>(
    pool: &SqlitePool,
    defined: &Mutex<HashSet<&'static str>>,
) -> Result<Model<D>, AppError> {
    let schema = D::schema();

    if !lock_names(defined).insert(schema.name) {
        return Err(AppError::DuplicateSchema(schema.name));
    }

    for statement in schema.ddl() {
        if let Err(e) = sqlx::query(&statement).execute(pool).await {
            tracing::error!("Failed to define schema {}: {:?}", schema.name, e);
            lock_names(defined).remove(schema.name);
            return Err(AppError::from(e));
        }
    }

    tracing::debug!("Defined schema {}", schema.name);
    Ok(Model::bind(pool.clone()))
}

/// The name set stays consistent across a panic in another holder, since
/// every update is a single insert or remove, so a poisoned lock is reused.
fn lock_names<'a>(
    defined: &'a Mutex<HashSet<&'static str>>,
) -> MutexGuard<'a, HashSet<&'static str>> {
    defined.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::panic::{AssertUnwindSafe, catch_unwind};

    use super::*;
    use crate::db;

    #[tokio::test]
    async fn poisoned_name_set_still_answers() {
        let registry = Registry::open(db::connect_in_memory().await.unwrap())
            .await
            .unwrap();

        let _ = catch_unwind(AssertUnwindSafe(|| {
            let _guard = registry.defined.lock().unwrap();
            panic!("holder panicked");
        }));
        assert!(registry.defined.is_poisoned());

        assert!(registry.is_defined("articles"));
        assert!(!registry.is_defined("nonexistent"));

        let err = registry.define::<Article>().await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateSchema("articles")));
    }
}
