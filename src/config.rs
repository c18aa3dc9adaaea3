// src/config.rs

use std::env;
use dotenvy::dotenv;

use crate::models::wx_config::WxConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub admin_username: Option<String>,
    pub admin_password: Option<String>,
    /// WeChat credentials seeded into the `wxes` collection when present.
    pub wx: Option<WxConfig>,
    /// Number of fresh invite codes to issue at startup.
    pub issue_invite_codes: usize,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://blog.db".to_string());

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let admin_username = env::var("ADMIN_USERNAME").ok();
        let admin_password = env::var("ADMIN_PASSWORD").ok();

        let wx = env::var("WX_TOKEN").ok().map(|token| WxConfig {
            token: Some(token),
            app_id: env::var("WX_APPID").ok(),
            app_secret: env::var("WX_APP_SECRET").ok(),
            encoding_aes_key: env::var("WX_ENCODING_AES_KEY").ok(),
        });

        let issue_invite_codes = env::var("ISSUE_INVITE_CODES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        Self {
            database_url,
            rust_log,
            admin_username,
            admin_password,
            wx,
            issue_invite_codes,
        }
    }
}
