// src/models/mod.rs

pub mod article;
pub mod auto_reply;
pub mod invite_code;
pub mod reader;
pub mod user;
pub mod wx_config;
