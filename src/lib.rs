pub mod analytics;
pub mod config;
pub mod health;
pub mod models;
pub mod redirect;
pub mod storage;
