pub mod auth_cmd;
pub mod common;
pub mod completions;
pub mod config;
pub mod delete;
pub mod download;
pub mod list;
pub mod open;
pub mod rename;
pub mod settings;
pub mod show;
pub mod stats;
pub mod upload;
pub mod watch;
