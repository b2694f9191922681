//! filestacker-core - Core library for FileStacker
//!
//! This crate contains the shared models, the backend HTTP client, and the
//! client-side components used by every FileStacker front-end: the session
//! gateway, the file catalog client with its polling loop, the sequential
//! upload pipeline, the per-file action dispatcher, and the notification
//! center. `AppContext` ties them together.

pub mod actions;
pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod notifications;
pub mod upload;
pub mod util;

#[cfg(test)]
mod testing;

pub use context::AppContext;
pub use error::{Error, Result};
pub use models::{FileId, FileRecord, Session};
