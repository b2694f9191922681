//! File record models
//!
//! `RawFileRecord` mirrors what the backend returns; `FileRecord` is the
//! display projection. Derived fields are recomputed from the raw record on
//! every fetch and never stored on their own.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Error;

const UNKNOWN_OWNER: &str = "Unknown";
const SIZE_UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

/// Backend-assigned file identifier. Opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FileId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Display category of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Pdf,
    Sheet,
    Doc,
    #[default]
    File,
}

impl FileKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Pdf => "pdf",
            Self::Sheet => "sheet",
            Self::Doc => "doc",
            Self::File => "file",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for FileKind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "pdf" => Ok(Self::Pdf),
            "sheet" => Ok(Self::Sheet),
            "doc" => Ok(Self::Doc),
            "file" => Ok(Self::File),
            other => Err(Error::InvalidInput(format!("unknown file kind '{other}'"))),
        }
    }
}

/// Derive the display kind from a backend `file_type` and the filename.
///
/// `file_type` may be a MIME type or an already-derived kind label.
pub fn derive_kind(file_type: Option<&str>, filename: &str) -> FileKind {
    let file_type = file_type
        .map(|value| value.trim().to_ascii_lowercase())
        .filter(|value| !value.is_empty())
        .or_else(|| {
            mime_guess::from_path(filename)
                .first()
                .map(|mime| mime.essence_str().to_string())
        })
        .unwrap_or_default();

    if let Ok(kind) = file_type.parse::<FileKind>() {
        return kind;
    }
    if file_type.starts_with("image/") {
        return FileKind::Image;
    }
    if file_type == "application/pdf" {
        return FileKind::Pdf;
    }

    match file_extension(filename).as_deref() {
        Some("xlsx" | "xls" | "csv") => FileKind::Sheet,
        Some("doc" | "docx") => FileKind::Doc,
        _ => FileKind::File,
    }
}

/// Render a byte count with base-1024 units, e.g. `5.0 MB`.
pub fn human_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} {}", SIZE_UNITS[0]);
    }

    #[allow(clippy::cast_precision_loss)]
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", SIZE_UNITS[unit])
}

fn file_extension(filename: &str) -> Option<String> {
    let (_, extension) = filename.rsplit_once('.')?;
    let extension = extension.trim().to_ascii_lowercase();
    if extension.is_empty() {
        None
    } else {
        Some(extension)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRef {
    pub user_name: Option<String>,
}

/// File record as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFileRecord {
    #[serde(alias = "id", deserialize_with = "string_or_number")]
    pub file_id: String,
    pub filename: String,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default, deserialize_with = "size_from_number")]
    pub file_size: u64,
    #[serde(default)]
    pub uploaded_at: Option<String>,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub owner: Option<OwnerRef>,
    #[serde(default)]
    pub storage_path: Option<String>,
}

/// Display projection of a backend file record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileRecord {
    pub id: FileId,
    pub filename: String,
    pub kind: FileKind,
    pub human_size: String,
    pub uploaded_at: String,
    pub owner_name: String,
    pub storage_path: Option<String>,
    pub size_bytes: u64,
}

impl FileRecord {
    pub fn from_raw(raw: RawFileRecord) -> Self {
        let kind = derive_kind(raw.file_type.as_deref(), &raw.filename);
        let owner_name = raw
            .owner_name
            .or_else(|| raw.owner.and_then(|owner| owner.user_name))
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_OWNER.to_string());
        let storage_path = raw
            .storage_path
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty());

        Self {
            id: FileId(raw.file_id),
            filename: raw.filename,
            kind,
            human_size: human_size(raw.file_size),
            uploaded_at: raw.uploaded_at.unwrap_or_default(),
            owner_name,
            storage_path,
            size_bytes: raw.file_size,
        }
    }

    /// Upload time as Unix milliseconds, when the backend timestamp parses.
    ///
    /// Accepts RFC 3339 and offset-less ISO timestamps (treated as UTC).
    pub fn uploaded_at_millis(&self) -> Option<i64> {
        let value = self.uploaded_at.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
            return Some(parsed.timestamp_millis());
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
            .map(|naive| naive.and_utc().timestamp_millis())
    }
}

impl From<RawFileRecord> for FileRecord {
    fn from(raw: RawFileRecord) -> Self {
        Self::from_raw(raw)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match Repr::deserialize(deserializer)? {
        Repr::Text(text) => text,
        Repr::Number(number) => number.to_string(),
    })
}

fn size_from_number<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = Option::<serde_json::Number>::deserialize(deserializer)?;
    Ok(number.map_or(0, |number| {
        number.as_u64().unwrap_or_else(|| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            number.as_f64().map_or(0, |value| value.max(0.0) as u64)
        })
    }))
}
