//! Documents API wire types
//!
//! Request and response bodies exchanged with `/api/v1/documents`. The backend
//! omits or nulls collections freely, so every list field defaults to empty.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Lifecycle state of a document
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Review,
    Published,
    Archived,
}

/// A stored revision of a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentVersion {
    pub version_number: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub storage_path: String,
}

/// Who may read, write and administer a document
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentPermissions {
    #[serde(default)]
    pub owner_id: String,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub read_access: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub write_access: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub admin_access: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentMetadata {
    #[serde(default)]
    pub file_size: i64,
    #[serde(default)]
    pub original_extension: String,
    #[serde(default)]
    pub last_viewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub is_template: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_fields: HashMap<String, serde_json::Value>,
}

/// Full document as returned by `GET /{id}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<String>,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub version_history: Vec<DocumentVersion>,
    #[serde(default)]
    pub storage_path: String,
    #[serde(default)]
    pub permissions: DocumentPermissions,
    #[serde(default)]
    pub metadata: DocumentMetadata,
}

/// Row of the document listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub author_id: String,
    #[serde(default)]
    pub author_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub status: DocumentStatus,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub categories: Vec<String>,
    #[serde(default)]
    pub version_count: u32,
}

/// Query parameters of `GET /list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentListQuery {
    /// 1-based page number
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
}

impl Default for DocumentListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            search: None,
        }
    }
}

impl DocumentListQuery {
    /// Query-string pairs; a blank search term is left out
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.max(1).to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ];
        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            pairs.push(("search".to_string(), search.to_string()));
        }
        pairs
    }
}

/// Body of `GET /list`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub documents: Vec<DocumentSummary>,
    #[serde(default, alias = "total_documents")]
    pub total: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub limit: u64,
}

/// Body of `POST /` and `PUT /{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DocumentDraft {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<DocumentStatus>,
    /// Change note recorded in the version history
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedDocument {
    #[serde(default)]
    pub message: String,
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatedDocument {
    #[serde(default)]
    pub message: String,
    pub id: String,
}

/// Temporary download location for a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadLink {
    pub download_url: String,
    #[serde(default)]
    pub expires_in: String,
    #[serde(default)]
    pub filename: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
