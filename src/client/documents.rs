//! Documents API Client
//!
//! Async client for `/api/v1/documents`. Every call goes through the session
//! gateway, so an expired session is refreshed transparently and a dead one
//! surfaces as an unauthorized [`ClientError`] while the gateway broadcasts
//! `AuthChanged { is_authenticated: false }`.

use bytes::Bytes;

use crate::client::error::ClientError;
use crate::client::gateway::SessionGateway;
use crate::client::transport::{ApiRequest, ReqwestTransport, Transport};
use crate::shared::documents::{
    CreatedDocument, Document, DocumentDraft, DocumentList, DocumentListQuery, DownloadLink,
    UpdatedDocument,
};
use crate::shared::identity::MessageResponse;

/// Base path of the documents service
pub const DOCUMENTS_BASE: &str = "/api/v1/documents";

/// Documents API client
pub struct DocumentClient<T: Transport = ReqwestTransport> {
    gateway: SessionGateway<T>,
}

impl<T: Transport> Clone for DocumentClient<T> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
        }
    }
}

impl<T: Transport> DocumentClient<T> {
    pub fn new(gateway: SessionGateway<T>) -> Self {
        Self { gateway }
    }

    /// Paginated listing of the caller's documents
    pub async fn list(&self, query: &DocumentListQuery) -> Result<DocumentList, ClientError> {
        if query.limit == 0 {
            return Err(ClientError::validation("limit", "Limit must be at least 1"));
        }
        let request = ApiRequest::get(resolve_path("/list")).query_pairs(query.to_pairs());
        let response = self.gateway.send(request).await?;
        let list: DocumentList = response.json()?;
        tracing::debug!(
            "[Documents] Listed {} of {} documents",
            list.documents.len(),
            list.total
        );
        Ok(list)
    }

    pub async fn get(&self, id: &str) -> Result<Document, ClientError> {
        let path = document_path(id, "")?;
        let response = self.gateway.get(&path).await?;
        Ok(response.json()?)
    }

    pub async fn create(&self, draft: &DocumentDraft) -> Result<CreatedDocument, ClientError> {
        validate_draft(draft)?;
        let response = self.gateway.post(&resolve_path("/"), draft).await?;
        Ok(response.json()?)
    }

    pub async fn update(&self, id: &str, draft: &DocumentDraft) -> Result<UpdatedDocument, ClientError> {
        let path = document_path(id, "")?;
        validate_draft(draft)?;
        let response = self.gateway.put(&path, draft).await?;
        Ok(response.json()?)
    }

    pub async fn delete(&self, id: &str) -> Result<MessageResponse, ClientError> {
        let path = document_path(id, "")?;
        let response = self.gateway.delete(&path).await?;
        Ok(response.json().unwrap_or_default())
    }

    /// Temporary download URL for the stored file
    pub async fn download_link(&self, id: &str) -> Result<DownloadLink, ClientError> {
        let path = document_path(id, "/download")?;
        let response = self.gateway.get(&path).await?;
        Ok(response.json()?)
    }

    /// Raw file contents
    pub async fn download_file(&self, id: &str) -> Result<Bytes, ClientError> {
        let path = document_path(id, "/download/file")?;
        let response = self.gateway.get(&path).await?;
        Ok(response.into_bytes())
    }
}

/// Full path for a documents endpoint
///
/// Callers sometimes pass paths that already carry the service prefix; it is
/// stripped once so it never ends up doubled.
pub fn resolve_path(path: &str) -> String {
    let relative = path.strip_prefix(DOCUMENTS_BASE).unwrap_or(path);
    if relative.is_empty() {
        format!("{}/", DOCUMENTS_BASE)
    } else if relative.starts_with('/') {
        format!("{}{}", DOCUMENTS_BASE, relative)
    } else {
        format!("{}/{}", DOCUMENTS_BASE, relative)
    }
}

fn document_path(id: &str, suffix: &str) -> Result<String, ClientError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(ClientError::validation("id", "Document id is required"));
    }
    // `.` and `..` would be collapsed by URL resolution and leave the service path
    if id.contains(['/', '?', '#']) || id == "." || id == ".." {
        return Err(ClientError::validation("id", "Document id contains reserved characters"));
    }
    Ok(resolve_path(&format!("/{}{}", id, suffix)))
}

fn validate_draft(draft: &DocumentDraft) -> Result<(), ClientError> {
    if draft.title.trim().is_empty() {
        return Err(ClientError::validation("title", "Title is required"));
    }
    if draft.content.trim().is_empty() {
        return Err(ClientError::validation("content", "Content is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path("/list"), "/api/v1/documents/list");
        assert_eq!(resolve_path("list"), "/api/v1/documents/list");
        assert_eq!(resolve_path("/"), "/api/v1/documents/");
        assert_eq!(resolve_path(""), "/api/v1/documents/");
    }

    #[test]
    fn test_resolve_path_strips_duplicated_prefix() {
        assert_eq!(resolve_path("/api/v1/documents/abc"), "/api/v1/documents/abc");
        assert_eq!(resolve_path("/api/v1/documents"), "/api/v1/documents/");
    }

    #[test]
    fn test_document_path() {
        assert_eq!(document_path("abc", "").unwrap(), "/api/v1/documents/abc");
        assert_eq!(
            document_path(" abc ", "/download").unwrap(),
            "/api/v1/documents/abc/download"
        );
        assert!(matches!(
            document_path("  ", ""),
            Err(ClientError::Validation { field: "id", .. })
        ));
        assert!(document_path("a/b", "").is_err());
        assert!(document_path("a?b", "").is_err());
    }

    #[test]
    fn test_document_path_rejects_dot_segments() {
        for id in [".", "..", " .. "] {
            assert!(matches!(
                document_path(id, "/download"),
                Err(ClientError::Validation { field: "id", .. })
            ));
        }
        assert_eq!(document_path("v1.2", "").unwrap(), "/api/v1/documents/v1.2");
    }

    #[test]
    fn test_validate_draft() {
        let mut draft = DocumentDraft {
            title: "Plan".to_string(),
            content: "text".to_string(),
            ..Default::default()
        };
        assert!(validate_draft(&draft).is_ok());

        draft.content = " ".to_string();
        assert!(matches!(
            validate_draft(&draft),
            Err(ClientError::Validation { field: "content", .. })
        ));

        draft.title = String::new();
        assert!(matches!(
            validate_draft(&draft),
            Err(ClientError::Validation { field: "title", .. })
        ));
    }
}
