/**
 * HTTP Transport
 *
 * The gateway never talks to the network directly; it hands `ApiRequest`s to
 * a `Transport` and gets back whatever status the backend produced. Session
 * credentials live entirely on this side of the boundary: `ReqwestTransport`
 * keeps them in a cookie jar that attaches the current cookie to every
 * request and stores replacements issued by login and refresh responses.
 */

use std::future::Future;
use std::sync::Arc;

use bytes::Bytes;
use reqwest::cookie::Jar;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::shared::config::GatewayConfig;
use crate::shared::error::GatewayError;

/// Something that can put an `ApiRequest` on the wire
///
/// Implementations return every HTTP response as `Ok`, whatever its status;
/// only failures to obtain a response at all are `Err`.
pub trait Transport: Send + Sync + 'static {
    fn execute(
        &self,
        request: &ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, GatewayError>> + Send;
}

/// Request payload
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(serde_json::Value),
    Bytes { content_type: String, data: Bytes },
}

/// One outbound API call
#[derive(Debug, Clone)]
pub struct ApiRequest {
    id: Uuid,
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: HeaderMap,
    body: Option<RequestBody>,
    exempt: bool,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            exempt: false,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, GatewayError> {
        let value = serde_json::to_value(body)
            .map_err(|e| GatewayError::invalid_request(format!("unserializable body: {}", e)))?;
        self.body = Some(RequestBody::Json(value));
        Ok(self)
    }

    /// Attach a raw body
    pub fn bytes(mut self, content_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        self.body = Some(RequestBody::Bytes {
            content_type: content_type.into(),
            data: data.into(),
        });
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn query_pairs(mut self, pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Result<Self, GatewayError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| GatewayError::invalid_request(format!("header name {:?}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| GatewayError::invalid_request(format!("header value for {}: {}", name, e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Exempt this request from session refresh handling
    ///
    /// A 401 on an exempt request is returned to the caller as-is. Used for the
    /// refresh call itself and for login.
    pub fn exempt(mut self) -> Self {
        self.exempt = true;
        self
    }

    /// Identifier used to correlate log lines for this request
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    pub fn is_exempt(&self) -> bool {
        self.exempt
    }

    /// Whether this request has already been replayed after a refresh
    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// Whether a 401 on this request may start (or join) a refresh cycle
    pub fn refreshable(&self) -> bool {
        !self.exempt && !self.retried
    }
}

/// Response as produced by the transport, any status
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl ApiResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Response with a JSON body, mostly for tests and fakes
    pub fn json_body(status: StatusCode, body: &serde_json::Value) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self::new(status, headers, Bytes::from(body.to_string()))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn into_bytes(self) -> Bytes {
        self.body
    }

    /// Body as UTF-8 text, lossily
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// `Ok(self)` for 2xx, `GatewayError::Status` otherwise
    pub fn error_for_status(self) -> Result<Self, GatewayError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(GatewayError::status(self.status.as_u16(), self.text()))
        }
    }
}

/// `reqwest`-backed transport with a cookie jar holding the session
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    config: GatewayConfig,
    client: Client,
    cookies: Arc<Jar>,
}

impl ReqwestTransport {
    /// Create a transport with a fresh, empty cookie jar
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayError> {
        Self::with_cookie_jar(config, Arc::new(Jar::default()))
    }

    /// Create a transport sharing an existing cookie jar
    pub fn with_cookie_jar(config: GatewayConfig, cookies: Arc<Jar>) -> Result<Self, GatewayError> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .cookie_provider(cookies.clone())
            .default_headers(default_headers)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            config,
            client,
            cookies,
        })
    }

    /// The cookie jar holding the session credential
    pub fn cookie_jar(&self) -> Arc<Jar> {
        self.cookies.clone()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

impl Transport for ReqwestTransport {
    async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse, GatewayError> {
        let url = self
            .config
            .endpoint(request.path())
            .map_err(|e| GatewayError::invalid_request(e.to_string()))?;

        let mut builder = self
            .client
            .request(request.method().clone(), url)
            .headers(request.headers().clone());
        if !request.query_params().is_empty() {
            builder = builder.query(request.query_params());
        }
        builder = match request.body() {
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Bytes { content_type, data }) => builder
                .header(CONTENT_TYPE, content_type.as_str())
                .body(data.clone()),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        tracing::trace!(
            "[Transport] {} {} -> {} ({} bytes)",
            request.method(),
            request.path(),
            status,
            body.len()
        );

        Ok(ApiResponse::new(status, headers, body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let request = ApiRequest::get("/api/v1/documents/list")
            .query("page", "1")
            .query("limit", "10");
        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.path(), "/api/v1/documents/list");
        assert_eq!(request.query_params().len(), 2);
        assert!(request.body().is_none());
        assert!(request.refreshable());
    }

    #[test]
    fn test_exempt_request_is_not_refreshable() {
        let request = ApiRequest::post("/api/v1/identity/login").exempt();
        assert!(request.is_exempt());
        assert!(!request.refreshable());
    }

    #[test]
    fn test_retried_request_is_not_refreshable() {
        let mut request = ApiRequest::get("/api/v1/identity/me");
        request.mark_retried();
        assert!(request.is_retried());
        assert!(!request.refreshable());
    }

    #[test]
    fn test_clone_keeps_identity() {
        let request = ApiRequest::delete("/api/v1/documents/abc");
        assert_eq!(request.clone().id(), request.id());
    }

    #[test]
    fn test_json_body() {
        let request = ApiRequest::post("/api/v1/identity/login")
            .json(&serde_json::json!({"email": "ana@example.com"}))
            .unwrap();
        match request.body() {
            Some(RequestBody::Json(value)) => assert_eq!(value["email"], "ana@example.com"),
            other => panic!("Expected JSON body, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_header_is_rejected() {
        let result = ApiRequest::get("/").header("bad header", "x");
        assert!(matches!(result, Err(GatewayError::InvalidRequest { .. })));
    }

    #[test]
    fn test_error_for_status() {
        let ok = ApiResponse::json_body(StatusCode::OK, &serde_json::json!({"message": "ok"}));
        assert!(ok.error_for_status().is_ok());

        let unauthorized =
            ApiResponse::json_body(StatusCode::UNAUTHORIZED, &serde_json::json!({"error": "expired"}));
        let err = unauthorized.error_for_status().unwrap_err();
        assert!(err.is_unauthorized());
        assert!(err.to_string().contains("expired"));
    }

    #[test]
    fn test_response_json() {
        let response = ApiResponse::json_body(StatusCode::OK, &serde_json::json!({"message": "hi"}));
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["message"], "hi");
        assert_eq!(response.text(), r#"{"message":"hi"}"#);
    }
}
