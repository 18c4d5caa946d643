// src/api/client.rs
//! HTTP client for the Notion REST API.
//!
//! This module provides a thin wrapper around reqwest for making
//! HTTP requests to the Notion API. It handles authentication, error body
//! decoding and response envelopes without any retry or crawl logic.

use super::responses::{NotionError, PaginatedResponse};
use super::NotionRepository;
use crate::constants::{
    ERROR_BODY_PREVIEW_LENGTH, NOTION_API_BASE_URL, NOTION_API_PAGE_SIZE, NOTION_VERSION,
    REQUEST_TIMEOUT_SECS,
};
use crate::error::{AppError, NotionErrorCode};
use crate::types::{ApiKey, NodeId};
use reqwest::{header, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

/// A thin wrapper around reqwest Client for Notion API requests.
#[derive(Clone)]
pub struct NotionHttpClient {
    client: Client,
    base_url: String,
}

impl NotionHttpClient {
    /// Creates a new HTTP client with Notion API authentication.
    pub fn new(api_key: &ApiKey) -> Result<Self, AppError> {
        Self::with_base_url(api_key, NOTION_API_BASE_URL)
    }

    /// Creates a client that talks to `base_url` instead of the public API.
    pub fn with_base_url(api_key: &ApiKey, base_url: impl Into<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(Self::create_headers(api_key)?)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Creates the default headers for Notion API requests.
    fn create_headers(api_key: &ApiKey) -> Result<header::HeaderMap, AppError> {
        let mut headers = header::HeaderMap::new();

        let auth_header = format!("Bearer {}", api_key.as_str());
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&auth_header).map_err(|e| {
                AppError::MissingConfiguration(format!("Invalid API token format: {}", e))
            })?,
        );

        headers.insert(
            "Notion-Version",
            header::HeaderValue::from_static(NOTION_VERSION),
        );

        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        Ok(headers)
    }

    async fn get(&self, endpoint: &str, query: &[(&str, String)]) -> Result<Response, AppError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::trace!("GET {}", url);
        Ok(self.client.get(url).query(query).send().await?)
    }

    async fn post<T: Serialize>(&self, endpoint: &str, body: &T) -> Result<Response, AppError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::trace!("POST {}", url);
        Ok(self.client.post(url).json(body).send().await?)
    }
}

#[async_trait::async_trait]
impl NotionRepository for NotionHttpClient {
    async fn retrieve_block(&self, id: &NodeId) -> Result<Value, AppError> {
        let response = self.get(&format!("blocks/{}", id), &[]).await?;
        parse_api_response(extract_response_text(response).await?)
    }

    async fn retrieve_page(&self, id: &NodeId) -> Result<Value, AppError> {
        let response = self.get(&format!("pages/{}", id), &[]).await?;
        parse_api_response(extract_response_text(response).await?)
    }

    async fn retrieve_database(&self, id: &NodeId) -> Result<Value, AppError> {
        let response = self.get(&format!("databases/{}", id), &[]).await?;
        parse_api_response(extract_response_text(response).await?)
    }

    async fn retrieve_children_page(
        &self,
        block_id: &NodeId,
        cursor: Option<&str>,
    ) -> Result<PaginatedResponse, AppError> {
        let mut query = vec![("page_size", NOTION_API_PAGE_SIZE.to_string())];
        if let Some(cursor) = cursor {
            query.push(("start_cursor", cursor.to_string()));
        }
        let response = self
            .get(&format!("blocks/{}/children", block_id), &query)
            .await?;
        parse_api_response(extract_response_text(response).await?)
    }

    async fn query_rows_page(
        &self,
        database_id: &NodeId,
        cursor: Option<&str>,
    ) -> Result<PaginatedResponse, AppError> {
        let mut body = json!({ "page_size": NOTION_API_PAGE_SIZE });
        if let Some(cursor) = cursor {
            body["start_cursor"] = json!(cursor);
        }
        let response = self
            .post(&format!("databases/{}/query", database_id), &body)
            .await?;
        parse_api_response(extract_response_text(response).await?)
    }
}

/// Result of an HTTP operation with response metadata.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: StatusCode,
    pub url: String,
}

/// Extracts the response body as text with metadata.
pub async fn extract_response_text(response: Response) -> Result<ApiResponse<String>, AppError> {
    let status = response.status();
    let url = response.url().to_string();
    let text = response.text().await?;

    Ok(ApiResponse {
        data: text,
        status,
        url,
    })
}

/// Decodes a success body, or maps an error body onto [`AppError::NotionService`].
pub fn parse_api_response<T>(result: ApiResponse<String>) -> Result<T, AppError>
where
    T: DeserializeOwned,
{
    if !result.status.is_success() {
        return Err(parse_error_body(&result.data, result.status, &result.url));
    }

    serde_json::from_str(&result.data).map_err(|e| {
        AppError::MalformedResponse(format!(
            "{} from {}: {}",
            e,
            result.url,
            preview(&result.data)
        ))
    })
}

fn parse_error_body(body: &str, status: StatusCode, url: &str) -> AppError {
    if let Ok(error) = serde_json::from_str::<NotionError>(body) {
        return AppError::NotionService {
            code: NotionErrorCode::from_api_response(&error.code),
            message: error.message,
            status: status.as_u16(),
        };
    }

    // Fallback to the HTTP status when the body is not a Notion error object
    AppError::NotionService {
        code: NotionErrorCode::from_http_status(status.as_u16()),
        message: format!("HTTP {} from {}: {}", status, url, preview(body)),
        status: status.as_u16(),
    }
}

fn preview(body: &str) -> String {
    if body.chars().count() > ERROR_BODY_PREVIEW_LENGTH {
        let head: String = body.chars().take(ERROR_BODY_PREVIEW_LENGTH).collect();
        format!("{}...", head)
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16, body: &str) -> ApiResponse<String> {
        ApiResponse {
            data: body.to_string(),
            status: StatusCode::from_u16(status).unwrap(),
            url: "https://api.notion.com/v1/blocks/b1".to_string(),
        }
    }

    #[test]
    fn test_unparseable_error_body_falls_back_to_status() {
        let err = parse_api_response::<Value>(response(502, "<html>Bad Gateway</html>"))
            .unwrap_err();
        match err {
            AppError::NotionService { code, status, .. } => {
                assert_eq!(code, NotionErrorCode::HttpStatus(502));
                assert_eq!(status, 502);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_success_body() {
        let err = parse_api_response::<Value>(response(200, "{not json")).unwrap_err();
        assert_eq!(err.kind_name(), "MalformedResponse");
    }

    #[test]
    fn test_preview_truncates_long_bodies() {
        let body = "x".repeat(ERROR_BODY_PREVIEW_LENGTH + 50);
        assert_eq!(preview(&body).len(), ERROR_BODY_PREVIEW_LENGTH + 3);
    }
}
