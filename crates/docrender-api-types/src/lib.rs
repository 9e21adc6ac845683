//! Shared request and response types for the docrender HTTP API.
//!
//! These types define the wire contract of `POST /render-docx`,
//! `POST /render-xlsx` and `GET /health`. Deserialization is the schema check:
//! a body that does not fit these shapes is rejected before any rendering runs.

use serde::{Deserialize, Serialize};

/// Body of `POST /render-docx`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRenderRequest {
    /// Full HTML document or fragment to convert.
    pub html: String,
    /// Document title. Used as the heading of the fallback document.
    pub title: String,
}

impl DocumentRenderRequest {
    pub fn new(html: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            title: title.into(),
        }
    }
}

/// A single worksheet cell: a string, a number, or `null` for an empty cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Empty,
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// One worksheet of a workbook request.
///
/// Row length is not checked against the header length; short and long rows
/// are written as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetDefinition {
    /// Worksheet name; truncated to 31 characters when the workbook is built.
    pub name: String,
    /// Header row, written first when non-empty.
    pub headers: Vec<String>,
    /// Data rows in output order.
    pub rows: Vec<Vec<CellValue>>,
}

/// Body of `POST /render-xlsx`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkbookRenderRequest {
    /// Workbook title, stored in the workbook document properties.
    pub title: String,
    /// Sheets in output order. Must not be empty.
    pub sheets: Vec<SheetDefinition>,
}

/// Uniform envelope returned by both render endpoints.
///
/// `error` is the discriminator: on success `data` carries the base64 encoded
/// file and `message` is `null`; on failure `data` is `null` and `message`
/// carries a human-readable diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderResponse {
    #[serde(default)]
    pub data: Option<String>,
    pub error: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl RenderResponse {
    pub fn success(data: impl Into<String>) -> Self {
        Self {
            data: Some(data.into()),
            error: false,
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: true,
            message: Some(message.into()),
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}
