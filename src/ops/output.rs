//! Operation results

use crate::collection::Page;
use crate::export::ExportStream;
use crate::model::Record;
use crate::ops::error::OperationResult;

/// Result of a named operation
#[derive(Debug)]
pub enum OperationOutput {
    /// One page of a listing
    Page(Page),
    /// A single record
    Record(Record),
    /// Plain text
    Text(String),
    /// Structured reference data
    Json(serde_json::Value),
    /// CSV lines, produced on demand
    Export(ExportStream),
}

impl OperationOutput {
    /// MIME type of the rendered output
    pub fn content_type(&self) -> &'static str {
        match self {
            OperationOutput::Page(_) | OperationOutput::Record(_) | OperationOutput::Json(_) => "application/json",
            OperationOutput::Text(_) => "text/plain; charset=utf-8",
            OperationOutput::Export(_) => "text/csv; charset=utf-8",
        }
    }

    /// JSON form of buffered outputs; `None` for text and CSV
    pub fn to_json(&self) -> Option<serde_json::Value> {
        match self {
            OperationOutput::Page(page) => serde_json::to_value(page).ok(),
            OperationOutput::Record(record) => Some(record.to_json()),
            OperationOutput::Json(value) => Some(value.clone()),
            OperationOutput::Text(_) | OperationOutput::Export(_) => None,
        }
    }

    /// Render as text, draining a CSV export
    pub async fn into_text(self) -> OperationResult<String> {
        match self {
            OperationOutput::Text(text) => Ok(text),
            OperationOutput::Export(stream) => Ok(stream.collect_string().await?),
            other => Ok(other
                .to_json()
                .map(|v| serde_json::to_string_pretty(&v).unwrap_or_default())
                .unwrap_or_default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::ExportFormatter;

    #[tokio::test]
    async fn test_into_text() {
        let page = Page {
            count: Some(0),
            size: 10,
            list: Vec::new(),
            cursor: None,
        };
        let text = OperationOutput::Page(page).into_text().await.unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["count"], 0);
        assert!(value.get("cursor").is_none());

        let stream = ExportStream::spawn(
            ExportFormatter::with_columns(["id"]),
            vec![Record::new().with("id", "d1")],
            4,
        );
        let output = OperationOutput::Export(stream);
        assert_eq!(output.content_type(), "text/csv; charset=utf-8");
        assert_eq!(output.into_text().await.unwrap(), "id\nd1\n");
    }
}
