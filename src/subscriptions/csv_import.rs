//! CSV bulk upload
//!
//! The file is sent to the backend untouched; this module only loads it,
//! checks it looks like a CSV, and can parse it locally for a dry-run
//! preview.
//!
//! Expected header: `name,cost,subscription_date,renewal_type`

use chrono::NaiveDate;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

use super::types::{NewSubscription, RenewalType, SubscriptionDraft};
use crate::derive::renewal_date;
use crate::error::{ClientError, ClientResult};

/// Columns the backend requires, in documentation order
pub const REQUIRED_COLUMNS: [&str; 4] = ["name", "cost", "subscription_date", "renewal_type"];

/// Multipart part name the backend reads the file from
pub const FILE_FIELD: &str = "file";

const MAX_REPORTED_ERRORS: usize = 100;

/// A CSV file ready to upload
#[derive(Debug, Clone)]
pub struct BulkUploadFile {
    file_name: String,
    bytes: Vec<u8>,
}

/// A row that would be imported
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewRow {
    pub line: usize,
    pub draft: SubscriptionDraft,
    pub renewal_date: Option<NaiveDate>,
}

/// Result of parsing the file locally
#[derive(Debug, Default, Serialize)]
pub struct CsvPreview {
    pub rows: Vec<PreviewRow>,
    pub rows_failed: usize,
    pub errors: Vec<String>,
}

impl BulkUploadFile {
    /// Wrap in-memory content; `file_name` must end in `.csv`
    pub fn from_bytes(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> ClientResult<Self> {
        let file_name = file_name.into();
        if !file_name.ends_with(".csv") {
            return Err(ClientError::Validation("File is not a CSV".to_string()));
        }

        Ok(Self {
            file_name,
            bytes: bytes.into(),
        })
    }

    /// Read a `.csv` file from disk
    pub async fn from_path(path: &Path) -> ClientResult<Self> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| ClientError::Validation("Please select a file to upload".to_string()))?;

        if !file_name.ends_with(".csv") {
            return Err(ClientError::Validation("File is not a CSV".to_string()));
        }

        let bytes = tokio::fs::read(path).await?;
        Self::from_bytes(file_name, bytes)
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Multipart form with the raw file under [`FILE_FIELD`]
    pub fn into_form(self) -> ClientResult<Form> {
        let part = Part::bytes(self.bytes)
            .file_name(self.file_name)
            .mime_str("text/csv")?;
        Ok(Form::new().part(FILE_FIELD, part))
    }

    /// Parse rows locally with the same rules as the add-subscription form.
    ///
    /// Fails only when the header is missing a required column; bad rows are
    /// counted and reported per line.
    pub fn preview(&self) -> ClientResult<CsvPreview> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(self.bytes.as_slice());

        let headers = reader
            .headers()
            .map_err(|e| ClientError::Validation(format!("Unreadable CSV header: {}", e)))?
            .clone();

        let columns: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name, idx))
            .collect();

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !columns.contains_key(c))
            .collect();
        if !missing.is_empty() {
            return Err(ClientError::Validation(format!(
                "Missing required columns: {}",
                missing.join(", ")
            )));
        }

        let mut preview = CsvPreview::default();

        for (idx, result) in reader.records().enumerate() {
            // header is line 1
            let line = idx + 2;

            let parsed = result
                .map_err(|e| e.to_string())
                .and_then(|record| {
                    let field = |name: &str| record.get(columns[name]).unwrap_or("").to_string();
                    parse_row(
                        &field("name"),
                        &field("cost"),
                        &field("subscription_date"),
                        &field("renewal_type"),
                    )
                });

            match parsed {
                Ok(draft) => preview.rows.push(PreviewRow {
                    line,
                    renewal_date: renewal_date(draft.subscription_date, draft.renewal_type),
                    draft,
                }),
                Err(e) => {
                    preview.rows_failed += 1;
                    preview.errors.push(format!("Line {}: {}", line, e));
                }
            }
        }

        if preview.errors.len() > MAX_REPORTED_ERRORS {
            let total = preview.errors.len();
            preview.errors.truncate(MAX_REPORTED_ERRORS);
            preview
                .errors
                .push(format!("... and {} more errors", total - MAX_REPORTED_ERRORS));
        }

        Ok(preview)
    }
}

fn parse_row(name: &str, cost: &str, date: &str, renewal: &str) -> Result<SubscriptionDraft, String> {
    let renewal_type: RenewalType = renewal.parse()?;

    let mut input = NewSubscription::new(name, cost).renewal_type(renewal_type);
    if !date.is_empty() {
        let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| format!("Invalid subscription_date '{}': expected YYYY-MM-DD", date))?;
        input = input.subscription_date(parsed);
    }

    input.validate().map_err(|e| e.user_message("Invalid row"))
}
