//! Buffering of multipart form bodies into text fields and files.

use axum::extract::Multipart;
use serde_json::Value;
use std::collections::HashMap;

use super::error::ApiError;
use crate::uploads::IncomingFile;

/// A fully read multipart body
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: Vec<IncomingFile>,
}

impl FormData {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = FormData::default();
        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await?;
                    // Browsers send an empty part for an untouched file input
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    form.files.push(IncomingFile {
                        field: name,
                        file_name,
                        content_type,
                        bytes,
                    });
                }
                None => {
                    let text = field.text().await?;
                    form.fields.insert(name, text);
                }
            }
        }
        Ok(form)
    }

    /// Non-blank text value
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Submitted text value, blank or not
    pub fn submitted(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    /// Text value with blanks kept, defaulting to empty
    pub fn raw(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    pub fn number(&self, name: &str) -> Result<Option<f64>, ApiError> {
        self.text(name)
            .map(|v| {
                v.parse::<f64>()
                    .map_err(|_| ApiError::validation_field(name, format!("{} must be a number", name)))
            })
            .transpose()
    }

    pub fn integer(&self, name: &str) -> Result<Option<i64>, ApiError> {
        self.text(name)
            .map(|v| {
                v.parse::<i64>().map_err(|_| {
                    ApiError::validation_field(name, format!("{} must be a whole number", name))
                })
            })
            .transpose()
    }

    /// A loosely-typed list/object field, left for the store to normalize
    pub fn json(&self, name: &str) -> Option<Value> {
        self.text(name).map(Value::String)
    }

    /// Files submitted under `name`, in submission order
    pub fn files(&self, name: &str) -> Vec<IncomingFile> {
        self.files
            .iter()
            .filter(|f| f.field == name)
            .cloned()
            .collect()
    }

    /// Any file whose field is not in `expected`
    pub fn unexpected_file(&self, expected: &[&str]) -> Option<&IncomingFile> {
        self.files
            .iter()
            .find(|f| !expected.contains(&f.field.as_str()))
    }
}
