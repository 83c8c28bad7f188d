//! Form drafts and captured submissions.
//!
//! A [`FormDraft`] is what the user edits: text fields and file paths. Capturing
//! it reads every file into memory and yields a [`FormSubmission`], which is the
//! snapshot that travels to the backend as a multipart payload.

use crate::error::{FormError, TransportError};
use crate::model::{FileSummary, FormSummary, DEFAULT_FILE_FIELD};
use reqwest::multipart::{Form, Part};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftKind {
    Text,
    File,
}

/// One editable row of the form. For files `value` holds the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftEntry {
    pub kind: DraftKind,
    pub name: String,
    pub value: String,
}

impl DraftEntry {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: DraftKind::Text,
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn file(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind: DraftKind::File,
            name: name.into(),
            value: path.into(),
        }
    }

    /// Parse `NAME=VALUE`. The value may be empty.
    pub fn parse_text(spec: &str) -> Result<Self, FormError> {
        let (name, value) = spec
            .split_once('=')
            .ok_or_else(|| FormError::MissingSeparator(spec.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(FormError::EmptyName(spec.to_string()));
        }
        Ok(Self::text(name, value))
    }

    /// Parse `[NAME=]PATH`. Without a name the part is sent as `files`.
    pub fn parse_file(spec: &str) -> Result<Self, FormError> {
        let (name, path) = match spec.split_once('=') {
            // A separator inside the path itself is not a name prefix.
            Some((name, path)) if !name.contains(['/', '\\']) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(FormError::EmptyName(spec.to_string()));
                }
                (name, path)
            }
            _ => (DEFAULT_FILE_FIELD, spec),
        };
        let path = path.trim();
        if path.is_empty() {
            return Err(FormError::EmptyPath(spec.to_string()));
        }
        Ok(Self::file(name, path))
    }

    /// Inverse of the parsers, used to pre-fill the edit buffer.
    pub fn spec(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormDraft {
    pub entries: Vec<DraftEntry>,
}

impl FormDraft {
    pub fn push(&mut self, entry: DraftEntry) {
        self.entries.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot the draft. File contents are read now, not when the request is sent.
    pub fn capture(&self) -> Result<FormSubmission, FormError> {
        let mut submission = FormSubmission::default();
        for entry in &self.entries {
            match entry.kind {
                DraftKind::Text => submission.push_text(&entry.name, &entry.value),
                DraftKind::File => {
                    let path = Path::new(&entry.value);
                    let content = std::fs::read(path).map_err(|source| FormError::ReadFile {
                        path: path.to_path_buf(),
                        source,
                    })?;
                    let filename = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| entry.value.clone());
                    let mime = mime_guess::from_path(path)
                        .first_or_octet_stream()
                        .essence_str()
                        .to_string();
                    submission.push_file(&entry.name, filename, mime, content);
                }
            }
        }
        Ok(submission)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    File {
        filename: String,
        mime: String,
        content: Vec<u8>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormPart {
    pub name: String,
    pub value: FormValue,
}

/// Ordered name/value parts captured at trigger time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormSubmission {
    parts: Vec<FormPart>,
}

impl FormSubmission {
    pub fn push_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parts.push(FormPart {
            name: name.into(),
            value: FormValue::Text(value.into()),
        });
    }

    pub fn push_file(
        &mut self,
        name: impl Into<String>,
        filename: impl Into<String>,
        mime: impl Into<String>,
        content: Vec<u8>,
    ) {
        self.parts.push(FormPart {
            name: name.into(),
            value: FormValue::File {
                filename: filename.into(),
                mime: mime.into(),
                content,
            },
        });
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn summary(&self) -> FormSummary {
        let mut summary = FormSummary::default();
        for part in &self.parts {
            match &part.value {
                FormValue::Text(v) => summary.fields.push((part.name.clone(), v.clone())),
                FormValue::File {
                    filename,
                    mime,
                    content,
                } => summary.files.push(FileSummary {
                    field: part.name.clone(),
                    filename: filename.clone(),
                    mime: mime.clone(),
                    size_bytes: content.len() as u64,
                }),
            }
        }
        summary
    }

    /// Encode as `multipart/form-data`. The boundary and content type are
    /// applied by reqwest when the form is attached to a request.
    pub fn into_multipart(self) -> Result<Form, TransportError> {
        let mut form = Form::new();
        for part in self.parts {
            form = match part.value {
                FormValue::Text(value) => form.text(part.name, value),
                FormValue::File {
                    filename,
                    mime,
                    content,
                } => {
                    let file_part = Part::bytes(content)
                        .file_name(filename)
                        .mime_str(&mime)
                        .map_err(TransportError::Encode)?;
                    form.part(part.name, file_part)
                }
            };
        }
        Ok(form)
    }
}
