//! Generation module - turns a validated roster into printable documents.
//!
//! - `renderer` - the page rendering boundary (`PageRenderer`)
//! - `assembler` - renders every record of a kind and keeps roster order
//! - `packager` - hands back one PDF or a zip of all requested documents
//! - `typst` - production renderer backed by Typst templates

pub mod assembler;
pub mod packager;
pub mod renderer;
pub mod typst;

pub use assembler::{assemble, assemble_all, OutputDocument};
pub use packager::{package, Deliverable};
pub use renderer::{
    PageRenderer, RenderError, RenderedPage, RendererHealth, ResourceStatus, Template,
};

use log::{error, info};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::roster::{AttendeeRecord, RowIssue};
use crate::section::SectionCode;

/// A document type that can be requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum OutputKind {
    Certificates,
    NameTents,
}

impl OutputKind {
    /// File name of the document, both as a download and as an archive member.
    pub fn document_name(&self) -> &'static str {
        match self {
            Self::Certificates => "Certificates.pdf",
            Self::NameTents => "Name_Tents.pdf",
        }
    }

    /// Parse the `output_type` form value (`certificates`, `tents` or `both`).
    pub fn parse_selection(value: &str) -> Result<BTreeSet<OutputKind>, GenerationError> {
        let kinds = match value.trim().to_lowercase().as_str() {
            "certificates" => vec![Self::Certificates],
            "tents" | "name_tents" => vec![Self::NameTents],
            "both" => vec![Self::Certificates, Self::NameTents],
            "" => {
                return Err(GenerationError::Configuration(
                    "no output type selected".to_string(),
                ))
            }
            other => {
                return Err(GenerationError::Configuration(format!(
                    "unrecognized output type '{}' (expected 'certificates', 'tents' or 'both')",
                    other
                )))
            }
        };
        Ok(kinds.into_iter().collect())
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Certificates => f.write_str("certificates"),
            Self::NameTents => f.write_str("name tents"),
        }
    }
}

/// Broad error class used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorCategory {
    Schema,
    RowValidation,
    Configuration,
    Rendering,
    Packaging,
    Cancelled,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Schema => "SchemaError",
            Self::RowValidation => "RowValidationError",
            Self::Configuration => "ConfigurationError",
            Self::Rendering => "RenderingError",
            Self::Packaging => "PackagingError",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// Errors that abort a generation request.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid roster header: {0}")]
    Schema(String),
    #[error("row {row}: {issue}")]
    RowValidation { row: usize, issue: RowIssue },
    #[error("roster contains no attendees")]
    EmptyRoster,
    #[error("invalid request: {0}")]
    Configuration(String),
    #[error("failed to render {kind} for record {position} (row {row}): {source}")]
    Rendering {
        kind: OutputKind,
        position: usize,
        row: usize,
        #[source]
        source: RenderError,
    },
    #[error("failed to finish {kind} document: {source}")]
    DocumentFinish {
        kind: OutputKind,
        #[source]
        source: RenderError,
    },
    #[error("failed to package documents: {0}")]
    Packaging(String),
    #[error("{kind} generation cancelled before record {position}")]
    Cancelled { kind: OutputKind, position: usize },
}

impl GenerationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Schema(_) => ErrorCategory::Schema,
            Self::RowValidation { .. } | Self::EmptyRoster => ErrorCategory::RowValidation,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Rendering { .. } | Self::DocumentFinish { .. } => ErrorCategory::Rendering,
            Self::Packaging(_) => ErrorCategory::Packaging,
            Self::Cancelled { .. } => ErrorCategory::Cancelled,
        }
    }

    /// Whether the caller can fix the error by correcting its input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Schema | ErrorCategory::RowValidation | ErrorCategory::Configuration
        )
    }
}

/// One unit of work: a validated roster, its section and the requested documents.
///
/// Construction enforces eligibility: the roster and the kind set are never empty.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    id: Uuid,
    records: Vec<AttendeeRecord>,
    section: SectionCode,
    kinds: BTreeSet<OutputKind>,
}

impl GenerationRequest {
    pub fn new(
        records: Vec<AttendeeRecord>,
        section: SectionCode,
        kinds: BTreeSet<OutputKind>,
    ) -> Result<Self, GenerationError> {
        if kinds.is_empty() {
            return Err(GenerationError::Configuration(
                "no output type selected".to_string(),
            ));
        }
        if records.is_empty() {
            return Err(GenerationError::EmptyRoster);
        }
        Ok(Self {
            id: Uuid::new_v4(),
            records,
            section,
            kinds,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn records(&self) -> &[AttendeeRecord] {
        &self.records
    }

    pub fn section(&self) -> &SectionCode {
        &self.section
    }

    pub fn kinds(&self) -> &BTreeSet<OutputKind> {
        &self.kinds
    }
}

/// Tuning for a generation run.
#[derive(Debug, Clone)]
pub struct GenerationOptions {
    /// Records rendered at the same time within one kind.
    pub render_concurrency: usize,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            render_concurrency: 4,
        }
    }
}

/// Run the whole pipeline for one request.
///
/// Every requested kind is assembled; if any of them fails nothing is
/// packaged and the first failure (in `OutputKind` order) is returned.
pub async fn generate(
    request: &GenerationRequest,
    renderer: &dyn PageRenderer,
    options: &GenerationOptions,
    cancel: &CancellationToken,
) -> Result<Deliverable, GenerationError> {
    info!(
        "[{}] generating {:?} for {} attendee(s), section {}",
        request.id(),
        request.kinds(),
        request.records().len(),
        request.section()
    );

    let result = assemble_all(request, renderer, options, cancel)
        .await
        .and_then(package);

    match &result {
        Ok(deliverable) => info!(
            "[{}] delivered {} ({} bytes)",
            request.id(),
            deliverable.filename(),
            deliverable.bytes().len()
        ),
        Err(e) => error!("[{}] generation failed: {}", request.id(), e),
    }

    result
}
