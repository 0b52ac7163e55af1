//! Page rendering boundary.
//!
//! The pipeline only sees `PageRenderer`: it hands over a record, the template
//! chosen for it and the section code, and gets back an opaque page. Layout,
//! fonts and the PDF format itself belong to the implementation.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

use super::OutputKind;
use crate::roster::{AttendeeRecord, Role};
use crate::section::SectionCode;

/// Page layout used for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    ParticipantCertificate,
    StaffCertificate,
    NameTent,
}

impl Template {
    /// Certificates follow the role; every name tent shares one layout.
    pub fn select(kind: OutputKind, role: Role) -> Self {
        match (kind, role) {
            (OutputKind::Certificates, Role::Participant) => Self::ParticipantCertificate,
            (OutputKind::Certificates, Role::Staff) => Self::StaffCertificate,
            (OutputKind::NameTents, _) => Self::NameTent,
        }
    }

    /// Templates a document of `kind` may draw pages from.
    pub fn for_kind(kind: OutputKind) -> &'static [Template] {
        match kind {
            OutputKind::Certificates => &[Self::ParticipantCertificate, Self::StaffCertificate],
            OutputKind::NameTents => &[Self::NameTent],
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParticipantCertificate => f.write_str("participant-certificate"),
            Self::StaffCertificate => f.write_str("staff-certificate"),
            Self::NameTent => f.write_str("name-tent"),
        }
    }
}

/// One rendered page. The pipeline never looks inside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage(Vec<u8>);

impl RenderedPage {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Errors raised by a renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to load template {name}: {source}")]
    Template {
        name: String,
        #[source]
        source: std::io::Error,
    },
    #[error("I/O error while rendering: {0}")]
    Io(#[from] std::io::Error),
    #[error("typst exited with status {0}")]
    TypstExit(i32),
    #[error("{field} contains characters that cannot be printed: {value:?}")]
    UnprintableText { field: &'static str, value: String },
    #[error("{0}")]
    Other(String),
}

/// Availability of a file the renderer depends on.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ResourceStatus {
    pub name: String,
    pub available: bool,
    pub location: String,
}

/// Readiness report of a renderer.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RendererHealth {
    pub templates: Vec<ResourceStatus>,
    pub fonts: Vec<ResourceStatus>,
    /// False when a template is missing. Missing fonts only degrade output.
    pub ready: bool,
}

impl RendererHealth {
    pub fn missing_templates(&self) -> Vec<&str> {
        self.templates
            .iter()
            .filter(|t| !t.available)
            .map(|t| t.name.as_str())
            .collect()
    }
}

impl Default for RendererHealth {
    fn default() -> Self {
        Self {
            templates: Vec::new(),
            fonts: Vec::new(),
            ready: true,
        }
    }
}

/// Renders attendee pages and binds them into documents.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render one record with the given template.
    async fn render_page(
        &self,
        record: &AttendeeRecord,
        template: Template,
        section: &SectionCode,
    ) -> Result<RenderedPage, RenderError>;

    /// Bind pages, already in roster order, into the final document file.
    async fn finish_document(
        &self,
        kind: OutputKind,
        pages: &[RenderedPage],
    ) -> Result<Vec<u8>, RenderError>;

    fn health(&self) -> RendererHealth {
        RendererHealth::default()
    }
}
