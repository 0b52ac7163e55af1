//! Deliverable packaging.
//!
//! A single requested document is returned as-is. Several documents are
//! zipped together; member names come from `OutputKind::document_name` and
//! members are always written in `OutputKind` order.

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::assembler::OutputDocument;
use super::GenerationError;

pub const ARCHIVE_FILENAME: &str = "SLS_Documents.zip";
pub const PDF_CONTENT_TYPE: &str = "application/pdf";
pub const ZIP_CONTENT_TYPE: &str = "application/zip";

/// What the caller downloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deliverable {
    Document { filename: &'static str, bytes: Vec<u8> },
    Archive { members: Vec<&'static str>, bytes: Vec<u8> },
}

impl Deliverable {
    pub fn filename(&self) -> &'static str {
        match self {
            Self::Document { filename, .. } => *filename,
            Self::Archive { .. } => ARCHIVE_FILENAME,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Document { .. } => PDF_CONTENT_TYPE,
            Self::Archive { .. } => ZIP_CONTENT_TYPE,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Document { bytes, .. } | Self::Archive { bytes, .. } => bytes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Document { bytes, .. } | Self::Archive { bytes, .. } => bytes,
        }
    }
}

/// Package finished documents into the deliverable.
pub fn package(mut documents: Vec<OutputDocument>) -> Result<Deliverable, GenerationError> {
    documents.sort_by_key(|doc| doc.kind);
    if documents.windows(2).any(|pair| pair[0].kind == pair[1].kind) {
        return Err(GenerationError::Packaging(
            "more than one document of the same kind".to_string(),
        ));
    }

    match documents.len() {
        0 => Err(GenerationError::Packaging(
            "no documents to package".to_string(),
        )),
        1 => {
            let document = documents.remove(0);
            Ok(Deliverable::Document {
                filename: document.kind.document_name(),
                bytes: document.bytes,
            })
        }
        _ => {
            let members = documents.iter().map(|doc| doc.kind.document_name()).collect();
            let bytes = write_archive(&documents)
                .map_err(|e| GenerationError::Packaging(e.to_string()))?;
            Ok(Deliverable::Archive { members, bytes })
        }
    }
}

fn write_archive(documents: &[OutputDocument]) -> zip::result::ZipResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for document in documents {
        zip.start_file(document.kind.document_name(), options)?;
        zip.write_all(&document.bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}
