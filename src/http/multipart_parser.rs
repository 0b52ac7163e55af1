use actix_multipart::{Field, Multipart};
use actix_web::HttpResponse;
use futures::StreamExt;
use log::debug;

use crate::ErrorResponse;

/// Raw fields of the generation form.
#[derive(Debug, Default)]
pub struct GenerateForm {
    pub csv_file: Option<Vec<u8>>,
    pub input_text: Option<String>,
    pub region: Option<String>,
    pub section_number: Option<String>,
    pub output_type: Option<String>,
}

impl GenerateForm {
    /// Uploaded file if one was sent, otherwise the pasted text.
    pub fn roster_bytes(&self) -> &[u8] {
        match &self.csv_file {
            Some(bytes) if !bytes.is_empty() => bytes.as_slice(),
            _ => self
                .input_text
                .as_deref()
                .map(str::as_bytes)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MultipartParseError {
    #[error("Multipart field error: {0}")]
    FieldError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Invalid UTF-8 data: {0}")]
    Utf8Error(String),
    #[error("Upload exceeds the {0} byte limit")]
    PayloadTooLarge(usize),
}

impl From<MultipartParseError> for HttpResponse {
    fn from(error: MultipartParseError) -> Self {
        match error {
            MultipartParseError::PayloadTooLarge(_) => HttpResponse::PayloadTooLarge()
                .json(ErrorResponse::new("PayloadTooLarge", &error.to_string())),
            MultipartParseError::FieldError(_) | MultipartParseError::Utf8Error(_) => {
                HttpResponse::BadRequest().json(ErrorResponse::bad_request(&error.to_string()))
            }
            MultipartParseError::IoError(_) => HttpResponse::InternalServerError()
                .json(ErrorResponse::internal_error(&error.to_string())),
        }
    }
}

pub struct MultipartParser;

impl MultipartParser {
    /// Read the generation form, keeping the total size under `limit` bytes.
    pub async fn parse_generate_multipart(
        mut multipart: Multipart,
        limit: usize,
    ) -> Result<GenerateForm, MultipartParseError> {
        let mut form = GenerateForm::default();
        let mut total = 0usize;

        while let Some(item) = multipart.next().await {
            let mut field = item.map_err(|e| MultipartParseError::FieldError(e.to_string()))?;
            let name = field
                .content_disposition()
                .and_then(|cd| cd.get_name())
                .map(str::to_string)
                .ok_or_else(|| MultipartParseError::FieldError("Field name not found".to_string()))?;

            let bytes = read_field(&mut field, &mut total, limit).await?;
            debug!("Received form field '{}' ({} bytes)", name, bytes.len());

            match name.as_str() {
                "csv_file" => form.csv_file = Some(bytes),
                "input_text" => form.input_text = Some(into_text(bytes)?),
                "region" => form.region = Some(into_text(bytes)?),
                "section_number" => form.section_number = Some(into_text(bytes)?),
                "output_type" => form.output_type = Some(into_text(bytes)?),
                _ => continue,
            }
        }

        Ok(form)
    }
}

async fn read_field(
    field: &mut Field,
    total: &mut usize,
    limit: usize,
) -> Result<Vec<u8>, MultipartParseError> {
    let mut buffer = Vec::new();
    while let Some(chunk) = field.next().await {
        let data_chunk = chunk.map_err(|e| MultipartParseError::IoError(e.to_string()))?;
        *total += data_chunk.len();
        if *total > limit {
            return Err(MultipartParseError::PayloadTooLarge(limit));
        }
        buffer.extend_from_slice(&data_chunk);
    }
    Ok(buffer)
}

fn into_text(bytes: Vec<u8>) -> Result<String, MultipartParseError> {
    String::from_utf8(bytes).map_err(|e| MultipartParseError::Utf8Error(e.to_string()))
}
