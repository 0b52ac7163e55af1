use actix_multipart::Multipart;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse};
use log::{error, info, warn};
use tokio_util::sync::CancellationToken;

use crate::generation::{
    generate, ErrorCategory, GenerationError, GenerationRequest, OutputKind, RendererHealth,
};
use crate::http::multipart_parser::{GenerateForm, MultipartParser};
use crate::roster::sample::{SAMPLE_CSV, SAMPLE_FILENAME};
use crate::roster::parse_roster_bytes;
use crate::section::format_section;
use crate::{AppState, ErrorDetails, ErrorResponse};

#[derive(Debug, serde::Deserialize, utoipa::ToSchema)]
pub struct GenerateDocumentsRequest {
    /// Roster CSV with the header `Name,Lodge,Role`.
    #[allow(unused)]
    pub csv_file: Option<Vec<u8>>,
    /// Roster CSV pasted as text; used when no file is uploaded.
    #[allow(unused)]
    pub input_text: Option<String>,
    /// `Eastern` or `Gateway`.
    #[allow(unused)]
    pub region: String,
    #[allow(unused)]
    pub section_number: String,
    /// `certificates`, `tents` or `both`.
    #[allow(unused)]
    pub output_type: String,
}

impl From<&GenerationError> for ErrorResponse {
    fn from(error: &GenerationError) -> Self {
        let details = match error {
            GenerationError::RowValidation { row, issue } => Some(ErrorDetails {
                row: Some(*row),
                field: issue.field().map(|f| f.to_string()),
                ..Default::default()
            }),
            GenerationError::Rendering {
                kind,
                position,
                row,
                ..
            } => Some(ErrorDetails {
                row: Some(*row),
                position: Some(*position),
                document: Some(kind.document_name().to_string()),
                ..Default::default()
            }),
            GenerationError::DocumentFinish { kind, .. } => Some(ErrorDetails {
                document: Some(kind.document_name().to_string()),
                ..Default::default()
            }),
            GenerationError::Cancelled { kind, position } => Some(ErrorDetails {
                position: Some(*position),
                document: Some(kind.document_name().to_string()),
                ..Default::default()
            }),
            _ => None,
        };

        let mut response = ErrorResponse::new(error.category().as_str(), &error.to_string());
        response.details = details;
        response
    }
}

impl From<GenerationError> for HttpResponse {
    fn from(error: GenerationError) -> Self {
        let body = ErrorResponse::from(&error);
        match error.category() {
            ErrorCategory::Schema | ErrorCategory::RowValidation | ErrorCategory::Configuration => {
                HttpResponse::BadRequest().json(body)
            }
            ErrorCategory::Cancelled => HttpResponse::ServiceUnavailable().json(body),
            ErrorCategory::Rendering | ErrorCategory::Packaging => {
                HttpResponse::InternalServerError().json(body)
            }
        }
    }
}

fn attachment(filename: &str) -> ContentDisposition {
    ContentDisposition {
        disposition: DispositionType::Attachment,
        parameters: vec![DispositionParam::Filename(filename.to_string())],
    }
}

/// Validate the form into a generation request.
///
/// Request-scoped settings are checked before the roster is parsed.
pub fn build_request(form: &GenerateForm) -> Result<GenerationRequest, GenerationError> {
    let region = form
        .region
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| GenerationError::Configuration("region is required".to_string()))?;
    let section = format_section(region, form.section_number.as_deref().unwrap_or_default())?;
    let kinds = OutputKind::parse_selection(form.output_type.as_deref().unwrap_or_default())?;
    let records = parse_roster_bytes(form.roster_bytes())?;

    GenerationRequest::new(records, section, kinds)
}

#[utoipa::path(
    post,
    path = "/generate",
    tag = "Documents",
    request_body(content = inline(GenerateDocumentsRequest), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Certificates.pdf, Name_Tents.pdf, or SLS_Documents.zip when both were requested"),
        (status = 400, description = "Invalid roster or form values", body = ErrorResponse),
        (status = 413, description = "Upload too large", body = ErrorResponse),
        (status = 500, description = "Rendering or packaging failed", body = ErrorResponse),
        (status = 503, description = "Generation timed out", body = ErrorResponse)
    )
)]
pub async fn generate_documents(payload: Multipart, data: web::Data<AppState>) -> HttpResponse {
    let health = data.renderer.health();
    let missing = health.missing_templates();
    if !missing.is_empty() {
        error!("Template files missing: {}", missing.join(", "));
        return HttpResponse::InternalServerError().json(ErrorResponse::internal_error(
            &format!("Template files missing: {}", missing.join(", ")),
        ));
    }

    let form = match MultipartParser::parse_generate_multipart(payload, data.config.max_upload_bytes)
        .await
    {
        Ok(form) => form,
        Err(e) => {
            warn!("Rejected generation form: {}", e);
            return e.into();
        }
    };

    let request = match build_request(&form) {
        Ok(request) => request,
        Err(e) => {
            warn!("Rejected generation request: {}", e);
            return e.into();
        }
    };

    let cancel = CancellationToken::new();
    let timeout = data.config.generation_timeout;
    let options = data.generation_options();
    let generation = generate(&request, data.renderer.as_ref(), &options, &cancel);
    tokio::pin!(generation);

    let result = match tokio::time::timeout(timeout, &mut generation).await {
        Ok(result) => result,
        Err(_) => {
            warn!("[{}] generation timed out after {:?}", request.id(), timeout);
            cancel.cancel();
            generation.await
        }
    };

    match result {
        Ok(deliverable) => {
            info!(
                "[{}] sending {} to client",
                request.id(),
                deliverable.filename()
            );
            HttpResponse::Ok()
                .content_type(deliverable.content_type())
                .insert_header(attachment(deliverable.filename()))
                .body(deliverable.into_bytes())
        }
        Err(e) => e.into(),
    }
}

#[utoipa::path(
    get,
    path = "/sample.csv",
    tag = "Documents",
    responses(
        (status = 200, description = "Sample roster", content_type = "text/csv", body = String)
    )
)]
pub async fn sample_csv() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/csv")
        .insert_header(attachment(SAMPLE_FILENAME))
        .body(SAMPLE_CSV)
}

#[utoipa::path(
    get,
    path = "/healthcheck",
    tag = "Documents",
    responses(
        (status = 200, description = "All templates available", body = RendererHealth),
        (status = 500, description = "Templates missing", body = RendererHealth)
    )
)]
pub async fn healthcheck(data: web::Data<AppState>) -> HttpResponse {
    let health = data.renderer.health();
    if health.ready {
        HttpResponse::Ok().json(health)
    } else {
        HttpResponse::InternalServerError().json(health)
    }
}
