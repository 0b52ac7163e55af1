use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod config;
pub mod generation;
pub mod http;
pub mod roster;
pub mod section;
pub mod state;

pub use crate::config::AppConfig;
pub use crate::state::AppState;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

/// Where in the input an error was found.
#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            details: None,
        }
    }

    pub fn bad_request(message: &str) -> Self {
        Self::new("BadRequest", message)
    }

    pub fn internal_error(message: &str) -> Self {
        Self::new("InternalServerError", message)
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::http::handlers::generate_documents,
        crate::http::handlers::sample_csv,
        crate::http::handlers::healthcheck
    ),
    components(
        schemas(
            http::handlers::GenerateDocumentsRequest,
            generation::RendererHealth,
            generation::ResourceStatus,
            ErrorResponse,
            ErrorDetails,
        )
    ),
    tags(
        (name = "Documents", description = "Certificate and name tent generation.")
    )
)]
pub struct ApiDoc;

fn build_cors(allowed_origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "OPTIONS"])
        .allowed_headers(vec![header::ACCEPT, header::CONTENT_TYPE])
        .expose_headers(vec![header::CONTENT_DISPOSITION])
        .max_age(3600);

    if allowed_origins.is_empty() {
        return cors.allow_any_origin();
    }
    allowed_origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

fn log_renderer_health(state: &AppState) {
    let health = state.renderer.health();
    for template in &health.templates {
        if template.available {
            info!("Template OK:   {}", template.name);
        } else {
            error!("Template MISS: {} ({})", template.name, template.location);
        }
    }
    for font in &health.fonts {
        if font.available {
            info!("Font loaded:   {} ({})", font.name, font.location);
        } else {
            warn!("Font MISSING:  {} - add it to {}", font.name, font.location);
        }
    }
}

pub async fn run() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let app_state = web::Data::new(AppState::new(config.clone()));
    log_renderer_health(&app_state);

    let prometheus = PrometheusMetricsBuilder::new("sls_certificates")
        .endpoint("/metrics")
        .build()
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    info!("Starting server at http://{}:{}", config.host, config.port);

    let allowed_origins = config.allowed_origins.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Compress::default())
            .wrap(prometheus.clone())
            .wrap(build_cors(&allowed_origins))
            .app_data(app_state.clone())
            .configure(http::config)
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
