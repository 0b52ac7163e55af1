//! HTTP surface: the generation form endpoint, the sample roster and a
//! readiness check.

pub mod handlers;
pub mod multipart_parser;

use actix_web::web;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/generate").route(web::post().to(handlers::generate_documents)))
        .service(web::resource("/sample.csv").route(web::get().to(handlers::sample_csv)))
        .service(web::resource("/healthcheck").route(web::get().to(handlers::healthcheck)));
}
