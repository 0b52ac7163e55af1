#![allow(dead_code)]

use std::io::{Cursor, Read};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sls_certificates::config::AppConfig;
use sls_certificates::generation::{
    OutputKind, PageRenderer, RenderError, RenderedPage, RendererHealth, ResourceStatus, Template,
};
use sls_certificates::roster::AttendeeRecord;
use sls_certificates::section::SectionCode;
use sls_certificates::AppState;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub const TWO_ATTENDEES: &str = "Name,Lodge,Role\n\
Christopher Grove,Tipisa Lodge,Participant\n\
Cortland Bolles,Wewikit Lodge,Staff\n";

/// Renderer that writes one readable line per page:
/// `<template>|<name>|<lodge>|<section>`.
///
/// A finished document is its pages joined by newlines.
#[derive(Default)]
pub struct FakeRenderer {
    fail_on: Option<(Template, String)>,
    cancel_on: Option<(String, CancellationToken)>,
    scramble: bool,
    slow_finish: Option<Duration>,
    missing_template: bool,
    finished: Mutex<Vec<OutputKind>>,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail when `name` is rendered with `template`.
    pub fn failing_on(mut self, template: Template, name: &str) -> Self {
        self.fail_on = Some((template, name.to_string()));
        self
    }

    /// Cancel `token` while `name` is being rendered.
    pub fn cancelling_on(mut self, name: &str, token: CancellationToken) -> Self {
        self.cancel_on = Some((name.to_string(), token));
        self
    }

    /// Make earlier rows finish later than later rows.
    pub fn scrambled(mut self) -> Self {
        self.scramble = true;
        self
    }

    /// Take `delay` to bind each document.
    pub fn finishing_after(mut self, delay: Duration) -> Self {
        self.slow_finish = Some(delay);
        self
    }

    /// Report the name tent template as missing.
    pub fn without_templates(mut self) -> Self {
        self.missing_template = true;
        self
    }

    pub async fn finished(&self) -> Vec<OutputKind> {
        self.finished.lock().await.clone()
    }
}

#[async_trait]
impl PageRenderer for FakeRenderer {
    async fn render_page(
        &self,
        record: &AttendeeRecord,
        template: Template,
        section: &SectionCode,
    ) -> Result<RenderedPage, RenderError> {
        if self.scramble {
            let delay = 40u64.saturating_sub(record.row as u64 * 5);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if let Some((name, token)) = &self.cancel_on {
            if *name == record.name {
                token.cancel();
            }
        }
        if let Some((failing, name)) = &self.fail_on {
            if *failing == template && *name == record.name {
                return Err(RenderError::Other(format!("cannot render {}", name)));
            }
        }
        Ok(RenderedPage::new(format!(
            "{}|{}|{}|{}",
            template, record.name, record.lodge, section
        )))
    }

    async fn finish_document(
        &self,
        kind: OutputKind,
        pages: &[RenderedPage],
    ) -> Result<Vec<u8>, RenderError> {
        if let Some(delay) = self.slow_finish {
            tokio::time::sleep(delay).await;
        }
        self.finished.lock().await.push(kind);
        let lines: Vec<&str> = pages
            .iter()
            .map(|page| std::str::from_utf8(page.as_bytes()).unwrap())
            .collect();
        Ok(lines.join("\n").into_bytes())
    }

    fn health(&self) -> RendererHealth {
        if !self.missing_template {
            return RendererHealth::default();
        }
        RendererHealth {
            templates: vec![ResourceStatus {
                name: "name_tent.typ".to_string(),
                available: false,
                location: "/nowhere/name_tent.typ".to_string(),
            }],
            fonts: Vec::new(),
            ready: false,
        }
    }
}

/// Pages of a fake document, one per line.
pub fn pages(bytes: &[u8]) -> Vec<String> {
    String::from_utf8(bytes.to_vec())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

/// Members of a zip archive as `(name, bytes)`, in archive order.
pub fn archive_members(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|index| {
            let mut file = archive.by_index(index).unwrap();
            let mut content = Vec::new();
            file.read_to_end(&mut content).unwrap();
            (file.name().to_string(), content)
        })
        .collect()
}

pub fn test_config() -> AppConfig {
    AppConfig {
        max_upload_bytes: 64 * 1024,
        render_concurrency: 3,
        generation_timeout: Duration::from_secs(5),
        ..AppConfig::default()
    }
}

pub fn test_app_state(renderer: FakeRenderer) -> AppState {
    AppState::with_renderer(test_config(), Arc::new(renderer))
}
