//! Typst rendering engine.
//!
//! Each template in the templates directory defines one Typst function. A page
//! is a call of that function with the record's values; a document is the
//! template definitions followed by every page call, compiled with the
//! `typst` CLI in a temporary directory.
//!
//! Health checks are silent; the server logs missing fonts once at startup.

use async_trait::async_trait;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tempfile::tempdir;

use super::renderer::{
    PageRenderer, RenderError, RenderedPage, RendererHealth, ResourceStatus, Template,
};
use super::OutputKind;
use crate::roster::{AttendeeRecord, Role};
use crate::section::SectionCode;

const MAIN_FILE: &str = "document.typ";
const OUTPUT_FILE: &str = "document.pdf";
const FONT_EXTENSIONS: [&str; 2] = ["otf", "ttf"];

/// Font faces the templates are designed for. Typst falls back to its
/// bundled fonts when they are absent.
pub const EXPECTED_FONTS: [&str; 4] = [
    "MuseoSlab-700",
    "MuseoSlab-500Italic",
    "MuseoSans-700",
    "MuseoSans-500Italic",
];

const ALL_TEMPLATES: [Template; 3] = [
    Template::ParticipantCertificate,
    Template::StaffCertificate,
    Template::NameTent,
];

fn template_file(template: Template) -> &'static str {
    match template {
        Template::ParticipantCertificate => "certificate_participant.typ",
        Template::StaffCertificate => "certificate_staff.typ",
        Template::NameTent => "name_tent.typ",
    }
}

fn template_function(template: Template) -> &'static str {
    match template {
        Template::ParticipantCertificate => "participant_certificate",
        Template::StaffCertificate => "staff_certificate",
        Template::NameTent => "name_tent",
    }
}

/// Escape special characters for Typst strings.
pub fn escape_typst_string(value: &str) -> String {
    value
        .replace('\\', r"\\")
        .replace('"', r#"\""#)
        .replace('\n', r"\n")
}

fn printable<'a>(field: &'static str, value: &'a str) -> Result<&'a str, RenderError> {
    if value.chars().any(char::is_control) {
        return Err(RenderError::UnprintableText {
            field,
            value: value.to_string(),
        });
    }
    Ok(value)
}

/// Renderer backed by Typst templates on disk.
#[derive(Debug, Clone)]
pub struct TypstPageRenderer {
    typst_bin: PathBuf,
    templates_dir: PathBuf,
    fonts_dir: Option<PathBuf>,
}

impl TypstPageRenderer {
    pub fn new(
        typst_bin: impl Into<PathBuf>,
        templates_dir: impl Into<PathBuf>,
        fonts_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            typst_bin: typst_bin.into(),
            templates_dir: templates_dir.into(),
            fonts_dir,
        }
    }

    pub fn template_path(&self, template: Template) -> PathBuf {
        self.templates_dir.join(template_file(template))
    }

    /// Typst source of one page.
    pub fn page_source(
        &self,
        record: &AttendeeRecord,
        template: Template,
        section: &SectionCode,
    ) -> Result<String, RenderError> {
        let name = printable("Name", &record.name)?;
        let function = template_function(template);

        let source = match template {
            Template::ParticipantCertificate | Template::StaffCertificate => format!(
                "#{}(name: \"{}\", section: \"{}\")",
                function,
                escape_typst_string(name),
                escape_typst_string(printable("Section", section.as_str())?),
            ),
            Template::NameTent => {
                let lodge = printable("Lodge", &record.lodge)?;
                let lodge = match record.role {
                    Role::Staff => format!("STAFF - {}", lodge),
                    Role::Participant => lodge.to_string(),
                };
                format!(
                    "#{}(name: \"{}\", lodge: \"{}\")",
                    function,
                    escape_typst_string(name),
                    escape_typst_string(&lodge),
                )
            }
        };

        Ok(source)
    }

    /// Full Typst source of a document: template definitions, then pages.
    pub fn document_source(
        &self,
        kind: OutputKind,
        pages: &[RenderedPage],
    ) -> Result<String, RenderError> {
        let mut source = String::new();

        for &template in Template::for_kind(kind) {
            let path = self.template_path(template);
            let definition = fs::read_to_string(&path).map_err(|source| RenderError::Template {
                name: template_file(template).to_string(),
                source,
            })?;
            source.push_str(&definition);
            source.push('\n');
        }

        for (index, page) in pages.iter().enumerate() {
            if index > 0 {
                source.push_str("#pagebreak()\n");
            }
            let call = std::str::from_utf8(page.as_bytes())
                .map_err(|e| RenderError::Other(format!("page {} is not Typst source: {}", index + 1, e)))?;
            source.push_str(call);
            source.push('\n');
        }

        Ok(source)
    }

    fn font_status(&self) -> Vec<ResourceStatus> {
        EXPECTED_FONTS
            .iter()
            .map(|font| {
                let found = self.fonts_dir.as_deref().and_then(|dir| find_font(dir, font));
                ResourceStatus {
                    name: font.to_string(),
                    available: found.is_some(),
                    location: found
                        .or_else(|| self.fonts_dir.clone())
                        .map(|p| p.display().to_string())
                        .unwrap_or_default(),
                }
            })
            .collect()
    }
}

fn find_font(dir: &Path, font: &str) -> Option<PathBuf> {
    FONT_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", font, ext)))
        .find(|path| path.exists())
}

/// Compile a Typst source string to PDF bytes.
///
/// The child is killed if the returned future is dropped, so a cancelled
/// request never leaves a `typst` process behind.
async fn compile_typst_to_pdf(
    typst_bin: &Path,
    fonts_dir: Option<&Path>,
    typst_source: &str,
) -> Result<Vec<u8>, RenderError> {
    let temp_dir = tempdir()?;
    let typ_path = temp_dir.path().join(MAIN_FILE);
    let output_path = temp_dir.path().join(OUTPUT_FILE);

    tokio::fs::write(&typ_path, typst_source).await?;

    let mut command = Command::new(typst_bin);
    command
        .arg("compile")
        .arg(&typ_path)
        .arg(&output_path)
        .current_dir(temp_dir.path())
        .kill_on_drop(true);
    if let Some(dir) = fonts_dir {
        command.arg("--font-path").arg(dir);
    }

    let status = command.status().await?;
    if !status.success() {
        return Err(RenderError::TypstExit(status.code().unwrap_or(-1)));
    }

    Ok(tokio::fs::read(&output_path).await?)
}

#[async_trait]
impl PageRenderer for TypstPageRenderer {
    async fn render_page(
        &self,
        record: &AttendeeRecord,
        template: Template,
        section: &SectionCode,
    ) -> Result<RenderedPage, RenderError> {
        self.page_source(record, template, section)
            .map(RenderedPage::new)
    }

    async fn finish_document(
        &self,
        kind: OutputKind,
        pages: &[RenderedPage],
    ) -> Result<Vec<u8>, RenderError> {
        let source = self.document_source(kind, pages)?;
        let fonts_dir = self.fonts_dir.as_deref().filter(|dir| dir.is_dir());

        debug!(
            "Compiling {} ({} page(s)) with {}",
            kind,
            pages.len(),
            self.typst_bin.display()
        );

        compile_typst_to_pdf(&self.typst_bin, fonts_dir, &source).await
    }

    fn health(&self) -> RendererHealth {
        let templates: Vec<ResourceStatus> = ALL_TEMPLATES
            .iter()
            .map(|&template| {
                let path = self.template_path(template);
                ResourceStatus {
                    name: template_file(template).to_string(),
                    available: path.is_file(),
                    location: path.display().to_string(),
                }
            })
            .collect();

        let fonts = self.font_status();
        let ready = templates.iter().all(|t| t.available);
        RendererHealth {
            templates,
            fonts,
            ready,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::section::format_section;

    fn static_dir() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("static")
    }

    fn renderer() -> TypstPageRenderer {
        TypstPageRenderer::new("typst", static_dir(), None)
    }

    fn record(name: &str, lodge: &str, role: Role) -> AttendeeRecord {
        AttendeeRecord {
            row: 2,
            name: name.to_string(),
            lodge: lodge.to_string(),
            role,
        }
    }

    #[test]
    fn test_escape_typst_string() {
        assert_eq!(escape_typst_string(r#"Say "hi""#), r#"Say \"hi\""#);
        assert_eq!(escape_typst_string(r"a\b"), r"a\\b");
    }

    #[test]
    fn test_certificate_page_source() {
        let section = format_section("Eastern", "9").unwrap();
        let source = renderer()
            .page_source(
                &record("Cortland Bolles", "Wewikit Lodge", Role::Staff),
                Template::StaffCertificate,
                &section,
            )
            .unwrap();
        assert_eq!(
            source,
            r#"#staff_certificate(name: "Cortland Bolles", section: "E9")"#
        );
    }

    #[test]
    fn test_name_tent_marks_staff() {
        let section = format_section("Gateway", "3").unwrap();
        let renderer = renderer();

        let staff = renderer
            .page_source(
                &record("Cortland Bolles", "Wewikit Lodge", Role::Staff),
                Template::NameTent,
                &section,
            )
            .unwrap();
        assert!(staff.contains(r#"lodge: "STAFF - Wewikit Lodge""#));

        let participant = renderer
            .page_source(
                &record("Christopher Grove", "Tipisa Lodge", Role::Participant),
                Template::NameTent,
                &section,
            )
            .unwrap();
        assert!(participant.contains(r#"lodge: "Tipisa Lodge""#));
    }

    #[test]
    fn test_control_characters_rejected() {
        let section = format_section("Eastern", "9").unwrap();
        let err = renderer()
            .page_source(
                &record("Bad\u{7}Name", "Lodge", Role::Participant),
                Template::ParticipantCertificate,
                &section,
            )
            .unwrap_err();
        assert!(matches!(err, RenderError::UnprintableText { field: "Name", .. }));
    }

    #[test]
    fn test_document_source_orders_pages() {
        let pages = vec![
            RenderedPage::new("#name_tent(name: \"A\", lodge: \"L\")"),
            RenderedPage::new("#name_tent(name: \"B\", lodge: \"L\")"),
        ];
        let source = renderer()
            .document_source(OutputKind::NameTents, &pages)
            .unwrap();

        assert!(source.contains("#let name_tent("));
        let a = source.find("name: \"A\"").unwrap();
        let b = source.find("name: \"B\"").unwrap();
        assert!(a < b);
        assert_eq!(source.matches("#pagebreak()").count(), 1);
    }

    #[test]
    fn test_missing_template_directory() {
        let renderer = TypstPageRenderer::new("typst", "/nonexistent/templates", None);
        let err = renderer
            .document_source(OutputKind::Certificates, &[])
            .unwrap_err();
        assert!(matches!(err, RenderError::Template { .. }));

        let health = renderer.health();
        assert!(!health.ready);
        assert_eq!(health.missing_templates().len(), 3);
    }

    #[test]
    fn test_missing_fonts_do_not_block_readiness() {
        let renderer = TypstPageRenderer::new(
            "typst",
            static_dir(),
            Some(PathBuf::from("/nonexistent/fonts")),
        );
        let health = renderer.health();
        assert!(health.ready);
        assert!(health.fonts.iter().all(|font| !font.available));
        assert_eq!(health.fonts[0].location, "/nonexistent/fonts");
    }

    #[test]
    fn test_bundled_templates_are_ready() {
        let health = renderer().health();
        assert!(health.ready);
        assert_eq!(health.fonts.len(), EXPECTED_FONTS.len());
    }
}
