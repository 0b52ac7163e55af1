//! Document assembly.
//!
//! Records of one kind are rendered concurrently (bounded by
//! `GenerationOptions::render_concurrency`) but pages always come back in
//! roster order. The first failing record fails the whole document.
//! Cancellation is checked before every record and raced against the final
//! `finish_document` call; a cancelled kind drops the renderer's future.

use futures::future::join_all;
use futures::{stream, StreamExt, TryStreamExt};
use log::{debug, info};
use tokio_util::sync::CancellationToken;

use super::renderer::{PageRenderer, RenderedPage, Template};
use super::{GenerationError, GenerationOptions, GenerationRequest, OutputKind};

/// A finished document of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDocument {
    pub kind: OutputKind,
    pub page_count: usize,
    pub bytes: Vec<u8>,
}

/// Render every record of the request into a document of `kind`.
pub async fn assemble(
    kind: OutputKind,
    request: &GenerationRequest,
    renderer: &dyn PageRenderer,
    options: &GenerationOptions,
    cancel: &CancellationToken,
) -> Result<OutputDocument, GenerationError> {
    let section = request.section();
    let concurrency = options.render_concurrency.max(1);

    let pages: Vec<RenderedPage> = stream::iter(request.records().iter().enumerate())
        .map(|(index, record)| async move {
            let position = index + 1;
            if cancel.is_cancelled() {
                return Err(GenerationError::Cancelled { kind, position });
            }
            let template = Template::select(kind, record.role);
            debug!(
                "[{}] rendering {} page {} with {}",
                request.id(),
                kind,
                position,
                template
            );
            renderer
                .render_page(record, template, section)
                .await
                .map_err(|source| GenerationError::Rendering {
                    kind,
                    position,
                    row: record.row,
                    source,
                })
        })
        .buffered(concurrency)
        .try_collect()
        .await?;

    let bytes = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            return Err(GenerationError::Cancelled {
                kind,
                position: pages.len() + 1,
            });
        }
        finished = renderer.finish_document(kind, &pages) => {
            finished.map_err(|source| GenerationError::DocumentFinish { kind, source })?
        }
    };

    info!(
        "[{}] {} assembled: {} page(s)",
        request.id(),
        kind,
        pages.len()
    );

    Ok(OutputDocument {
        kind,
        page_count: pages.len(),
        bytes,
    })
}

/// Assemble every requested kind concurrently.
///
/// All kinds run to completion even when one fails; the result carries the
/// first failure in `OutputKind` order.
pub async fn assemble_all(
    request: &GenerationRequest,
    renderer: &dyn PageRenderer,
    options: &GenerationOptions,
    cancel: &CancellationToken,
) -> Result<Vec<OutputDocument>, GenerationError> {
    let jobs = request
        .kinds()
        .iter()
        .map(|&kind| assemble(kind, request, renderer, options, cancel));

    join_all(jobs).await.into_iter().collect()
}
