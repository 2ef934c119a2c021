pub mod container;
pub mod gen;
pub mod inputs;
pub mod meta;
pub mod render;
pub mod requests;
pub mod select;
pub mod targets;

use crate::icon::container::{ContainerError, ContainerKind, IconContainer, IconEntry};
use crate::icon::inputs::{SourceCatalog, SourceImage};
use crate::icon::requests::{IconSize, OutputRequest, OutputRequestTable};
use crate::icon::select::Selection;
use crate::icon::targets::{EncodingError, EntryEncoding};
use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Assembles an icon or cursor from a populated catalog and a request table.
#[derive(Debug)]
pub struct IconProcessor {
    catalog: Arc<SourceCatalog>,
    requests: OutputRequestTable,
    jobs: NonZeroUsize,
}

impl IconProcessor {
    pub fn new(catalog: SourceCatalog, requests: OutputRequestTable) -> Self {
        Self {
            catalog: Arc::new(catalog),
            requests,
            jobs: default_jobs(),
        }
    }

    /// Limits the number of entries encoded at the same time.
    pub fn with_jobs(mut self, jobs: NonZeroUsize) -> Self {
        self.jobs = jobs;
        self
    }

    /// The kind of container the requests describe.
    pub fn kind(&self) -> ContainerKind {
        if self.requests.is_cursor() {
            ContainerKind::Cursor
        } else {
            ContainerKind::Icon
        }
    }

    /// Runs the pipeline.
    ///
    /// Every size that can be served is resized and encoded on the blocking thread pool, at
    /// most `jobs` at once. Sizes without a suitable source and entries that fail to encode are
    /// reported as diagnostics instead of failing the whole run.
    pub async fn process(&self) -> Result<Assembly, IconProcessorError> {
        let selections = select::select(&self.requests, &self.catalog);
        self.assemble(&selections).await
    }

    /// Encodes every request according to already made selections.
    pub(crate) async fn assemble(
        &self,
        selections: &BTreeMap<IconSize, Selection>,
    ) -> Result<Assembly, IconProcessorError> {
        let kind = self.kind();
        let mut diagnostics = Vec::new();
        let semaphore = Arc::new(Semaphore::new(self.jobs.get()));
        let mut tasks = JoinSet::new();

        for request in self.requests.iter() {
            let id = match selections.get(&request.size) {
                Some(Selection::Source(id)) => *id,
                _ => {
                    tracing::warn!(
                        "No source image is at least {}, skipping this size",
                        request.size
                    );
                    diagnostics.push(Diagnostic::SizeUnsatisfiable(request.size));
                    continue;
                }
            };

            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| IconProcessorError::WorkerPoolClosed)?;

            let catalog = self.catalog.clone();
            let request = *request;

            tasks.spawn_blocking(move || {
                let _permit = permit;
                let result = match catalog.get(id) {
                    Some(source) => build_entry(source, &request),
                    None => Err(EncodingError::UnknownSource(id)),
                };

                (request.size, result)
            });
        }

        let mut entries = Vec::with_capacity(tasks.len());
        while let Some(joined) = tasks.join_next().await {
            let (size, result) = joined?;
            match result {
                Ok(entry) => entries.push(entry),
                Err(error) => {
                    tracing::error!("Failed to encode the {} entry: {}", size, error);
                    diagnostics.push(Diagnostic::EntryFailed { size, error });
                }
            }
        }

        diagnostics.sort_by_key(Diagnostic::size);

        let container = IconContainer::new(kind, entries);
        let data = container.write()?;

        Ok(Assembly {
            container,
            data,
            diagnostics,
        })
    }
}

/// Resizes and encodes the entry for one request.
pub fn build_entry(source: &SourceImage, request: &OutputRequest) -> Result<IconEntry, EncodingError> {
    let encoding = EntryEncoding::decide(source.declared_kind(), source.format());
    let size = request.size.get() as u32;

    tracing::debug!(
        "Building {} {:?} entry from {} ({}x{})",
        request.size,
        encoding,
        source.label(),
        source.width(),
        source.height()
    );

    let pixmap = render::resize_to_square(source.pixmap(), size)?;
    let mask = match encoding {
        EntryEncoding::Bitmap => Some(render::derive_and_mask(&pixmap)),
        EntryEncoding::Png => None,
    };

    let payload = targets::encode_entry(&pixmap, mask.as_ref(), encoding)?;

    Ok(IconEntry {
        size: request.size,
        encoding,
        payload,
        hotspot: request.hotspot_set.then_some(request.hotspot),
    })
}

fn default_jobs() -> NonZeroUsize {
    std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

/// The result of a pipeline run.
#[derive(Debug)]
pub struct Assembly {
    pub container: IconContainer,

    /// The serialized container
    pub data: Vec<u8>,

    /// Problems with individual sizes, ordered by size
    pub diagnostics: Vec<Diagnostic>,
}

impl Assembly {
    /// The number of entries that failed to encode.
    pub fn failure_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| matches!(d, Diagnostic::EntryFailed { .. }))
            .count()
    }

    /// Whether any entry failed to encode.
    pub fn has_failures(&self) -> bool {
        self.failure_count() > 0
    }
}

/// A problem that caused a single size to be left out.
#[derive(Debug)]
pub enum Diagnostic {
    /// No source is large enough for the size
    SizeUnsatisfiable(IconSize),

    /// The entry could not be encoded
    EntryFailed { size: IconSize, error: EncodingError },
}

impl Diagnostic {
    pub fn size(&self) -> IconSize {
        match self {
            Self::SizeUnsatisfiable(size) => *size,
            Self::EntryFailed { size, .. } => *size,
        }
    }
}

#[derive(Error, Debug)]
pub enum IconProcessorError {
    #[error(transparent)]
    Container(#[from] ContainerError),

    #[error("an encoding worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),

    #[error("the worker pool was closed")]
    WorkerPoolClosed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::icon::inputs::decode::DecodedImage;
    use crate::icon::inputs::{DeclaredKind, SourceFormat};
    use crate::icon::render::Pixmap;
    use crate::icon::requests::{Hotspot, RequestTableBuilder};

    fn catalog(sources: &[(u32, DeclaredKind, SourceFormat)]) -> SourceCatalog {
        let mut catalog = SourceCatalog::new();
        for (i, &(size, kind, format)) in sources.iter().enumerate() {
            let image = DecodedImage {
                pixmap: Pixmap::filled(size, size, [200, 100, 50, 255]).unwrap(),
                format,
            };
            catalog.insert(format!("source-{}", i), image, kind);
        }
        catalog
    }

    fn size(v: u16) -> IconSize {
        IconSize::new(v).unwrap()
    }

    #[tokio::test]
    async fn skips_unsatisfiable_sizes() {
        let catalog = catalog(&[(64, DeclaredKind::Bitmap, SourceFormat::Other)]);
        let mut requests = RequestTableBuilder::new();
        requests.request(size(128)).request(size(16));

        let assembly = IconProcessor::new(catalog, requests.build())
            .process()
            .await
            .unwrap();

        assert_eq!(assembly.container.entries().len(), 1);
        assert_eq!(assembly.container.entries()[0].size, size(16));
        assert_eq!(
            assembly.container.entries()[0].encoding,
            EntryEncoding::Bitmap
        );

        assert_eq!(assembly.diagnostics.len(), 1);
        assert!(matches!(
            assembly.diagnostics[0],
            Diagnostic::SizeUnsatisfiable(s) if s == size(128)
        ));
        assert!(!assembly.has_failures());
    }

    #[tokio::test]
    async fn empty_requests_give_an_empty_container() {
        let catalog = catalog(&[(32, DeclaredKind::Png, SourceFormat::Png)]);
        let assembly = IconProcessor::new(catalog, OutputRequestTable::new())
            .process()
            .await
            .unwrap();

        assert!(assembly.container.entries().is_empty());
        assert_eq!(assembly.data, [0, 0, 1, 0, 0, 0]);
    }

    #[tokio::test]
    async fn single_job_gives_the_same_bytes() {
        let build = || {
            let catalog = catalog(&[
                (256, DeclaredKind::Png, SourceFormat::Png),
                (40, DeclaredKind::Automatic, SourceFormat::Other),
            ]);
            let mut requests = RequestTableBuilder::new();
            requests.request_presets();
            IconProcessor::new(catalog, requests.build())
        };

        let parallel = build()
            .with_jobs(NonZeroUsize::new(4).unwrap())
            .process()
            .await
            .unwrap();
        let serial = build().with_jobs(NonZeroUsize::MIN).process().await.unwrap();

        assert_eq!(parallel.data, serial.data);
    }

    #[tokio::test]
    async fn failed_entries_do_not_stop_other_sizes() {
        let catalog = catalog(&[(32, DeclaredKind::Bitmap, SourceFormat::Other)]);
        let known = catalog.iter().next().unwrap().id();

        // An id from a larger catalog that this processor cannot resolve
        let other = self::catalog(&[
            (32, DeclaredKind::Png, SourceFormat::Png),
            (32, DeclaredKind::Png, SourceFormat::Png),
        ]);
        let unknown = other.iter().last().unwrap().id();

        let mut requests = RequestTableBuilder::new();
        requests.request(size(16)).request(size(24)).request(size(32));
        let processor = IconProcessor::new(catalog, requests.build());

        let selections = BTreeMap::from([
            (size(16), Selection::Source(known)),
            (size(24), Selection::Source(unknown)),
            (size(32), Selection::Source(known)),
        ]);
        let assembly = processor.assemble(&selections).await.unwrap();

        let sizes: Vec<_> = assembly.container.entries().iter().map(|e| e.size).collect();
        assert_eq!(sizes, [size(16), size(32)]);
        assert_eq!(&assembly.data[..6], &[0, 0, 1, 0, 2, 0]);

        assert!(assembly.has_failures());
        assert_eq!(assembly.failure_count(), 1);
        assert!(matches!(
            &assembly.diagnostics[0],
            Diagnostic::EntryFailed {
                size: s,
                error: EncodingError::UnknownSource(id),
            } if *s == size(24) && *id == unknown
        ));
    }

    #[test]
    fn entries_carry_their_hotspot_only_if_set() {
        let catalog = catalog(&[(32, DeclaredKind::Png, SourceFormat::Png)]);
        let source = catalog.iter().next().unwrap();

        let request = OutputRequest {
            size: size(16),
            hotspot: Hotspot { x: 0.5, y: 0.5 },
            hotspot_set: true,
        };
        let entry = build_entry(source, &request).unwrap();
        assert_eq!(entry.hotspot, Some(Hotspot { x: 0.5, y: 0.5 }));
        assert_eq!(entry.encoding, EntryEncoding::Png);

        let request = OutputRequest {
            hotspot_set: false,
            ..request
        };
        assert_eq!(build_entry(source, &request).unwrap().hotspot, None);
    }
}
