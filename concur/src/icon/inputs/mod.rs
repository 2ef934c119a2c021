use crate::icon::meta::SourceDeclaration;
use crate::icon::render::Pixmap;
use serde::Deserialize;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use thiserror::Error;

pub mod decode;

use self::decode::{DecodeError, DecodedImage, SourceDecoder};

/// The encoding the caller asked for when declaring a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeclaredKind {
    /// PNG if the source was read from a PNG file, a bitmap otherwise
    #[default]
    Automatic,

    /// Always store entries as PNG
    Png,

    /// Always store entries as bitmaps
    #[serde(alias = "bmp", alias = "dib")]
    Bitmap,
}

/// The file format a source was decoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Png,
    Other,
}

/// Identifies a source by its declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId(usize);

impl SourceId {
    /// The zero based position the source was declared at.
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for SourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A decoded source image.
#[derive(Debug)]
pub struct SourceImage {
    id: SourceId,
    label: String,
    pixmap: Pixmap,
    declared_kind: DeclaredKind,
    format: SourceFormat,
}

impl SourceImage {
    pub fn id(&self) -> SourceId {
        self.id
    }

    /// The path or name the source was declared with.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn width(&self) -> u32 {
        self.pixmap.width()
    }

    pub fn height(&self) -> u32 {
        self.pixmap.height()
    }

    pub fn declared_kind(&self) -> DeclaredKind {
        self.declared_kind
    }

    pub fn format(&self) -> SourceFormat {
        self.format
    }
}

/// All sources available to the pipeline, in declaration order.
#[derive(Debug, Default)]
pub struct SourceCatalog {
    sources: Vec<SourceImage>,
}

impl SourceCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a decoded image to the catalog.
    pub fn insert(
        &mut self,
        label: impl Into<String>,
        image: DecodedImage,
        declared_kind: DeclaredKind,
    ) -> SourceId {
        let id = SourceId(self.sources.len());
        self.sources.push(SourceImage {
            id,
            label: label.into(),
            pixmap: image.pixmap,
            declared_kind,
            format: image.format,
        });

        id
    }

    /// Reads and decodes every declared source.
    ///
    /// All paths are checked before anything is read, so every missing input gets reported.
    pub async fn load(
        declarations: &[SourceDeclaration],
        decoder: &dyn SourceDecoder,
    ) -> Result<Self, CatalogError> {
        let mut first_error = None;
        for declaration in declarations {
            if let Err(err) = check_input_path(&declaration.file).await {
                tracing::error!("{}", err);
                first_error.get_or_insert(err);
            }
        }

        if let Some(err) = first_error {
            return Err(err);
        }

        let mut catalog = Self::new();
        for declaration in declarations {
            let path = &declaration.file;
            let data = tokio::fs::read(path)
                .await
                .map_err(|source| CatalogError::Read {
                    path: path.clone(),
                    source,
                })?;

            let image = decoder
                .decode(&data, path)
                .map_err(|source| CatalogError::SourceDecodeUnavailable {
                    label: path.display().to_string(),
                    source,
                })?;

            tracing::debug!(
                "Loaded source {} ({}x{}, {:?}, declared {:?})",
                path.display(),
                image.pixmap.width(),
                image.pixmap.height(),
                image.format,
                declaration.kind
            );

            catalog.insert(path.display().to_string(), image, declaration.kind);
        }

        Ok(catalog)
    }

    pub fn get(&self, id: SourceId) -> Option<&SourceImage> {
        self.sources.get(id.0)
    }

    /// Iterates the sources in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, SourceImage> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

async fn check_input_path(path: &std::path::Path) -> Result<(), CatalogError> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => Ok(()),
        Ok(_) => Err(CatalogError::NotAFile(path.to_path_buf())),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            Err(CatalogError::NotFound(path.to_path_buf()))
        }
        Err(source) => Err(CatalogError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("input path {} does not exist", .0.display())]
    NotFound(PathBuf),

    #[error("input path {} is not a file", .0.display())]
    NotAFile(PathBuf),

    #[error("failed to read input {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode source {label}: {source}")]
    SourceDecodeUnavailable { label: String, source: DecodeError },
}
