use crate::icon::inputs::DeclaredKind;
use crate::icon::requests::{IconSize, OutputRequestTable, RequestError, RequestTableBuilder};
use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// A JSON description of an icon or cursor to assemble.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IconMetadata {
    /// The path the container is written to
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// The source images, in declaration order
    #[serde(default)]
    pub sources: Vec<SourceDeclaration>,

    /// Hotspot and size declarations, applied in order
    #[serde(default)]
    pub outputs: Vec<OutputStep>,

    /// The maximum number of entries encoded at the same time
    #[serde(default)]
    pub jobs: Option<NonZeroUsize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SourceDeclaration {
    /// The path to the source image
    pub file: PathBuf,

    /// How entries derived from this source are encoded
    #[serde(default)]
    pub kind: DeclaredKind,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OutputStep {
    /// Sets both hotspot coordinates
    #[serde(default)]
    pub hotspot: Option<[f64; 2]>,

    #[serde(default)]
    pub hotspot_x: Option<f64>,

    #[serde(default)]
    pub hotspot_y: Option<f64>,

    /// The size to request, after the hotspot of this step was applied
    #[serde(default)]
    pub size: Option<u16>,

    /// Requests all preset sizes
    #[serde(default)]
    pub all: bool,
}

impl IconMetadata {
    /// Loads metadata from a JSON file.
    ///
    /// Relative paths inside the file are resolved against the file's directory.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, MetadataError> {
        let path = path.as_ref();
        let data = tokio::fs::read_to_string(path).await.map_err(|source| MetadataError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut metadata = Self::from_json(&data)?;
        if let Some(base_dir) = path.parent() {
            metadata.resolve_relative_to(base_dir);
        }

        Ok(metadata)
    }

    pub fn from_json(data: &str) -> Result<Self, MetadataError> {
        serde_json::from_str(data).map_err(MetadataError::Parse)
    }

    fn resolve_relative_to(&mut self, base_dir: &Path) {
        for source in &mut self.sources {
            if source.file.is_relative() {
                source.file = base_dir.join(&source.file);
            }
        }

        if let Some(output) = &mut self.output {
            if output.is_relative() {
                *output = base_dir.join(&*output);
            }
        }
    }

    /// Flattens the metadata into build steps, sources first.
    pub fn steps(&self) -> Vec<BuildStep> {
        let sources = self
            .sources
            .iter()
            .cloned()
            .map(BuildStep::Source);

        let outputs = self.outputs.iter().flat_map(|output| {
            let (hotspot_x, hotspot_y) = match output.hotspot {
                Some([x, y]) => (Some(x), Some(y)),
                None => (output.hotspot_x, output.hotspot_y),
            };

            hotspot_x
                .map(BuildStep::HotspotX)
                .into_iter()
                .chain(hotspot_y.map(BuildStep::HotspotY))
                .chain(output.size.map(BuildStep::Size))
                .chain(output.all.then_some(BuildStep::Presets))
        });

        sources.chain(outputs).collect()
    }
}

/// A single declaration, in the order it was made.
#[derive(Debug, Clone, PartialEq)]
pub enum BuildStep {
    Source(SourceDeclaration),
    HotspotX(f64),
    HotspotY(f64),
    Size(u16),
    Presets,
}

/// The sources and requests resulting from a sequence of build steps.
#[derive(Debug, Clone, Default)]
pub struct BuildPlan {
    pub sources: Vec<SourceDeclaration>,
    pub requests: OutputRequestTable,
}

impl BuildPlan {
    /// Applies the steps in order.
    ///
    /// Declaring the same source path twice keeps its first position but takes the later kind.
    pub fn from_steps(steps: impl IntoIterator<Item = BuildStep>) -> Result<Self, RequestError> {
        let mut sources: Vec<SourceDeclaration> = Vec::new();
        let mut requests = RequestTableBuilder::new();

        for step in steps {
            match step {
                BuildStep::Source(declaration) => {
                    match sources.iter_mut().find(|s| s.file == declaration.file) {
                        Some(existing) => existing.kind = declaration.kind,
                        None => sources.push(declaration),
                    }
                }
                BuildStep::HotspotX(x) => {
                    requests.hotspot_x(x)?;
                }
                BuildStep::HotspotY(y) => {
                    requests.hotspot_y(y)?;
                }
                BuildStep::Size(size) => {
                    requests.request(IconSize::new(size)?);
                }
                BuildStep::Presets => {
                    requests.request_presets();
                }
            }
        }

        Ok(Self {
            sources,
            requests: requests.build(),
        })
    }
}

#[derive(Debug, Error)]
pub enum MetadataError {
    #[error("failed to read metadata file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("an error occurred while parsing the icon metadata: {0}")]
    Parse(serde_json::Error),
}
