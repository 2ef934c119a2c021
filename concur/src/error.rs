use concur::icon::gen::OutputError;
use concur::icon::inputs::CatalogError;
use concur::icon::meta::MetadataError;
use concur::icon::requests::RequestError;
use concur::icon::IconProcessorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConcurError {
    #[error("invalid request: {0}")]
    Request(#[from] RequestError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Processor(#[from] IconProcessorError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("no output path was specified")]
    MissingOutput,

    #[error("{0} entries could not be encoded")]
    EntriesFailed(usize),
}

impl ConcurError {
    /// The process exit code reported for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Request(_) | Self::Metadata(_) => 2,
            Self::Catalog(CatalogError::NotFound(_) | CatalogError::NotAFile(_)) => 3,
            Self::Catalog(_) => 4,
            Self::Output(_) => 5,
            Self::Processor(_) | Self::MissingOutput | Self::EntriesFailed(_) => 1,
        }
    }
}
