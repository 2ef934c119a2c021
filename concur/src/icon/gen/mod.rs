use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Writes finished containers to their destination.
#[derive(Debug)]
pub struct OutputGenerator {
    path: PathBuf,
}

impl OutputGenerator {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Makes sure the destination is either missing or a regular file.
    pub async fn check_destination(&self) -> Result<(), OutputError> {
        match tokio::fs::metadata(&self.path).await {
            Ok(metadata) if !metadata.is_file() => Err(OutputError::NotAFile(self.path.clone())),
            Ok(_) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(OutputError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Writes the data to the destination.
    ///
    /// Missing parent directories are created. The data goes to a temporary file next to the
    /// destination first and is then renamed over it, so readers never see a partial file.
    pub async fn write(&self, data: &[u8]) -> Result<(), OutputError> {
        self.check_destination().await?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| OutputError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let temporary = self.temporary_path();
        tracing::trace!("Writing {} bytes to {}", data.len(), temporary.display());

        if let Err(source) = tokio::fs::write(&temporary, data).await {
            let _ = tokio::fs::remove_file(&temporary).await;
            return Err(OutputError::Io {
                path: temporary,
                source,
            });
        }

        if let Err(source) = tokio::fs::rename(&temporary, &self.path).await {
            let _ = tokio::fs::remove_file(&temporary).await;
            return Err(OutputError::Io {
                path: self.path.clone(),
                source,
            });
        }

        Ok(())
    }

    fn temporary_path(&self) -> PathBuf {
        let mut name = OsString::from(".");
        name.push(self.path.file_name().unwrap_or_default());
        name.push(".partial");
        self.path.with_file_name(name)
    }
}

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("output path {} already exists and is not a file", .0.display())]
    NotAFile(PathBuf),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}
