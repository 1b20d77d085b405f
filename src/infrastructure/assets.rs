use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use log::debug;

use crate::domain::errors::DomainError;
use crate::domain::ports::AssetStore;

/// Customization uploads kept on local disk under `root`.
pub struct FsAssetStore {
    root: PathBuf,
}

impl FsAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Refs are relative to the upload root and may not climb out of it.
    fn resolve(&self, asset_ref: &str) -> Result<PathBuf, DomainError> {
        let relative = Path::new(asset_ref);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if asset_ref.is_empty() || escapes {
            return Err(DomainError::validation(format!(
                "Invalid asset reference '{}'",
                asset_ref
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl AssetStore for FsAssetStore {
    fn delete(&self, asset_ref: &str) -> Result<(), DomainError> {
        let path = self.resolve(asset_ref)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Deleted customization asset {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DomainError::Internal(format!(
                "could not delete {}: {}",
                path.display(),
                e
            ))),
        }
    }
}
