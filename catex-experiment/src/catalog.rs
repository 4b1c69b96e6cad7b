use crate::config::StimulusFolder;
use crate::error::ExperimentError;
use catex_core::{AssetRef, Category};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Enumerates the stimulus images available for a category.
pub trait StimulusCatalog {
    /// Fails with `MissingAsset` when the category has no images at all.
    fn list_assets(&self, category: &Category) -> Result<Vec<AssetRef>, ExperimentError>;
}

/// Catalog backed by one folder per category.
#[derive(Debug, Clone, Default)]
pub struct DirectoryCatalog {
    folders: Vec<StimulusFolder>,
}

impl DirectoryCatalog {
    pub fn new(folders: impl IntoIterator<Item = StimulusFolder>) -> Self {
        Self {
            folders: folders.into_iter().collect(),
        }
    }

    fn folder_for(&self, category: &Category) -> Option<&Path> {
        self.folders
            .iter()
            .find(|f| &f.category == category)
            .map(|f| f.folder.as_path())
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
        .unwrap_or(false)
}

impl StimulusCatalog for DirectoryCatalog {
    fn list_assets(&self, category: &Category) -> Result<Vec<AssetRef>, ExperimentError> {
        let missing = |folder: PathBuf| ExperimentError::MissingAsset {
            category: category.to_string(),
            folder,
        };

        let folder = self
            .folder_for(category)
            .ok_or_else(|| missing(PathBuf::new()))?;

        let entries = match std::fs::read_dir(folder) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Err(missing(folder.to_path_buf())),
            Err(source) => {
                return Err(ExperimentError::Catalog {
                    folder: folder.to_path_buf(),
                    source,
                });
            }
        };

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ExperimentError::Catalog {
                folder: folder.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && is_image(&path) {
                paths.push(path);
            }
        }
        // read_dir order is platform dependent; sort so seeded plans repeat.
        paths.sort();

        debug!(%category, folder = %folder.display(), count = paths.len(), "listed stimuli");
        if paths.is_empty() {
            return Err(missing(folder.to_path_buf()));
        }

        Ok(paths
            .into_iter()
            .map(|p| AssetRef::new(category.clone(), p))
            .collect())
    }
}
