use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;
use crate::error::{WallfitError, CatalogError};
use crate::Result;

pub const SUPPORTED_EXTENSIONS: [&str; 8] = ["jpg", "jpeg", "png", "gif", "bmp", "tiff", "tif", "webp"];

/// Pixel size of an image or an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Snapshot of every known candidate image and its dimensions.
///
/// A catalog is rebuilt wholesale on every scan and never edited in place, so
/// it can be shared behind an `Arc` while a new one is being built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    images: BTreeMap<PathBuf, Dimensions>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, dimensions: Dimensions) {
        self.images.insert(path.into(), dimensions);
    }

    pub fn get(&self, path: &Path) -> Option<Dimensions> {
        self.images.get(path).copied()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.images.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Images in path order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, Dimensions)> {
        self.images.iter().map(|(path, dims)| (path.as_path(), *dims))
    }

    /// Builds a catalog from the supported images found under `dir`.
    ///
    /// Only a missing or non-directory `dir` is an error. Files whose
    /// dimensions cannot be read are skipped.
    pub fn scan(dir: &Path, recursive: bool) -> Result<Self> {
        if !dir.exists() {
            return Err(WallfitError::Catalog(CatalogError::DirectoryRead {
                path: dir.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "Directory not found"),
            }));
        }

        if !dir.is_dir() {
            return Err(WallfitError::Catalog(CatalogError::DirectoryRead {
                path: dir.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "Path is not a directory"),
            }));
        }

        let mut walker = WalkDir::new(dir).follow_links(true);
        if !recursive {
            walker = walker.max_depth(1);
        }

        let mut catalog = Catalog::new();
        for entry in walker.into_iter().filter_map(|e| e.ok()) {
            let entry_path = entry.path();
            if !entry_path.is_file() || !is_supported(entry_path) {
                continue;
            }

            match read_dimensions(entry_path) {
                Ok(dimensions) => catalog.insert(entry_path, dimensions),
                Err(e) => log::warn!("Skipping {:?}: {}", entry_path, e),
            }
        }

        log::info!("Catalogued {} images in {:?}", catalog.len(), dir);
        Ok(catalog)
    }
}

impl FromIterator<(PathBuf, Dimensions)> for Catalog {
    fn from_iter<I: IntoIterator<Item = (PathBuf, Dimensions)>>(iter: I) -> Self {
        Self { images: iter.into_iter().collect() }
    }
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Reads the image header only; pixel data is never decoded.
pub fn read_dimensions(path: &Path) -> Result<Dimensions> {
    if !is_supported(path) {
        return Err(WallfitError::Catalog(CatalogError::UnsupportedFormat {
            path: path.to_path_buf(),
        }));
    }

    let (width, height) = image::image_dimensions(path)
        .map_err(|e| WallfitError::Catalog(CatalogError::Dimensions {
            path: path.to_path_buf(),
            message: e.to_string(),
        }))?;

    if width == 0 || height == 0 {
        return Err(WallfitError::Catalog(CatalogError::EmptyImage {
            path: path.to_path_buf(),
        }));
    }

    Ok(Dimensions::new(width, height))
}
