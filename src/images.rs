use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// A loaded sprite image. Cheap to clone; sprites sharing a path share it.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRef(Arc<ImageInfo>);

#[derive(Debug, PartialEq)]
pub struct ImageInfo {
    /// Path as the script gave it, relative to the asset root.
    pub path: String,
    pub width: u32,
    pub height: u32,
}

impl ImageRef {
    pub fn new(path: impl Into<String>, width: u32, height: u32) -> Self {
        Self(Arc::new(ImageInfo { path: path.into(), width, height }))
    }

    pub fn path(&self) -> &str {
        &self.0.path
    }
}

/// Resolves image paths for sprite allocation.
pub trait ImageSource: Send {
    fn load_image(&mut self, path: &str) -> Result<ImageRef>;
}

/// Reads images below a fixed asset root, caching by relative path.
pub struct PixmapCache {
    root: PathBuf,
    cache: HashMap<String, ImageRef>,
}

impl PixmapCache {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self { root: root.as_ref().to_path_buf(), cache: HashMap::new() }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|part| !matches!(part, Component::Normal(_) | Component::CurDir));
        if path.is_empty() || escapes {
            return Err(anyhow!("Image path '{path}' must stay inside {}", self.root.display()));
        }
        Ok(self.root.join(relative))
    }
}

impl ImageSource for PixmapCache {
    fn load_image(&mut self, path: &str) -> Result<ImageRef> {
        if let Some(image) = self.cache.get(path) {
            return Ok(image.clone());
        }
        let full = self.resolve(path)?;
        let (width, height) = image::image_dimensions(&full)
            .with_context(|| format!("Failed to read image {}", full.display()))?;
        let image = ImageRef::new(path, width, height);
        self.cache.insert(path.to_string(), image.clone());
        Ok(image)
    }
}
