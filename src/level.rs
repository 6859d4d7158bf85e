use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::images::{ImageSource, PixmapCache};
use crate::registry::SpriteRegistry;

/// The active level: its sprite registry and where sprite images come from.
pub struct Level {
    pub sprites: SpriteRegistry,
    pub images: Box<dyn ImageSource>,
}

impl Level {
    pub fn new(images: impl ImageSource + 'static) -> Self {
        Self { sprites: SpriteRegistry::new(), images: Box::new(images) }
    }

    pub fn with_asset_root(root: impl AsRef<std::path::Path>) -> Self {
        Self::new(PixmapCache::new(root))
    }
}

/// Shared access to the level for script values. Everything runs on the
/// game-loop thread; the mutex only satisfies the script engine's
/// `Send + Sync` bound on values it stores.
#[derive(Clone)]
pub struct LevelHandle(Arc<Mutex<Level>>);

impl LevelHandle {
    pub fn new(level: Level) -> Self {
        Self(Arc::new(Mutex::new(level)))
    }

    pub fn lock(&self) -> MutexGuard<'_, Level> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut Level) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn same_level(&self, other: &LevelHandle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
