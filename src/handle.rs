//! Script-facing sprite handles.
//!
//! A [`SpriteHandle`] never owns its sprite. It names an entity (index plus
//! generation) in the level's registry, so any number of handles can point
//! at one sprite, and dropping them never touches the sprite itself.

use bevy_ecs::prelude::Entity;
use glam::DVec2;
use std::fmt;
use tracing::{debug, warn};

use crate::error::SpriteError;
use crate::level::LevelHandle;
use crate::massivity::MassivityType;
use crate::registry::SpriteSnapshot;
use crate::subscriptions::{self, Callback, EventName};

/// Optional arguments of sprite allocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpriteSpawn {
    pub image_path: Option<String>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub uid: Option<u64>,
}

#[derive(Clone)]
pub struct SpriteHandle {
    entity: Entity,
    level: LevelHandle,
}

impl SpriteHandle {
    pub(crate) fn new(entity: Entity, level: LevelHandle) -> Self {
        Self { entity, level }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn get_uid(&self) -> Result<u64, SpriteError> {
        self.level.lock().sprites.uid(self.entity)
    }

    pub fn get_x(&self) -> Result<f64, SpriteError> {
        Ok(self.pos()?.x)
    }

    pub fn get_y(&self) -> Result<f64, SpriteError> {
        Ok(self.pos()?.y)
    }

    pub fn pos(&self) -> Result<DVec2, SpriteError> {
        self.level.lock().sprites.position(self.entity)
    }

    /// Bypasses level placement validation.
    pub fn set_x(&self, x: f64) -> Result<(), SpriteError> {
        self.level.lock().sprites.set_x(self.entity, x)
    }

    /// Bypasses level placement validation.
    pub fn set_y(&self, y: f64) -> Result<(), SpriteError> {
        self.level.lock().sprites.set_y(self.entity, y)
    }

    pub fn warp(&self, x: f64, y: f64) -> Result<(), SpriteError> {
        self.level.lock().sprites.warp(self.entity, DVec2::new(x, y))
    }

    pub fn show(&self) -> Result<(), SpriteError> {
        self.level.lock().sprites.set_visible(self.entity, true)
    }

    /// Only hides the sprite; a massive sprite still collides.
    pub fn hide(&self) -> Result<(), SpriteError> {
        self.level.lock().sprites.set_visible(self.entity, false)
    }

    pub fn is_visible(&self) -> Result<bool, SpriteError> {
        self.level.lock().sprites.is_visible(self.entity)
    }

    pub fn is_spawned(&self) -> Result<bool, SpriteError> {
        self.level.lock().sprites.is_spawned(self.entity)
    }

    pub fn massive_type(&self) -> Result<MassivityType, SpriteError> {
        self.level.lock().sprites.massivity(self.entity)
    }

    pub fn set_massive_type(&self, name: &str) -> Result<(), SpriteError> {
        let massivity = MassivityType::from_script_name(name)?;
        self.level.lock().sprites.set_massivity(self.entity, massivity)
    }

    pub fn image_path(&self) -> Result<Option<String>, SpriteError> {
        let image = self.level.lock().sprites.image(self.entity)?;
        Ok(image.map(|image| image.path().to_string()))
    }

    pub fn snapshot(&self) -> Result<SpriteSnapshot, SpriteError> {
        self.level.lock().sprites.snapshot(self.entity)
    }

    pub fn register(&self, event: &str, callback: Callback) -> Result<(), SpriteError> {
        let event = EventName::new(event)?;
        debug!(entity = self.entity.index(), %event, callback = callback.name(), "subscribed sprite callback");
        self.level.lock().sprites.subscribe(self.entity, event, callback)
    }

    pub fn on_touch(&self, callback: Callback) -> Result<(), SpriteError> {
        self.register(subscriptions::TOUCH, callback)
    }

    /// Both handles name the same sprite of the same level.
    pub fn same_sprite(&self, other: &SpriteHandle) -> bool {
        self.entity == other.entity && self.level.same_level(&other.level)
    }
}

impl fmt::Debug for SpriteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpriteHandle").field("entity", &self.entity).finish()
    }
}

impl fmt::Display for SpriteHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.get_uid() {
            Ok(uid) => write!(f, "Sprite(uid={uid})"),
            Err(_) => write!(f, "Sprite(stale)"),
        }
    }
}

/// The sprite namespace: allocation and lookup by UID.
#[derive(Clone)]
pub struct SpriteClass {
    level: LevelHandle,
}

impl SpriteClass {
    pub fn new(level: LevelHandle) -> Self {
        Self { level }
    }

    /// Creates a hidden, front-passive, spawned sprite owned by the level.
    pub fn allocate(&self, spawn: SpriteSpawn) -> Result<SpriteHandle, SpriteError> {
        let entity = self.level.with(|level| {
            if let Some(uid) = spawn.uid {
                if level.sprites.is_uid_in_use(uid) {
                    return Err(SpriteError::DuplicateIdentifier { uid });
                }
            }
            let mut blueprint = level.sprites.create_entity();
            if let Some(path) = spawn.image_path.as_deref() {
                match level.images.load_image(path) {
                    Ok(image) => blueprint.image = Some(image),
                    Err(err) => warn!(path, "sprite image unavailable, allocating without one: {err:#}"),
                }
            }
            if let Some(x) = spawn.x {
                blueprint.position.x = x;
            }
            if let Some(y) = spawn.y {
                blueprint.position.y = y;
            }
            blueprint.uid = spawn.uid;
            blueprint.massivity = MassivityType::FrontPassive;
            blueprint.visible = false;
            blueprint.spawned = true;
            level.sprites.register(blueprint)
        })?;
        debug!(entity = entity.index(), "allocated script sprite");
        Ok(SpriteHandle::new(entity, self.level.clone()))
    }

    /// A fresh handle for the live sprite with `uid`, if any.
    pub fn find_by_uid(&self, uid: u64) -> Option<SpriteHandle> {
        let entity = self.level.lock().sprites.find_by_uid(uid)?;
        Some(SpriteHandle::new(entity, self.level.clone()))
    }

    pub fn level(&self) -> &LevelHandle {
        &self.level
    }
}
