//! The sprite registry: sole owner of sprite storage.
//!
//! Sprites are entities in a `bevy_ecs::World`. An `Entity` carries a
//! generation, so a token kept after the registry is cleared no longer
//! resolves instead of aliasing whatever reused its slot.

use bevy_ecs::prelude::{Component, Entity, World};
use glam::DVec2;
use std::collections::{BTreeMap, VecDeque};

use crate::error::SpriteError;
use crate::events::{EventBus, SpriteEvent};
use crate::images::ImageRef;
use crate::massivity::MassivityType;
use crate::subscriptions::{Callback, EventName, EventTable, FiredEvent};

// ---------- Components ----------
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpriteUid(pub u64);

#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Position(pub DVec2);

#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Massivity(pub MassivityType);

#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Visibility(pub bool);

/// Created at runtime; persistence and the editor skip it.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Spawned;

#[derive(Component, Clone, Debug)]
pub struct SpriteImage(pub ImageRef);

/// A sprite that has been built but not yet handed to the registry.
#[derive(Debug, Clone)]
pub struct SpriteBlueprint {
    pub uid: Option<u64>,
    pub position: DVec2,
    pub massivity: MassivityType,
    pub visible: bool,
    pub spawned: bool,
    pub image: Option<ImageRef>,
}

impl Default for SpriteBlueprint {
    fn default() -> Self {
        Self {
            uid: None,
            position: DVec2::ZERO,
            massivity: MassivityType::Passive,
            visible: true,
            spawned: false,
            image: None,
        }
    }
}

/// Read-only view of one sprite.
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteSnapshot {
    pub entity: Entity,
    pub uid: u64,
    pub position: DVec2,
    pub massivity: MassivityType,
    pub visible: bool,
    pub spawned: bool,
    pub image: Option<String>,
}

/// Largest UID a script integer can hold.
pub const MAX_UID: u64 = i64::MAX as u64;

pub struct SpriteRegistry {
    world: World,
    uids: BTreeMap<u64, Entity>,
    next_uid: u64,
    fired: VecDeque<FiredEvent>,
}

impl Default for SpriteRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SpriteRegistry {
    pub fn new() -> Self {
        let mut world = World::new();
        world.insert_resource(EventBus::default());
        Self { world, uids: BTreeMap::new(), next_uid: 1, fired: VecDeque::new() }
    }

    /// A blueprint with the engine's defaults for a level-authored sprite.
    pub fn create_entity(&self) -> SpriteBlueprint {
        SpriteBlueprint::default()
    }

    pub fn is_uid_in_use(&self, uid: u64) -> bool {
        self.uids.contains_key(&uid)
    }

    pub fn find_by_uid(&self, uid: u64) -> Option<Entity> {
        self.uids.get(&uid).copied()
    }

    /// Takes ownership of a blueprint. A forced UID must be free; without
    /// one the next unused UID is assigned. Nothing changes on error.
    pub fn register(&mut self, blueprint: SpriteBlueprint) -> Result<Entity, SpriteError> {
        if !blueprint.position.is_finite() {
            return Err(SpriteError::argument("position", "finite coordinates", format!("{}", blueprint.position)));
        }
        let uid = match blueprint.uid {
            Some(uid) if uid > MAX_UID => {
                return Err(SpriteError::argument("uid", "an integer no larger than i64::MAX", uid.to_string()))
            }
            Some(uid) if self.is_uid_in_use(uid) => return Err(SpriteError::DuplicateIdentifier { uid }),
            Some(uid) => uid,
            None => self.next_free_uid(),
        };
        let mut entity_mut = self.world.spawn((
            SpriteUid(uid),
            Position(blueprint.position),
            Massivity(blueprint.massivity),
            Visibility(blueprint.visible),
            EventTable::default(),
        ));
        if blueprint.spawned {
            entity_mut.insert(Spawned);
        }
        if let Some(image) = blueprint.image {
            entity_mut.insert(SpriteImage(image));
        }
        let entity = entity_mut.id();
        self.uids.insert(uid, entity);
        self.emit(SpriteEvent::Allocated { entity, uid });
        Ok(entity)
    }

    fn next_free_uid(&mut self) -> u64 {
        while self.is_uid_in_use(self.next_uid) {
            self.next_uid += 1;
        }
        let uid = self.next_uid;
        self.next_uid += 1;
        uid
    }

    /// Level unload. Every sprite, and every callback stored on one, is
    /// dropped; outstanding handles become stale.
    pub fn destroy_all(&mut self) {
        let destroyed = self.uids.len();
        for (_, entity) in std::mem::take(&mut self.uids) {
            let _ = self.world.despawn(entity);
        }
        self.fired.clear();
        self.next_uid = 1;
        self.emit(SpriteEvent::RegistryCleared { destroyed });
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.world.get::<SpriteUid>(entity).is_some()
    }

    pub fn len(&self) -> usize {
        self.uids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uids.is_empty()
    }

    /// Live sprites in UID order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.uids.values().copied()
    }

    /// Sprites that belong to the level itself, i.e. not spawned by scripts.
    pub fn level_sprites(&self) -> Vec<Entity> {
        self.entities().filter(|&entity| self.world.get::<Spawned>(entity).is_none()).collect()
    }

    pub fn snapshot(&self, entity: Entity) -> Result<SpriteSnapshot, SpriteError> {
        Ok(SpriteSnapshot {
            entity,
            uid: self.uid(entity)?,
            position: self.position(entity)?,
            massivity: self.massivity(entity)?,
            visible: self.is_visible(entity)?,
            spawned: self.is_spawned(entity)?,
            image: self.image(entity)?.map(|image| image.path().to_string()),
        })
    }

    // ---------- Accessors ----------
    pub fn uid(&self, entity: Entity) -> Result<u64, SpriteError> {
        self.world.get::<SpriteUid>(entity).map(|uid| uid.0).ok_or_else(|| stale(entity))
    }

    pub fn position(&self, entity: Entity) -> Result<DVec2, SpriteError> {
        self.world.get::<Position>(entity).map(|pos| pos.0).ok_or_else(|| stale(entity))
    }

    pub fn massivity(&self, entity: Entity) -> Result<MassivityType, SpriteError> {
        self.world.get::<Massivity>(entity).map(|m| m.0).ok_or_else(|| stale(entity))
    }

    pub fn is_visible(&self, entity: Entity) -> Result<bool, SpriteError> {
        self.world.get::<Visibility>(entity).map(|v| v.0).ok_or_else(|| stale(entity))
    }

    pub fn is_spawned(&self, entity: Entity) -> Result<bool, SpriteError> {
        self.ensure_live(entity)?;
        Ok(self.world.get::<Spawned>(entity).is_some())
    }

    pub fn image(&self, entity: Entity) -> Result<Option<ImageRef>, SpriteError> {
        self.ensure_live(entity)?;
        Ok(self.world.get::<SpriteImage>(entity).map(|image| image.0.clone()))
    }

    pub fn set_x(&mut self, entity: Entity, x: f64) -> Result<(), SpriteError> {
        let y = self.position(entity)?.y;
        self.nudge(entity, DVec2::new(x, y))
    }

    pub fn set_y(&mut self, entity: Entity, y: f64) -> Result<(), SpriteError> {
        let x = self.position(entity)?.x;
        self.nudge(entity, DVec2::new(x, y))
    }

    fn nudge(&mut self, entity: Entity, position: DVec2) -> Result<(), SpriteError> {
        self.write_position(entity, position)?;
        self.emit(SpriteEvent::Moved { entity, position });
        Ok(())
    }

    /// Places the sprite in one step, without the placement checks applied
    /// to level entries.
    pub fn warp(&mut self, entity: Entity, to: DVec2) -> Result<(), SpriteError> {
        let from = self.write_position(entity, to)?;
        self.emit(SpriteEvent::Warped { entity, from, to });
        Ok(())
    }

    fn write_position(&mut self, entity: Entity, position: DVec2) -> Result<DVec2, SpriteError> {
        if !position.is_finite() {
            return Err(SpriteError::argument("position", "finite coordinates", format!("{position}")));
        }
        let mut current = self.world.get_mut::<Position>(entity).ok_or_else(|| stale(entity))?;
        let previous = current.0;
        current.0 = position;
        Ok(previous)
    }

    pub fn set_visible(&mut self, entity: Entity, visible: bool) -> Result<(), SpriteError> {
        {
            let mut flag = self.world.get_mut::<Visibility>(entity).ok_or_else(|| stale(entity))?;
            flag.0 = visible;
        }
        self.emit(SpriteEvent::VisibilityChanged { entity, visible });
        Ok(())
    }

    pub fn set_massivity(&mut self, entity: Entity, massivity: MassivityType) -> Result<(), SpriteError> {
        {
            let mut current = self.world.get_mut::<Massivity>(entity).ok_or_else(|| stale(entity))?;
            current.0 = massivity;
        }
        self.emit(SpriteEvent::MassivityChanged { entity, massivity });
        Ok(())
    }

    // ---------- Subscriptions ----------
    pub fn subscribe(&mut self, entity: Entity, event: EventName, callback: Callback) -> Result<(), SpriteError> {
        let mut table = self.world.get_mut::<EventTable>(entity).ok_or_else(|| stale(entity))?;
        table.subscribe(event, callback);
        Ok(())
    }

    pub fn listeners(&self, entity: Entity, event: &EventName) -> Result<Vec<Callback>, SpriteError> {
        self.world.get::<EventTable>(entity).map(|table| table.listeners(event)).ok_or_else(|| stale(entity))
    }

    pub fn take_listeners(&mut self, entity: Entity, event: &EventName) -> Result<Vec<Callback>, SpriteError> {
        let mut table = self.world.get_mut::<EventTable>(entity).ok_or_else(|| stale(entity))?;
        Ok(table.take(event))
    }

    /// Puts undelivered callbacks back ahead of anything subscribed since
    /// they were taken.
    pub fn restore_listeners(
        &mut self,
        entity: Entity,
        event: EventName,
        callbacks: Vec<Callback>,
    ) -> Result<(), SpriteError> {
        let mut table = self.world.get_mut::<EventTable>(entity).ok_or_else(|| stale(entity))?;
        table.restore(event, callbacks);
        Ok(())
    }

    pub fn listener_count(&self, entity: Entity, event: &EventName) -> usize {
        self.world.get::<EventTable>(entity).map_or(0, |table| table.listener_count(event))
    }

    /// Queues `event` for delivery to the sprite's callbacks on the next
    /// dispatch pass.
    pub fn fire(&mut self, entity: Entity, event: EventName) -> Result<(), SpriteError> {
        self.ensure_live(entity)?;
        self.fired.push_back(FiredEvent { entity, event });
        Ok(())
    }

    pub fn take_fired(&mut self) -> Vec<FiredEvent> {
        self.fired.drain(..).collect()
    }

    // ---------- Engine notifications ----------
    pub fn drain_events(&mut self) -> Vec<SpriteEvent> {
        self.world.resource_mut::<EventBus>().drain()
    }

    fn emit(&mut self, event: SpriteEvent) {
        self.world.resource_mut::<EventBus>().push(event);
    }

    fn ensure_live(&self, entity: Entity) -> Result<(), SpriteError> {
        if self.contains(entity) {
            Ok(())
        } else {
            Err(stale(entity))
        }
    }
}

fn stale(entity: Entity) -> SpriteError {
    SpriteError::StaleHandle { entity: format!("{}v{}", entity.index(), entity.generation()) }
}
