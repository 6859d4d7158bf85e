use bevy_ecs::prelude::{Entity, Resource};
use glam::DVec2;
use std::fmt;

use crate::massivity::MassivityType;

/// State transitions the surrounding engine may react to.
#[derive(Debug, Clone, PartialEq)]
pub enum SpriteEvent {
    Allocated { entity: Entity, uid: u64 },
    Moved { entity: Entity, position: DVec2 },
    /// One combined placement, as opposed to two `Moved` nudges.
    Warped { entity: Entity, from: DVec2, to: DVec2 },
    VisibilityChanged { entity: Entity, visible: bool },
    MassivityChanged { entity: Entity, massivity: MassivityType },
    RegistryCleared { destroyed: usize },
}

impl SpriteEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            SpriteEvent::Allocated { .. } => "allocated",
            SpriteEvent::Moved { .. } => "moved",
            SpriteEvent::Warped { .. } => "warped",
            SpriteEvent::VisibilityChanged { .. } => "visibility_changed",
            SpriteEvent::MassivityChanged { .. } => "massivity_changed",
            SpriteEvent::RegistryCleared { .. } => "registry_cleared",
        }
    }
}

impl fmt::Display for SpriteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpriteEvent::Allocated { entity, uid } => {
                write!(f, "Allocated entity={} uid={}", entity.index(), uid)
            }
            SpriteEvent::Moved { entity, position } => {
                write!(f, "Moved entity={} pos=({:.3}, {:.3})", entity.index(), position.x, position.y)
            }
            SpriteEvent::Warped { entity, from, to } => write!(
                f,
                "Warped entity={} from=({:.3}, {:.3}) to=({:.3}, {:.3})",
                entity.index(),
                from.x,
                from.y,
                to.x,
                to.y
            ),
            SpriteEvent::VisibilityChanged { entity, visible } => {
                write!(f, "VisibilityChanged entity={} visible={}", entity.index(), visible)
            }
            SpriteEvent::MassivityChanged { entity, massivity } => {
                write!(f, "MassivityChanged entity={} type={}", entity.index(), massivity)
            }
            SpriteEvent::RegistryCleared { destroyed } => write!(f, "RegistryCleared destroyed={destroyed}"),
        }
    }
}

#[derive(Default, Resource)]
pub struct EventBus {
    events: Vec<SpriteEvent>,
}

impl EventBus {
    pub fn push(&mut self, event: SpriteEvent) {
        self.events.push(event);
    }

    pub fn drain(&mut self) -> Vec<SpriteEvent> {
        self.events.drain(..).collect()
    }
}
