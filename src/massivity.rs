use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SpriteError;

/// Collision-interaction category of a sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MassivityType {
    #[default]
    Passive,
    FrontPassive,
    Massive,
    HalfMassive,
    Climbable,
    /// Engine-internal, never selectable from scripts.
    Enemy,
    /// Engine-internal, never selectable from scripts.
    Player,
}

/// Names scripts may pass to `set_massive_type`. Aliases map onto the same
/// variant as their canonical spelling.
const SCRIPT_NAMES: &[(&str, MassivityType)] = &[
    ("passive", MassivityType::Passive),
    ("front_passive", MassivityType::FrontPassive),
    ("frontpassive", MassivityType::FrontPassive),
    ("massive", MassivityType::Massive),
    ("half_massive", MassivityType::HalfMassive),
    ("halfmassive", MassivityType::HalfMassive),
    ("climbable", MassivityType::Climbable),
];

impl MassivityType {
    pub fn from_script_name(name: &str) -> Result<Self, SpriteError> {
        SCRIPT_NAMES
            .iter()
            .find(|(candidate, _)| *candidate == name)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| SpriteError::InvalidEnumerant { name: name.to_string() })
    }

    pub fn name(self) -> &'static str {
        match self {
            MassivityType::Passive => "passive",
            MassivityType::FrontPassive => "front_passive",
            MassivityType::Massive => "massive",
            MassivityType::HalfMassive => "half_massive",
            MassivityType::Climbable => "climbable",
            MassivityType::Enemy => "enemy",
            MassivityType::Player => "player",
        }
    }
}

impl fmt::Display for MassivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
