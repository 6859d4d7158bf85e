pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod handle;
pub mod images;
pub mod level;
pub mod logging;
pub mod massivity;
pub mod registry;
pub mod script_api;
pub mod script_harness;
pub mod scripts;
pub mod subscriptions;

pub use error::SpriteError;
pub use handle::{SpriteClass, SpriteHandle, SpriteSpawn};
pub use level::{Level, LevelHandle};
pub use massivity::MassivityType;
pub use registry::SpriteRegistry;
pub use scripts::ScriptHost;
