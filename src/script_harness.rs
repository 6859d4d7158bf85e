use std::fs::File;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::BridgeConfig;
use crate::level::{Level, LevelHandle};
use crate::massivity::MassivityType;
use crate::registry::SpriteSnapshot;
use crate::scripts::ScriptHost;
use crate::subscriptions::EventName;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarnessFixture {
    #[serde(default = "default_main_script")]
    pub main_script: String,
    #[serde(default = "default_steps")]
    pub steps: usize,
    #[serde(default = "default_dt")]
    pub dt: f32,
    /// Level-authored sprites present before the script starts.
    #[serde(default)]
    pub sprites: Vec<FixtureSprite>,
    #[serde(default)]
    pub events: Vec<FixtureEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixtureSprite {
    pub uid: u64,
    #[serde(default)]
    pub position: [f64; 2],
    #[serde(default)]
    pub massivity: MassivityType,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub image: Option<String>,
}

/// Fires `event` on the sprite with `uid` after the update of `step`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FixtureEvent {
    pub step: usize,
    pub uid: u64,
    pub event: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HarnessOutput {
    pub steps: usize,
    pub dt: f32,
    pub results: Vec<StepResult>,
    pub final_sprites: Vec<SpriteSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepResult {
    pub step: usize,
    pub logs: Vec<String>,
    pub callbacks_invoked: usize,
    pub callbacks_failed: usize,
    /// Registry notifications raised during the step, by kind.
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpriteSummary {
    pub uid: u64,
    pub position: [f64; 2],
    pub massivity: MassivityType,
    pub visible: bool,
    pub spawned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl From<SpriteSnapshot> for SpriteSummary {
    fn from(snapshot: SpriteSnapshot) -> Self {
        Self {
            uid: snapshot.uid,
            position: snapshot.position.to_array(),
            massivity: snapshot.massivity,
            visible: snapshot.visible,
            spawned: snapshot.spawned,
            image: snapshot.image,
        }
    }
}

fn default_main_script() -> String {
    "scripts/main.rhai".to_string()
}

fn default_steps() -> usize {
    1
}

fn default_dt() -> f32 {
    1.0 / 60.0
}

fn default_visible() -> bool {
    true
}

pub fn run_fixture(fixture: &HarnessFixture, config: &BridgeConfig) -> Result<HarnessOutput> {
    let level = LevelHandle::new(Level::with_asset_root(&config.assets.root));
    populate_level(&level, &fixture.sprites)?;

    let mut host = ScriptHost::with_config(&fixture.main_script, level.clone(), &config.scripting);
    let mut results = Vec::with_capacity(fixture.steps);

    for step in 0..fixture.steps {
        host.update(fixture.dt).with_context(|| format!("running step {step}"))?;
        for fired in fixture.events.iter().filter(|fired| fired.step == step) {
            let event = EventName::new(fired.event.as_str())?;
            level.with(|level| {
                let entity = level
                    .sprites
                    .find_by_uid(fired.uid)
                    .ok_or_else(|| anyhow!("step {step}: no sprite with uid {}", fired.uid))?;
                level.sprites.fire(entity, event).map_err(anyhow::Error::from)
            })?;
        }
        let report = host.dispatch_pending().with_context(|| format!("dispatching step {step}"))?;
        let events = level.with(|level| level.sprites.drain_events());
        for event in &events {
            debug!(step, %event, "sprite event");
        }
        debug!(step, invoked = report.invoked, failed = report.failed, "harness step finished");
        let error = if report.failed > 0 { host.last_error().map(str::to_string) } else { None };
        results.push(StepResult {
            step,
            logs: host.take_logs(),
            callbacks_invoked: report.invoked,
            callbacks_failed: report.failed,
            events: events.iter().map(|event| event.kind().to_string()).collect(),
            error,
        });
    }

    let final_sprites = level.with(|level| {
        level
            .sprites
            .entities()
            .map(|entity| level.sprites.snapshot(entity).map(SpriteSummary::from))
            .collect::<Result<Vec<_>, _>>()
    })?;
    Ok(HarnessOutput { steps: fixture.steps, dt: fixture.dt, results, final_sprites })
}

fn populate_level(level: &LevelHandle, sprites: &[FixtureSprite]) -> Result<()> {
    level.with(|level| {
        for sprite in sprites {
            let mut blueprint = level.sprites.create_entity();
            blueprint.uid = Some(sprite.uid);
            blueprint.position = sprite.position.into();
            blueprint.massivity = sprite.massivity;
            blueprint.visible = sprite.visible;
            if let Some(path) = sprite.image.as_deref() {
                blueprint.image = Some(level.images.load_image(path)?);
            }
            level.sprites.register(blueprint).with_context(|| format!("placing level sprite {}", sprite.uid))?;
        }
        Ok(())
    })
}

pub fn load_fixture<P: AsRef<Path>>(path: P) -> Result<HarnessFixture> {
    let file = File::open(path.as_ref()).with_context(|| format!("opening fixture '{}'", path.as_ref().display()))?;
    serde_json::from_reader(file).with_context(|| "parsing fixture JSON")
}
