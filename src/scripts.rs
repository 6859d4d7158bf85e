use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{anyhow, Context, Result};
use bevy_ecs::prelude::Entity;
use rhai::{Dynamic, Engine, EvalAltResult, Scope, AST};
use tracing::{debug, info, warn};

use crate::config::ScriptConfig;
use crate::handle::SpriteHandle;
use crate::level::LevelHandle;
use crate::script_api::{register_api, LevelApi, ScriptLog};
use crate::subscriptions::{Callback, DeliveryPolicy, ErrorPolicy, EventName};

/// Rhai's name prefix for functions compiled from closures.
const ANONYMOUS_FN_PREFIX: &str = "anon$";

/// Outcome of delivering one fired event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub invoked: usize,
    pub failed: usize,
    /// Callbacks not invoked: no script was loaded, or an earlier one failed
    /// under `ErrorPolicy::Abort`.
    pub skipped: usize,
}

impl DispatchReport {
    fn absorb(&mut self, other: DispatchReport) {
        self.invoked += other.invoked;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

pub struct ScriptHost {
    engine: Engine,
    ast: Option<AST>,
    scope: Scope<'static>,
    script_path: PathBuf,
    last_modified: Option<SystemTime>,
    error: Option<String>,
    enabled: bool,
    initialized: bool,
    level: LevelHandle,
    logs: ScriptLog,
    delivery: DeliveryPolicy,
    on_error: ErrorPolicy,
}

impl ScriptHost {
    pub fn new(path: impl AsRef<Path>, level: LevelHandle) -> Self {
        Self::with_config(path, level, &ScriptConfig::default())
    }

    pub fn with_config(path: impl AsRef<Path>, level: LevelHandle, config: &ScriptConfig) -> Self {
        let mut engine = Engine::new();
        engine.set_fast_operators(true);
        if config.max_operations > 0 {
            engine.set_max_operations(config.max_operations);
        }
        register_api(&mut engine);
        Self {
            engine,
            ast: None,
            scope: Scope::new(),
            script_path: path.as_ref().to_path_buf(),
            last_modified: None,
            error: None,
            enabled: true,
            initialized: false,
            level,
            logs: ScriptLog::default(),
            delivery: config.delivery,
            on_error: config.on_error,
        }
    }

    /// A disabled host still reloads its script but runs no entry points.
    pub fn set_enabled(&mut self, enable: bool) {
        self.enabled = enable;
    }

    pub fn last_error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn take_logs(&mut self) -> Vec<String> {
        self.logs.take()
    }

    /// Recompiles the script. The level keeps its sprites and callbacks, so
    /// `init` does not run again.
    pub fn force_reload(&mut self) -> Result<()> {
        self.load_script().map(|_| ())
    }

    /// Unloads every sprite of the level, recompiles the script and runs
    /// `init` again on the next update.
    pub fn restart(&mut self) -> Result<()> {
        self.level.lock().sprites.destroy_all();
        self.ast = None;
        self.initialized = false;
        self.load_script().map(|_| ())
    }

    /// Runs `init` once per level, then `update`. A failing `init` is
    /// reported once and not retried until `restart`. Missing entry points
    /// are fine; script errors are returned and kept as `last_error`.
    pub fn update(&mut self, dt: f32) -> Result<()> {
        if let Err(err) = self.reload_if_needed() {
            self.error = Some(err.to_string());
            return Err(err);
        }
        if !self.enabled {
            return Ok(());
        }
        if !self.initialized {
            self.initialized = true;
            self.call_entry("init", (self.api(),))?;
        }
        self.call_entry("update", (self.api(), dt as rhai::FLOAT))
    }

    fn api(&self) -> LevelApi {
        LevelApi::new(self.level.clone(), self.logs.clone())
    }

    fn call_entry(&mut self, name: &str, args: impl rhai::FuncArgs) -> Result<()> {
        let Some(ast) = &self.ast else {
            return Ok(());
        };
        match self.engine.call_fn::<Dynamic>(&mut self.scope, ast, name, args) {
            Ok(_) => {
                self.error = None;
                Ok(())
            }
            Err(err) if is_missing_entry(&err, name) => {
                self.error = None;
                Ok(())
            }
            Err(err) => {
                let message = err.to_string();
                self.error = Some(message.clone());
                Err(anyhow!("Script '{name}' failed: {message}"))
            }
        }
    }

    /// Delivers `event` to every callback the sprite registered for it, in
    /// registration order, each receiving the sprite as its first argument.
    /// Under `DeliveryPolicy::Once` callbacks that were not invoked stay
    /// subscribed.
    pub fn dispatch(&mut self, entity: Entity, event: &EventName) -> Result<DispatchReport> {
        let listeners = {
            let mut level = self.level.lock();
            match self.delivery {
                DeliveryPolicy::Persistent => level.sprites.listeners(entity, event)?,
                DeliveryPolicy::Once => level.sprites.take_listeners(entity, event)?,
            }
        };
        let report = self.invoke(entity, event, &listeners);
        if self.delivery == DeliveryPolicy::Once && report.skipped > 0 {
            let undelivered = listeners[listeners.len() - report.skipped..].to_vec();
            if let Err(err) = self.level.lock().sprites.restore_listeners(entity, event.clone(), undelivered) {
                debug!(entity = entity.index(), %event, "dropping undelivered callbacks: {err}");
            }
        }
        Ok(report)
    }

    fn invoke(&mut self, entity: Entity, event: &EventName, listeners: &[Callback]) -> DispatchReport {
        let mut report = DispatchReport::default();
        let Some(ast) = &self.ast else {
            report.skipped = listeners.len();
            return report;
        };
        let sprite = SpriteHandle::new(entity, self.level.clone());
        for (index, callback) in listeners.iter().enumerate() {
            report.invoked += 1;
            if let Err(err) = callback.fn_ptr().call::<Dynamic>(&self.engine, ast, (sprite.clone(),)) {
                report.failed += 1;
                warn!(
                    entity = entity.index(),
                    %event,
                    callback = callback.name(),
                    "sprite callback failed: {err}"
                );
                self.error = Some(err.to_string());
                if self.on_error == ErrorPolicy::Abort {
                    report.skipped = listeners.len() - index - 1;
                    break;
                }
            }
        }
        report
    }

    /// Delivers every event fired since the last call, oldest first. Events
    /// fired by callbacks during this pass wait for the next one.
    pub fn dispatch_pending(&mut self) -> Result<DispatchReport> {
        let fired = self.level.lock().sprites.take_fired();
        let mut total = DispatchReport::default();
        for fired in fired {
            total.absorb(self.dispatch(fired.entity, &fired.event)?);
        }
        Ok(total)
    }

    fn reload_if_needed(&mut self) -> Result<()> {
        let metadata = match fs::metadata(&self.script_path) {
            Ok(meta) => meta,
            Err(err) => {
                return Err(anyhow!("Script file not accessible: {err}"));
            }
        };
        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        if self.ast.is_none() || self.last_modified.map_or(true, |prev| modified > prev) {
            self.load_script()?;
        }
        Ok(())
    }

    fn load_script(&mut self) -> Result<&AST> {
        let source = fs::read_to_string(&self.script_path)
            .with_context(|| format!("Reading {}", self.script_path.display()))?;
        let mut ast = self.engine.compile(source).with_context(|| "Compiling Rhai script")?;
        // Closures stored on sprites name functions of the script that
        // created them.
        if let Some(previous) = self.ast.take() {
            ast = previous
                .clone_functions_only_filtered(|_, _, _, name, _| name.starts_with(ANONYMOUS_FN_PREFIX))
                .merge(&ast);
        }
        self.scope = Scope::new();
        self.last_modified = fs::metadata(&self.script_path).ok().and_then(|meta| meta.modified().ok());
        self.error = None;
        info!(path = %self.script_path.display(), "loaded script");
        Ok(&*self.ast.insert(ast))
    }
}

/// The entry point itself is undefined, as opposed to a call inside it failing.
fn is_missing_entry(err: &EvalAltResult, name: &str) -> bool {
    match err {
        EvalAltResult::ErrorFunctionNotFound(signature, _) => {
            signature == name || signature.strip_prefix(name).is_some_and(|rest| rest.starts_with(" ("))
        }
        _ => false,
    }
}
