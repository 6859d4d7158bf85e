//! Rhai bindings for levels and sprites.
//!
//! Entry points receive a `Level` value:
//!
//! ```rhai
//! fn init(level) {
//!     let farmer = level.sprites.allocate("farmer.png", 100, 50);
//!     farmer.on_touch(|sprite| sprite.hide());
//!     let door = level.sprites[33];
//!     if type_of(door) == "Sprite" { door.show(); }
//! }
//! ```

use rhai::{Array, Dynamic, Engine, EvalAltResult, FnPtr, FLOAT, INT};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

use crate::error::SpriteError;
use crate::handle::{SpriteClass, SpriteHandle, SpriteSpawn};
use crate::level::LevelHandle;
use crate::subscriptions::{Callback, TOUCH};

type RhaiResultOf<T> = Result<T, Box<EvalAltResult>>;

/// Lines scripts wrote through `level.log`.
#[derive(Clone, Default)]
pub struct ScriptLog(Arc<Mutex<Vec<String>>>);

impl ScriptLog {
    pub fn push(&self, line: impl Into<String>) {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).push(line.into());
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.0.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// The value handed to `init` and `update`.
#[derive(Clone)]
pub struct LevelApi {
    sprites: SpriteClass,
    logs: ScriptLog,
}

impl LevelApi {
    pub fn new(level: LevelHandle, logs: ScriptLog) -> Self {
        Self { sprites: SpriteClass::new(level), logs }
    }

    fn sprites(&mut self) -> SpriteClass {
        self.sprites.clone()
    }

    fn log(&mut self, message: &str) {
        info!(target: "script", "{message}");
        self.logs.push(message);
    }
}

// ---------- Argument conversion ----------
fn optional(value: &Dynamic) -> Option<&Dynamic> {
    if value.is_unit() {
        None
    } else {
        Some(value)
    }
}

fn number(value: &Dynamic, argument: &'static str) -> Result<f64, SpriteError> {
    let number = if let Ok(int) = value.as_int() {
        int as f64
    } else if let Ok(float) = value.as_float() {
        float
    } else {
        return Err(SpriteError::argument(argument, "a number", value.type_name()));
    };
    if !number.is_finite() {
        return Err(SpriteError::argument(argument, "a finite number", number.to_string()));
    }
    Ok(number)
}

fn uid(value: &Dynamic) -> Result<u64, SpriteError> {
    let int = value.as_int().map_err(|found| SpriteError::argument("uid", "a non-negative integer", found))?;
    u64::try_from(int).map_err(|_| SpriteError::argument("uid", "a non-negative integer", int.to_string()))
}

fn string(value: &Dynamic, argument: &'static str) -> Result<String, SpriteError> {
    value
        .clone()
        .into_immutable_string()
        .map(|s| s.to_string())
        .map_err(|found| SpriteError::argument(argument, "a string", found))
}

/// Registration caps UIDs at `registry::MAX_UID`.
fn script_uid(uid: u64) -> Result<INT, SpriteError> {
    INT::try_from(uid).map_err(|_| SpriteError::argument("uid", "an integer no larger than i64::MAX", uid.to_string()))
}

// ---------- Sprite namespace ----------
fn allocate(class: &SpriteClass, args: &[Dynamic]) -> RhaiResultOf<SpriteHandle> {
    let arg = |index: usize| args.get(index).and_then(optional);
    let spawn = SpriteSpawn {
        image_path: arg(0).map(|value| string(value, "image_path")).transpose()?,
        x: arg(1).map(|value| number(value, "x")).transpose()?,
        y: arg(2).map(|value| number(value, "y")).transpose()?,
        uid: arg(3).map(uid).transpose()?,
    };
    Ok(class.allocate(spawn)?)
}

/// Lookup never fails on a miss; scripts get `()` back.
fn lookup(class: &SpriteClass, key: INT) -> Dynamic {
    u64::try_from(key)
        .ok()
        .and_then(|uid| class.find_by_uid(uid))
        .map_or(Dynamic::UNIT, Dynamic::from)
}

fn find_by_uid(class: &mut SpriteClass, key: Dynamic) -> RhaiResultOf<Dynamic> {
    let key = key.as_int().map_err(|found| SpriteError::argument("uid", "an integer", found))?;
    Ok(lookup(class, key))
}

// ---------- Event registration ----------
fn register_callback(receiver: Dynamic, event: Dynamic, callback: Dynamic) -> RhaiResultOf<()> {
    let found = receiver.type_name();
    let sprite = receiver
        .try_cast::<SpriteHandle>()
        .ok_or_else(|| SpriteError::InvalidReceiver { found: found.to_string() })?;
    let event = string(&event, "event")?;
    let found = callback.type_name();
    let callback = callback
        .try_cast::<FnPtr>()
        .ok_or_else(|| SpriteError::InvalidCallback { found: found.to_string() })?;
    Ok(sprite.register(&event, Callback::new(callback))?)
}

fn on_touch(receiver: Dynamic, callback: Dynamic) -> RhaiResultOf<()> {
    register_callback(receiver, TOUCH.into(), callback)
}

pub fn register_api(engine: &mut Engine) {
    engine.register_type_with_name::<LevelApi>("Level");
    engine.register_get("sprites", LevelApi::sprites);
    engine.register_fn("log", LevelApi::log);

    engine.register_type_with_name::<SpriteClass>("SpriteClass");
    engine.register_fn("allocate", |class: &mut SpriteClass| allocate(class, &[]));
    engine.register_fn("allocate", |class: &mut SpriteClass, image: Dynamic| allocate(class, &[image]));
    engine.register_fn("allocate", |class: &mut SpriteClass, image: Dynamic, x: Dynamic| allocate(class, &[image, x]));
    engine.register_fn("allocate", |class: &mut SpriteClass, image: Dynamic, x: Dynamic, y: Dynamic| {
        allocate(class, &[image, x, y])
    });
    engine.register_fn(
        "allocate",
        |class: &mut SpriteClass, image: Dynamic, x: Dynamic, y: Dynamic, uid: Dynamic| {
            allocate(class, &[image, x, y, uid])
        },
    );
    engine.register_indexer_get(|class: &mut SpriteClass, key: INT| lookup(class, key));
    engine.register_fn("find_by_uid", find_by_uid);

    engine.register_type_with_name::<SpriteHandle>("Sprite");
    engine.register_fn("get_uid", |sprite: &mut SpriteHandle| -> RhaiResultOf<INT> {
        Ok(script_uid(sprite.get_uid()?)?)
    });
    engine.register_fn("get_x", |sprite: &mut SpriteHandle| -> RhaiResultOf<FLOAT> { Ok(sprite.get_x()?) });
    engine.register_fn("get_y", |sprite: &mut SpriteHandle| -> RhaiResultOf<FLOAT> { Ok(sprite.get_y()?) });
    engine.register_fn("set_x", |sprite: &mut SpriteHandle, x: Dynamic| -> RhaiResultOf<()> {
        Ok(sprite.set_x(number(&x, "x")?)?)
    });
    engine.register_fn("set_y", |sprite: &mut SpriteHandle, y: Dynamic| -> RhaiResultOf<()> {
        Ok(sprite.set_y(number(&y, "y")?)?)
    });
    engine.register_fn("pos", |sprite: &mut SpriteHandle| -> RhaiResultOf<Array> {
        let pos = sprite.pos()?;
        Ok(vec![Dynamic::from_float(pos.x), Dynamic::from_float(pos.y)])
    });
    engine.register_fn("warp", |sprite: &mut SpriteHandle, x: Dynamic, y: Dynamic| -> RhaiResultOf<()> {
        Ok(sprite.warp(number(&x, "x")?, number(&y, "y")?)?)
    });
    engine.register_fn("show", |sprite: &mut SpriteHandle| -> RhaiResultOf<()> { Ok(sprite.show()?) });
    engine.register_fn("hide", |sprite: &mut SpriteHandle| -> RhaiResultOf<()> { Ok(sprite.hide()?) });
    engine.register_fn("is_visible", |sprite: &mut SpriteHandle| -> RhaiResultOf<bool> { Ok(sprite.is_visible()?) });
    engine.register_fn("is_spawned", |sprite: &mut SpriteHandle| -> RhaiResultOf<bool> { Ok(sprite.is_spawned()?) });
    engine.register_fn("set_massive_type", |sprite: &mut SpriteHandle, name: Dynamic| -> RhaiResultOf<()> {
        Ok(sprite.set_massive_type(&string(&name, "type")?)?)
    });
    engine.register_fn("massive_type", |sprite: &mut SpriteHandle| -> RhaiResultOf<String> {
        Ok(sprite.massive_type()?.name().to_string())
    });
    engine.register_fn("image", |sprite: &mut SpriteHandle| -> RhaiResultOf<Dynamic> {
        Ok(sprite.image_path()?.map_or(Dynamic::UNIT, Dynamic::from))
    });
    engine.register_fn("==", |a: &mut SpriteHandle, b: SpriteHandle| a.same_sprite(&b));
    engine.register_fn("!=", |a: &mut SpriteHandle, b: SpriteHandle| !a.same_sprite(&b));
    engine.register_fn("to_string", |sprite: &mut SpriteHandle| sprite.to_string());
    engine.register_fn("to_debug", |sprite: &mut SpriteHandle| sprite.to_string());

    engine.register_fn("register", |sprite: &mut SpriteHandle, event: Dynamic, callback: Dynamic| {
        register_callback(Dynamic::from(sprite.clone()), event, callback)
    });
    engine.register_fn("register", register_callback);
    engine.register_fn("on_touch", |sprite: &mut SpriteHandle, callback: Dynamic| {
        on_touch(Dynamic::from(sprite.clone()), callback)
    });
    engine.register_fn("on_touch", on_touch);
}
