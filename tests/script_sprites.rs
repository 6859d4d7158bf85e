use anyhow::Result;
use rhai::{Array, Engine, Scope};
use sprite_bridge::images::{ImageRef, ImageSource};
use sprite_bridge::script_api::register_api;
use sprite_bridge::{Level, LevelHandle, MassivityType, ScriptHost, SpriteClass, SpriteSpawn};
use std::io::Write;
use tempfile::NamedTempFile;

struct StubImages;

impl ImageSource for StubImages {
    fn load_image(&mut self, path: &str) -> Result<ImageRef> {
        Ok(ImageRef::new(path, 16, 16))
    }
}

fn write_script(contents: &str) -> NamedTempFile {
    let mut temp = NamedTempFile::new().expect("temp script");
    write!(temp, "{contents}").expect("write script");
    temp
}

fn run_init(contents: &str) -> (ScriptHost, LevelHandle, Vec<String>) {
    let script = write_script(contents);
    let level = LevelHandle::new(Level::new(StubImages));
    let mut host = ScriptHost::new(script.path(), level.clone());
    host.update(0.016).expect("script should run");
    let logs = host.take_logs();
    (host, level, logs)
}

#[test]
fn scripts_allocate_sprites_with_optional_arguments() {
    let (_host, level, logs) = run_init(
        r#"
            fn init(level) {
                let farmer = level.sprites.allocate("farmer.png", 100, 50);
                level.log(farmer.get_x().to_string());
                level.log(farmer.get_y().to_string());
                level.log(farmer.is_visible().to_string());
                level.log(farmer.massive_type());
                level.log(farmer.is_spawned().to_string());
                level.log(farmer.image());
                level.sprites.allocate();
                level.sprites.allocate("door.png");
                level.sprites.allocate((), 1.5, -2.25, 90);
            }
        "#,
    );

    assert_eq!(logs, vec!["100.0", "50.0", "false", "front_passive", "true", "farmer.png"]);
    let level = level.lock();
    assert_eq!(level.sprites.len(), 4);
    let forced = level.sprites.find_by_uid(90).expect("uid 90");
    assert_eq!(level.sprites.position(forced).map(|p| p.to_array()), Ok([1.5, -2.25]));
}

#[test]
fn index_lookup_returns_unit_for_missing_sprites() {
    let (_host, _level, logs) = run_init(
        r#"
            fn init(level) {
                level.log("missing " + type_of(level.sprites[999]));
                level.log("negative " + type_of(level.sprites.find_by_uid(-1)));
                let sprite = level.sprites.allocate("farmer.png", 0, 0, 33);
                let again = level.sprites[33];
                again.set_x(5);
                level.log("same " + (sprite == again));
                level.log("x " + sprite.get_x());
                level.log("found " + type_of(level.sprites.find_by_uid(33)));
            }
        "#,
    );

    assert_eq!(logs, vec!["missing ()", "negative ()", "same true", "x 5.0", "found Sprite"]);
}

#[test]
fn pos_and_warp_round_trip_through_the_script() {
    let (_host, _level, logs) = run_init(
        r#"
            fn init(level) {
                let sprite = level.sprites.allocate();
                sprite.warp(12.5, -3);
                let pos = sprite.pos();
                level.log(pos[0].to_string() + "," + pos[1].to_string());
                sprite.set_y(7);
                level.log(sprite.get_y().to_string());
            }
        "#,
    );

    assert_eq!(logs, vec!["12.5,-3.0", "7.0"]);
}

#[test]
fn invalid_arguments_raise_script_errors() {
    let (_host, level, logs) = run_init(
        r#"
            fn init(level) {
                let sprite = level.sprites.allocate((), 0, 0, 1);
                try { sprite.set_massive_type("enemy"); } catch (err) { level.log(err); }
                try { sprite.set_massive_type(3); } catch (err) { level.log(err); }
                try { sprite.set_x("left"); } catch (err) { level.log(err); }
                try { sprite.warp(1, true); } catch (err) { level.log(err); }
                try { level.sprites.allocate((), 0, 0, 1); } catch (err) { level.log(err); }
                try { level.sprites.allocate((), 0, 0, -5); } catch (err) { level.log(err); }
                try { level.sprites.allocate(12); } catch (err) { level.log(err); }
                sprite.set_massive_type("halfmassive");
            }
        "#,
    );

    assert_eq!(
        logs,
        vec![
            "Invalid type 'enemy'.",
            "Invalid argument 'type': expected a string, got i64.",
            "Invalid argument 'x': expected a number, got string.",
            "Invalid argument 'y': expected a number, got bool.",
            "UID 1 is already used.",
            "Invalid argument 'uid': expected a non-negative integer, got -5.",
            "Invalid argument 'image_path': expected a string, got i64.",
        ]
    );
    let level = level.lock();
    assert_eq!(level.sprites.len(), 1);
    let sprite = level.sprites.find_by_uid(1).expect("sprite");
    assert_eq!(level.sprites.massivity(sprite), Ok(MassivityType::HalfMassive));
}

#[test]
fn handles_survive_a_script_reload() {
    let script = write_script(
        r#"
            fn init(level) { level.sprites.allocate((), 0, 0, 8).on_touch(Fn("hit")); }
            fn hit(sprite) { sprite.show(); }
        "#,
    );
    let level = LevelHandle::new(Level::new(StubImages));
    let mut host = ScriptHost::new(script.path(), level.clone());
    host.update(0.016).expect("first run");

    host.force_reload().expect("reload");
    let entity = level.lock().sprites.find_by_uid(8).expect("sprite survives reload");
    let touch = sprite_bridge::subscriptions::EventName::new("touch").unwrap();
    host.dispatch(entity, &touch).expect("dispatch");

    assert_eq!(level.lock().sprites.is_visible(entity), Ok(true));
}

#[test]
fn missing_entry_points_are_not_errors() {
    let script = write_script("fn helper() { 1 }");
    let level = LevelHandle::new(Level::new(StubImages));
    let mut host = ScriptHost::new(script.path(), level);

    host.update(0.016).expect("no init/update is fine");
    assert!(host.last_error().is_none());
}

#[test]
fn script_errors_are_reported() {
    let script = write_script("fn init(level) { level.sprites.allocate().set_massive_type(\"lava\"); }");
    let level = LevelHandle::new(Level::new(StubImages));
    let mut host = ScriptHost::new(script.path(), level);

    let err = host.update(0.016).expect_err("init should fail");
    assert!(err.to_string().contains("Invalid type 'lava'."), "{err}");
    assert!(host.last_error().is_some());
}

#[test]
fn lookup_keys_must_be_integers() {
    let (_host, _level, logs) = run_init(
        r#"
            fn init(level) {
                try { level.sprites.find_by_uid("x"); } catch (err) { level.log(err); }
                try { level.sprites.find_by_uid(1.5); } catch (err) { level.log(err); }
            }
        "#,
    );

    assert_eq!(
        logs,
        vec![
            "Invalid argument 'uid': expected an integer, got string.",
            "Invalid argument 'uid': expected an integer, got f64.",
        ]
    );
}

#[test]
fn stale_handles_raise_script_errors() {
    let level = LevelHandle::new(Level::new(StubImages));
    let sprite = SpriteClass::new(level.clone()).allocate(SpriteSpawn::default()).expect("allocation");
    level.lock().sprites.destroy_all();

    let mut engine = Engine::new();
    register_api(&mut engine);
    let ast = engine
        .compile(
            r#"
                fn poke(sprite) {
                    let errors = [];
                    try { sprite.get_x(); } catch (err) { errors.push(err); }
                    try { sprite.show(); } catch (err) { errors.push(err); }
                    try { sprite.set_massive_type("massive"); } catch (err) { errors.push(err); }
                    try { sprite.on_touch(|s| s.hide()); } catch (err) { errors.push(err); }
                    errors
                }
            "#,
        )
        .expect("compile");
    let errors: Array = engine.call_fn(&mut Scope::new(), &ast, "poke", (sprite,)).expect("call");

    assert_eq!(errors.len(), 4);
    for err in errors {
        let message = err.into_string().expect("error message");
        assert!(message.contains("no longer refers to a live sprite"), "{message}");
    }
}
