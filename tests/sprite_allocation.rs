use anyhow::Result;
use sprite_bridge::events::SpriteEvent;
use sprite_bridge::images::{ImageRef, ImageSource};
use sprite_bridge::{Level, LevelHandle, MassivityType, SpriteClass, SpriteError, SpriteSpawn};

struct StubImages;

impl ImageSource for StubImages {
    fn load_image(&mut self, path: &str) -> Result<ImageRef> {
        Ok(ImageRef::new(path, 32, 32))
    }
}

fn sprites() -> SpriteClass {
    SpriteClass::new(LevelHandle::new(Level::new(StubImages)))
}

#[test]
fn farmer_allocation_uses_script_defaults() {
    let class = sprites();
    let farmer = class
        .allocate(SpriteSpawn {
            image_path: Some("farmer.png".to_string()),
            x: Some(100.0),
            y: Some(50.0),
            uid: None,
        })
        .expect("allocation should succeed");

    assert_eq!(farmer.get_x(), Ok(100.0));
    assert_eq!(farmer.get_y(), Ok(50.0));
    assert_eq!(farmer.is_visible(), Ok(false), "script sprites start hidden");
    assert_eq!(farmer.massive_type(), Ok(MassivityType::FrontPassive));
    assert_eq!(farmer.is_spawned(), Ok(true));
    assert_eq!(farmer.image_path(), Ok(Some("farmer.png".to_string())));
}

#[test]
fn allocation_without_arguments_has_no_image() {
    let class = sprites();
    let sprite = class.allocate(SpriteSpawn::default()).expect("allocation");

    assert_eq!(sprite.pos().map(|p| p.to_array()), Ok([0.0, 0.0]));
    assert_eq!(sprite.image_path(), Ok(None));
}

#[test]
fn auto_assigned_uids_were_free_before_allocation() {
    let class = sprites();
    class.allocate(SpriteSpawn { uid: Some(1), ..SpriteSpawn::default() }).expect("forced uid");
    class.allocate(SpriteSpawn { uid: Some(3), ..SpriteSpawn::default() }).expect("forced uid");

    for _ in 0..4 {
        let in_use_before: Vec<u64> = {
            let level = class.level().lock();
            level.sprites.entities().map(|e| level.sprites.uid(e).expect("live")).collect()
        };
        let sprite = class.allocate(SpriteSpawn::default()).expect("allocation");
        let uid = sprite.get_uid().expect("uid");
        assert!(!in_use_before.contains(&uid), "uid {uid} was already taken");
    }
}

#[test]
fn duplicate_uid_fails_without_touching_the_registry() {
    let class = sprites();
    let first = class.allocate(SpriteSpawn { uid: Some(33), ..SpriteSpawn::default() }).expect("first");
    let events_before = class.level().lock().sprites.drain_events().len();
    assert_eq!(events_before, 1);

    let err = class
        .allocate(SpriteSpawn {
            image_path: Some("farmer.png".to_string()),
            x: Some(1.0),
            y: Some(2.0),
            uid: Some(33),
        })
        .expect_err("uid 33 is taken");

    assert_eq!(err, SpriteError::DuplicateIdentifier { uid: 33 });
    let mut level = class.level().lock();
    assert_eq!(level.sprites.len(), 1);
    assert!(level.sprites.drain_events().is_empty());
    assert_eq!(level.sprites.find_by_uid(33), Some(first.entity()));
}

#[test]
fn forced_uid_replaces_the_automatic_one() {
    let class = sprites();
    let sprite = class.allocate(SpriteSpawn { uid: Some(500), ..SpriteSpawn::default() }).expect("allocation");

    assert_eq!(sprite.get_uid(), Ok(500));
    let events = class.level().lock().sprites.drain_events();
    assert_eq!(events, vec![SpriteEvent::Allocated { entity: sprite.entity(), uid: 500 }]);
}

#[test]
fn missing_image_allocates_without_a_visual() {
    let dir = tempfile::tempdir().expect("temp dir");
    let class = SpriteClass::new(LevelHandle::new(Level::with_asset_root(dir.path())));

    let sprite = class
        .allocate(SpriteSpawn { image_path: Some("nowhere.png".to_string()), ..SpriteSpawn::default() })
        .expect("allocation still succeeds");

    assert_eq!(sprite.image_path(), Ok(None));
}

#[test]
fn images_resolve_below_the_asset_root() {
    let dir = tempfile::tempdir().expect("temp dir");
    std::fs::create_dir_all(dir.path().join("enemies")).expect("mkdir");
    image::RgbaImage::new(8, 4).save(dir.path().join("enemies/eato.png")).expect("write png");
    let class = SpriteClass::new(LevelHandle::new(Level::with_asset_root(dir.path())));

    let sprite = class
        .allocate(SpriteSpawn { image_path: Some("enemies/eato.png".to_string()), ..SpriteSpawn::default() })
        .expect("allocation");

    assert_eq!(sprite.image_path(), Ok(Some("enemies/eato.png".to_string())));
}

#[test]
fn level_sprites_skip_spawned_ones() {
    let class = sprites();
    let level_sprite = class.level().with(|level| {
        let mut blueprint = level.sprites.create_entity();
        blueprint.uid = Some(10);
        level.sprites.register(blueprint).expect("level sprite")
    });
    class.allocate(SpriteSpawn::default()).expect("script sprite");

    let level = class.level().lock();
    assert_eq!(level.sprites.len(), 2);
    assert_eq!(level.sprites.level_sprites(), vec![level_sprite]);
}
