use sprite_bridge::config::BridgeConfig;
use sprite_bridge::scripts::ScriptHost;
use sprite_bridge::{Level, LevelHandle};

#[test]
fn main_script_compiles() {
    let config = BridgeConfig::load("config/bridge.json").expect("bridge.json should parse");
    let level = LevelHandle::new(Level::with_asset_root(&config.assets.root));
    let mut host = ScriptHost::with_config(&config.scripting.main_script, level, &config.scripting);
    host.force_reload().expect("main.rhai should compile");
}
