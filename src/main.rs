use std::path::Path;

use anyhow::{Context, Result};
use sprite_bridge::cli::CliOverrides;
use sprite_bridge::config::BridgeConfig;
use sprite_bridge::logging;
use sprite_bridge::script_harness::{load_fixture, run_fixture, HarnessFixture};

const DEFAULT_CONFIG: &str = "config/bridge.json";

fn main() {
    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = run(cli) {
        tracing::error!("{err:?}");
        eprintln!("Harness error: {err:?}");
        std::process::exit(1);
    }
}

fn run(cli: CliOverrides) -> Result<()> {
    let config_path = cli.config.clone();
    let fixture_path = cli.fixture.clone();
    let mut config = match &config_path {
        Some(path) => BridgeConfig::load(path)?,
        None => BridgeConfig::load_or_default(DEFAULT_CONFIG),
    };
    let overrides = cli.into_config_overrides();
    config.apply_overrides(&overrides);
    logging::init(&config.logging.filter);
    if !overrides.is_empty() {
        tracing::info!(fields = ?overrides.applied_fields(), "applied command line overrides");
    }

    let fixture = match &fixture_path {
        Some(path) => {
            let mut fixture = load_fixture(path)?;
            if let Some(dir) = path.parent() {
                let script = Path::new(&fixture.main_script);
                if script.is_relative() {
                    fixture.main_script = dir.join(script).to_string_lossy().into_owned();
                }
            }
            fixture
        }
        None => HarnessFixture {
            main_script: config.scripting.main_script.to_string_lossy().into_owned(),
            steps: 1,
            dt: 1.0 / 60.0,
            sprites: Vec::new(),
            events: Vec::new(),
        },
    };
    let output = run_fixture(&fixture, &config)?;
    let json = serde_json::to_string_pretty(&output).context("serializing harness output")?;
    println!("{json}");
    Ok(())
}
