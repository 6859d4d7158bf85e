use crate::config::BridgeConfigOverrides;
use anyhow::{anyhow, bail, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub fixture: Option<PathBuf>,
    script: Option<PathBuf>,
    assets: Option<PathBuf>,
    log: Option<String>,
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            let Some(key) = flag.strip_prefix("--") else {
                bail!("Unexpected argument '{flag}'. Flags take the form --name value.");
            };
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            if value.is_empty() {
                bail!("Empty value for '{flag}'");
            }
            match key {
                "config" => overrides.config = Some(PathBuf::from(value)),
                "fixture" => overrides.fixture = Some(PathBuf::from(value)),
                "script" => overrides.script = Some(PathBuf::from(value)),
                "assets" => overrides.assets = Some(PathBuf::from(value)),
                "log" => overrides.log = Some(value),
                _ => bail!(
                    "Unknown flag '{flag}'. Supported flags: --config, --fixture, --script, --assets, --log."
                ),
            }
        }
        Ok(overrides)
    }

    pub fn into_config_overrides(self) -> BridgeConfigOverrides {
        BridgeConfigOverrides { asset_root: self.assets, main_script: self.script, log_filter: self.log }
    }
}
