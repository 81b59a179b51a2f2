use cadence_core::calendar::WorkingDays;
use cadence_core::config::EngineConfig;
use chrono::{FixedOffset, Offset, Utc};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
pub struct Config {
    /// Limits and conflict rules handed to the engine
    pub engine: EngineConfig,
    /// Weekend/holiday skipping applied while expanding
    pub working_days: WorkingDays,
    /// Offset from UTC used when printing times
    pub display_offset_minutes: i32,
}

impl Config {
    pub fn new() -> Result<Self, figment::Error> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file("cadence.toml"))
                .merge(Env::prefixed("CADENCE_").split("__")),
        )
    }

    pub fn from_figment(figment: Figment) -> Result<Self, figment::Error> {
        figment.extract()
    }

    /// Falls back to UTC when the configured offset is out of range.
    pub fn display_offset(&self) -> FixedOffset {
        self.display_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or(Utc.fix())
    }
}
