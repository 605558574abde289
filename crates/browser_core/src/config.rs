//! Environment-driven engine configuration, generalized from
//! `page_handler::utilities::config::ValorConfig::from_env`.

use std::env;

const DEFAULT_FRAME_BUDGET_MS: u64 = 33;
const DEFAULT_VIEWPORT_WIDTH: f32 = 800.0;
const DEFAULT_VIEWPORT_HEIGHT: f32 = 600.0;

#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Animation-frame cadence (spec.md §4.9 `REFRESH_RATE_SEC`,
    /// expressed in milliseconds here for `Duration` construction).
    pub frame_budget_ms: u64,
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub telemetry_enabled: bool,
    pub hud_enabled: bool,
}

impl EngineConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let frame_budget_ms = env::var("CINDER_FRAME_BUDGET_MS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(DEFAULT_FRAME_BUDGET_MS)
            .max(1);
        let viewport_width = env::var("CINDER_VIEWPORT_WIDTH")
            .ok()
            .and_then(|val| val.parse::<f32>().ok())
            .unwrap_or(DEFAULT_VIEWPORT_WIDTH);
        let viewport_height = env::var("CINDER_VIEWPORT_HEIGHT")
            .ok()
            .and_then(|val| val.parse::<f32>().ok())
            .unwrap_or(DEFAULT_VIEWPORT_HEIGHT);
        let telemetry_enabled = env::var("CINDER_TELEMETRY").ok().as_deref() == Some("1");
        let hud_enabled = env::var("CINDER_HUD").ok().as_deref() == Some("1");
        Self { frame_budget_ms, viewport_width, viewport_height, telemetry_enabled, hud_enabled }
    }

    #[must_use]
    pub const fn frame_budget(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.frame_budget_ms)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame_budget_ms: DEFAULT_FRAME_BUDGET_MS,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            telemetry_enabled: false,
            hud_enabled: false,
        }
    }
}
