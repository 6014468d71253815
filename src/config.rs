//! Engine geometry and timing, plus the viewer's persisted settings.
//!
//! Viewer settings are stored as a simple key-value text file at
//! `$XDG_CONFIG_HOME/page-window/config.toml` (default
//! `~/.config/page-window/config.toml`).

use std::path::PathBuf;
use std::time::Duration;

use crate::core::error::EngineError;
use crate::core::position::PositionMapper;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const DEFAULT_SLOT_COUNT: usize = 3;
pub const DEFAULT_SCROLL_THROTTLE: Duration = Duration::from_millis(75);
pub const DEFAULT_SCROLL_HOLD: Duration = Duration::from_millis(50);
pub const DEFAULT_WATCHDOG_INTERVAL: Duration = Duration::from_millis(500);

// ───────────────────────────────────────── engine ────────────

/// Everything one [`VirtualList`](crate::app::engine::VirtualList) needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ListConfig {
    pub total_items: usize,
    pub item_height: f64,
    /// Rows per page.  Fixed for a dataset session.
    pub page_size: usize,
    /// Space above the first row (sticky header, padding).
    pub header_offset: f64,
    /// Number of render slots (and loading indicators).
    pub slot_count: usize,
    /// Minimum spacing between handled scroll events.
    pub scroll_throttle: Duration,
    /// After a handled or programmatic scroll, further scroll events are
    /// ignored for this long.  The watchdog is never held.
    pub scroll_hold: Duration,
    pub watchdog_interval: Duration,
    /// Treat Failed pages as re-requestable instead of final.
    pub retry_failed: bool,
}

impl ListConfig {
    pub fn new(total_items: usize, item_height: f64) -> Self {
        Self {
            total_items,
            item_height,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.page_size == 0 {
            return Err(EngineError::ZeroPageSize);
        }
        if self.slot_count == 0 {
            return Err(EngineError::ZeroSlots);
        }
        if !self.item_height.is_finite() || self.item_height <= 0.0 {
            return Err(EngineError::InvalidItemHeight(self.item_height));
        }
        if !self.header_offset.is_finite() {
            return Err(EngineError::InvalidHeaderOffset(self.header_offset));
        }
        Ok(())
    }

    pub fn mapper(&self) -> PositionMapper {
        PositionMapper::new(
            self.total_items,
            self.page_size,
            self.item_height,
            self.header_offset,
        )
    }
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            total_items: 0,
            item_height: 46.0,
            page_size: DEFAULT_PAGE_SIZE,
            header_offset: 0.0,
            slot_count: DEFAULT_SLOT_COUNT,
            scroll_throttle: DEFAULT_SCROLL_THROTTLE,
            scroll_hold: DEFAULT_SCROLL_HOLD,
            watchdog_interval: DEFAULT_WATCHDOG_INTERVAL,
            retry_failed: false,
        }
    }
}

// ───────────────────────────────────────── viewer ────────────

/// Persisted settings for the bundled terminal viewer.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub page_size: usize,
    pub scroll_throttle_ms: u64,
    pub scroll_hold_ms: u64,
    pub watchdog_ms: u64,
    pub retry_failed: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            scroll_throttle_ms: DEFAULT_SCROLL_THROTTLE.as_millis() as u64,
            scroll_hold_ms: DEFAULT_SCROLL_HOLD.as_millis() as u64,
            watchdog_ms: DEFAULT_WATCHDOG_INTERVAL.as_millis() as u64,
            retry_failed: false,
        }
    }
}

impl ViewerConfig {
    /// Load config from disk, falling back to defaults.
    pub fn load() -> Self {
        let path = config_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => Self::parse(&contents),
            Err(_) => Self::default(),
        }
    }

    /// Persist current config to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = config_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, self.serialise())?;
        tracing::debug!(path = %path.display(), "saved viewer config");
        Ok(())
    }

    /// Apply these settings on top of an engine config.
    pub fn apply(&self, list: &mut ListConfig) {
        list.page_size = self.page_size;
        list.scroll_throttle = Duration::from_millis(self.scroll_throttle_ms);
        list.scroll_hold = Duration::from_millis(self.scroll_hold_ms);
        list.watchdog_interval = Duration::from_millis(self.watchdog_ms);
        list.retry_failed = self.retry_failed;
    }

    fn parse(s: &str) -> Self {
        let mut config = Self::default();

        for line in s.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('[') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            // Unknown keys and unparsable values keep their defaults.
            match key {
                "page_size" => {
                    if let Ok(v) = value.parse::<usize>() {
                        config.page_size = v.clamp(1, 1000);
                    }
                }
                "scroll_throttle_ms" => {
                    if let Ok(v) = value.parse::<u64>() {
                        config.scroll_throttle_ms = v.clamp(10, 1000);
                    }
                }
                "scroll_hold_ms" => {
                    if let Ok(v) = value.parse::<u64>() {
                        config.scroll_hold_ms = v.min(1000);
                    }
                }
                "watchdog_ms" => {
                    if let Ok(v) = value.parse::<u64>() {
                        config.watchdog_ms = v.clamp(100, 10_000);
                    }
                }
                "retry_failed" => config.retry_failed = value == "true",
                _ => {}
            }
        }

        config
    }

    fn serialise(&self) -> String {
        let lines = [
            "# page-window configuration".to_string(),
            String::new(),
            "# Paging".to_string(),
            format!("page_size = {}", self.page_size),
            String::new(),
            "# Scroll handling (milliseconds)".to_string(),
            format!("scroll_throttle_ms = {}", self.scroll_throttle_ms),
            format!("scroll_hold_ms = {}", self.scroll_hold_ms),
            format!("watchdog_ms = {}", self.watchdog_ms),
            String::new(),
            "# Re-request pages whose fetch failed".to_string(),
            format!("retry_failed = {}", self.retry_failed),
            String::new(),
        ];
        lines.join("\n")
    }
}

/// Return the config file path (`$XDG_CONFIG_HOME/page-window/config.toml`).
fn config_path() -> PathBuf {
    let config_dir = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".config")
        });
    config_dir.join("page-window").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert_eq!(ListConfig::new(100, 46.0).validate(), Ok(()));
    }

    #[test]
    fn rejects_bad_geometry() {
        let mut config = ListConfig::new(100, 0.0);
        assert_eq!(config.validate(), Err(EngineError::InvalidItemHeight(0.0)));
        config.item_height = 10.0;
        config.page_size = 0;
        assert_eq!(config.validate(), Err(EngineError::ZeroPageSize));
        config.page_size = 20;
        config.slot_count = 0;
        assert_eq!(config.validate(), Err(EngineError::ZeroSlots));
        config.slot_count = 3;
        config.header_offset = f64::NAN;
        assert!(matches!(config.validate(), Err(EngineError::InvalidHeaderOffset(_))));
    }

    #[test]
    fn parse_clamps_and_ignores_noise() {
        let config = ViewerConfig::parse(
            "# comment\n[section]\npage_size = 0\nscroll_throttle_ms = 5\n\
             watchdog_ms = abc\nretry_failed = true\nmystery = 1\n",
        );
        assert_eq!(config.page_size, 1);
        assert_eq!(config.scroll_throttle_ms, 10);
        assert_eq!(config.watchdog_ms, 500);
        assert!(config.retry_failed);
    }

    #[test]
    fn serialised_form_parses_back() {
        let config = ViewerConfig {
            page_size: 50,
            scroll_throttle_ms: 60,
            scroll_hold_ms: 0,
            watchdog_ms: 750,
            retry_failed: true,
        };
        assert_eq!(ViewerConfig::parse(&config.serialise()), config);
    }

    #[test]
    fn apply_copies_timing_into_list_config() {
        let mut list = ListConfig::new(10, 1.0);
        ViewerConfig {
            watchdog_ms: 900,
            ..ViewerConfig::default()
        }
        .apply(&mut list);
        assert_eq!(list.watchdog_interval, Duration::from_millis(900));
        assert_eq!(list.page_size, 20);
    }
}
