use super::error::EngineError;

use anyhow::Result;
use vulkanalia::prelude::v1_2::*;

/// Semantic version of the application built on top of the engine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl Version {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self { major, minor, patch }
    }

    /// Packs the version the way `vk::ApplicationInfo` expects it.
    pub fn to_vk(self) -> u32 {
        vk::make_version(self.major, self.minor, self.patch)
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

/// Run-time engine settings, fixed at engine creation.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Application name, also used as the window title.
    pub app_name: String,
    pub app_version: Version,
    pub window_width: u32,
    pub window_height: u32,
    /// Maximum number of objects that can be queued for a single frame.
    pub max_draws: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            app_name: "vk2d".to_string(),
            app_version: Version::default(),
            window_width: 800,
            window_height: 600,
            max_draws: 10,
        }
    }
}

impl EngineConfig {
    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn with_app_version(mut self, app_version: Version) -> Self {
        self.app_version = app_version;
        self
    }

    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_width = width;
        self.window_height = height;
        self
    }

    pub fn with_max_draws(mut self, max_draws: usize) -> Self {
        self.max_draws = max_draws;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.app_name.is_empty() {
            return Err(EngineError::InvalidConfig("application name is empty").into());
        }
        if self.app_name.contains('\0') {
            return Err(EngineError::InvalidConfig("application name contains a nul byte").into());
        }
        if self.window_width == 0 || self.window_height == 0 {
            return Err(EngineError::InvalidConfig("window size must be non-zero").into());
        }
        if self.max_draws == 0 {
            return Err(EngineError::InvalidConfig("draw capacity must be non-zero").into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn builder_overrides_fields() {
        let config = EngineConfig::default()
            .with_app_name("demo")
            .with_app_version(Version::new(2, 1, 3))
            .with_window_size(1024, 768)
            .with_max_draws(64);

        assert_eq!(config.app_name, "demo");
        assert_eq!(config.app_version, Version::new(2, 1, 3));
        assert_eq!((config.window_width, config.window_height), (1024, 768));
        assert_eq!(config.max_draws, 64);
    }

    #[test]
    fn rejects_zero_draw_capacity() {
        let error = EngineConfig::default().with_max_draws(0).validate().unwrap_err();
        assert!(matches!(error.downcast_ref::<EngineError>(), Some(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_degenerate_window() {
        assert!(EngineConfig::default().with_window_size(0, 600).validate().is_err());
        assert!(EngineConfig::default().with_app_name("").validate().is_err());
    }

    #[test]
    fn version_packs_like_vulkan() {
        assert_eq!(Version::new(1, 2, 3).to_vk(), (1 << 22) | (2 << 12) | 3);
    }
}
