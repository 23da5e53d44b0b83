use std::time::Duration;

use thiserror::Error;

/// Default pause between a correct answer and the next slide.
pub const DEFAULT_AUTO_ADVANCE_MS: u64 = 2_000;
/// Default share of first-try correct answers required to pass a lesson.
pub const DEFAULT_PASS_RATIO: f32 = 0.75;

const MAX_AUTO_ADVANCE_MS: u64 = 60_000;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum PlayerSettingsError {
    #[error("auto advance delay must be between 1 and 60000 ms, got {0}")]
    InvalidAutoAdvanceDelay(u64),

    #[error("pass ratio must be in (0, 1], got {0}")]
    InvalidPassRatio(f32),
}

/// Tunables for the lesson player.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerSettings {
    auto_advance: bool,
    auto_advance_delay: Duration,
    pass_ratio: f32,
}

#[derive(Clone, Debug, Default)]
pub struct PlayerSettingsDraft {
    pub auto_advance: Option<bool>,
    pub auto_advance_delay_ms: Option<u64>,
    pub pass_ratio: Option<f32>,
}

impl PlayerSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the draft, filling unset fields with defaults.
    ///
    /// # Errors
    ///
    /// Returns `PlayerSettingsError` if the delay or pass ratio are out of range.
    pub fn validate(self) -> Result<PlayerSettings, PlayerSettingsError> {
        let delay_ms = self.auto_advance_delay_ms.unwrap_or(DEFAULT_AUTO_ADVANCE_MS);
        if delay_ms == 0 || delay_ms > MAX_AUTO_ADVANCE_MS {
            return Err(PlayerSettingsError::InvalidAutoAdvanceDelay(delay_ms));
        }

        let pass_ratio = self.pass_ratio.unwrap_or(DEFAULT_PASS_RATIO);
        if !(pass_ratio > 0.0 && pass_ratio <= 1.0) {
            return Err(PlayerSettingsError::InvalidPassRatio(pass_ratio));
        }

        Ok(PlayerSettings {
            auto_advance: self.auto_advance.unwrap_or(true),
            auto_advance_delay: Duration::from_millis(delay_ms),
            pass_ratio,
        })
    }
}

impl PlayerSettings {
    #[must_use]
    pub fn auto_advance(&self) -> bool {
        self.auto_advance
    }

    #[must_use]
    pub fn auto_advance_delay(&self) -> Duration {
        self.auto_advance_delay
    }

    #[must_use]
    pub fn pass_ratio(&self) -> f32 {
        self.pass_ratio
    }
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            auto_advance: true,
            auto_advance_delay: Duration::from_millis(DEFAULT_AUTO_ADVANCE_MS),
            pass_ratio: DEFAULT_PASS_RATIO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_draft_matches_defaults() {
        let settings = PlayerSettingsDraft::new().validate().unwrap();
        assert_eq!(settings, PlayerSettings::default());
        assert_eq!(settings.auto_advance_delay(), Duration::from_secs(2));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let zero = PlayerSettingsDraft {
            auto_advance_delay_ms: Some(0),
            ..PlayerSettingsDraft::default()
        };
        assert!(matches!(
            zero.validate(),
            Err(PlayerSettingsError::InvalidAutoAdvanceDelay(0))
        ));

        let ratio = PlayerSettingsDraft {
            pass_ratio: Some(1.5),
            ..PlayerSettingsDraft::default()
        };
        assert!(ratio.validate().is_err());

        let nan = PlayerSettingsDraft {
            pass_ratio: Some(f32::NAN),
            ..PlayerSettingsDraft::default()
        };
        assert!(nan.validate().is_err());
    }
}
