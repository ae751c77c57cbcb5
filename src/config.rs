//! Configuration module
//!
//! コンパイル時のデフォルト値（params）と、起動時に組み立てる実行時設定（EscConfig）。
//! 設定はすべて揮発性で、電源再投入でデフォルトに戻ります。

pub mod params;

pub use params::*;

use crate::bemf_timing::TimingConfig;
use crate::buzzer::BuzzLimits;
use crate::duty::DutyLimits;
use crate::spin_up::SpinUpProfile;

/// ESC全体の実行時設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct EscConfig {
    pub duty: DutyLimits,
    pub spin_up: SpinUpProfile,
    pub timing: TimingConfig,
    pub buzz: BuzzLimits,
    pub cycles_per_rotation: u8,
}

impl EscConfig {
    pub const fn new() -> Self {
        Self {
            duty: DutyLimits::new(duty::MIN_DUTY, duty::MAX_DUTY),
            spin_up: SpinUpProfile {
                start_period_us: spin_up::START_PERIOD_US,
                end_period_us: spin_up::END_PERIOD_US,
                period_decrement_us: spin_up::PERIOD_DECREMENT_US,
                steps_per_increment: spin_up::STEPS_PER_INCREMENT,
            },
            timing: TimingConfig {
                counter_range: timing::COUNTER_RANGE,
                debounce_ticks: timing::DEBOUNCE_TICKS,
                tick_hz: timing::TICK_HZ,
            },
            buzz: BuzzLimits {
                min_period_us: buzz::MIN_PERIOD_US,
                max_period_us: buzz::MAX_PERIOD_US,
                hold_on_us: buzz::HOLD_ON_US,
            },
            cycles_per_rotation: DEFAULT_CYCLES_PER_ROTATION,
        }
    }
}

impl Default for EscConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EscConfig::default();
        assert_eq!(config.duty.min, 15);
        assert_eq!(config.duty.max, 249);
        assert_eq!(config.timing.counter_range, 65536);
        assert_eq!(config.cycles_per_rotation, 2);
    }

    #[test]
    fn test_spin_up_profile_is_decreasing() {
        let config = EscConfig::default();
        assert!(config.spin_up.start_period_us > config.spin_up.end_period_us);
        assert!(config.spin_up.period_decrement_us > 0);
    }
}
