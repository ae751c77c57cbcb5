//! ブザー
//!
//! モーター停止中に巻線へ短いパルスを与えて音を鳴らします。
//! 1周期で AH_BL と AH_CL の2パターンをそれぞれ `hold_on_us` だけ通電し、
//! 残りの半周期は全相OFFにします。

use crate::commutation::{DriveState, Phase};

const PATTERNS: [DriveState; 2] = [
    DriveState::new(Phase::A, Phase::B),
    DriveState::new(Phase::A, Phase::C),
];

/// ブザーの制限値
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BuzzLimits {
    pub min_period_us: u32,
    pub max_period_us: u32,
    /// 1パルスの通電時間 [μs]
    pub hold_on_us: u32,
}

impl BuzzLimits {
    pub fn clamp_period(&self, period_us: u32) -> u32 {
        period_us.clamp(self.min_period_us, self.max_period_us)
    }
}

/// ブザーの1区間
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BuzzPhase {
    /// 通電するパターン（`None` は全相OFF）
    pub drive: Option<DriveState>,
    pub hold_us: u32,
}

/// ブザーの実行計画
///
/// イテレータとして区間を順に返します。
#[derive(Debug, Clone)]
pub struct Buzz {
    hold_on_us: u32,
    hold_off_us: u32,
    remaining_cycles: u32,
    /// 周期内の区間 (0..4)
    slot: u8,
}

impl Buzz {
    pub fn new(limits: &BuzzLimits, period_us: u32, duration_ms: u32) -> Self {
        let period_us = limits.clamp_period(period_us);
        let duration_us = duration_ms as u64 * 1000;
        let cycles = duration_us.div_ceil(period_us.max(1) as u64);

        Self {
            hold_on_us: limits.hold_on_us,
            hold_off_us: (period_us / 2).saturating_sub(limits.hold_on_us),
            remaining_cycles: cycles.min(u32::MAX as u64) as u32,
            slot: 0,
        }
    }

    pub fn remaining_cycles(&self) -> u32 {
        self.remaining_cycles
    }
}

impl Iterator for Buzz {
    type Item = BuzzPhase;

    fn next(&mut self) -> Option<BuzzPhase> {
        if self.remaining_cycles == 0 {
            return None;
        }

        let phase = if self.slot % 2 == 0 {
            BuzzPhase {
                drive: Some(PATTERNS[(self.slot / 2) as usize]),
                hold_us: self.hold_on_us,
            }
        } else {
            BuzzPhase {
                drive: None,
                hold_us: self.hold_off_us,
            }
        };

        self.slot += 1;
        if self.slot == 4 {
            self.slot = 0;
            self.remaining_cycles -= 1;
        }

        Some(phase)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: BuzzLimits = BuzzLimits {
        min_period_us: 200,
        max_period_us: 2000,
        hold_on_us: 50,
    };

    #[test]
    fn test_one_cycle_pattern() {
        let phases: Vec<BuzzPhase> = Buzz::new(&LIMITS, 1000, 1).collect();
        assert_eq!(
            phases,
            vec![
                BuzzPhase {
                    drive: Some(DriveState::new(Phase::A, Phase::B)),
                    hold_us: 50
                },
                BuzzPhase {
                    drive: None,
                    hold_us: 450
                },
                BuzzPhase {
                    drive: Some(DriveState::new(Phase::A, Phase::C)),
                    hold_us: 50
                },
                BuzzPhase {
                    drive: None,
                    hold_us: 450
                },
            ]
        );
    }

    #[test]
    fn test_period_is_clamped() {
        assert_eq!(LIMITS.clamp_period(10), 200);
        assert_eq!(LIMITS.clamp_period(5000), 2000);
        assert_eq!(LIMITS.clamp_period(800), 800);
    }

    #[test]
    fn test_cycle_count_rounds_up() {
        // 100ms / 300μs = 333.3 → 334周期
        assert_eq!(Buzz::new(&LIMITS, 300, 100).remaining_cycles(), 334);
        assert_eq!(Buzz::new(&LIMITS, 300, 100).count(), 334 * 4);
    }

    #[test]
    fn test_total_time_covers_duration() {
        let total: u32 = Buzz::new(&LIMITS, 1000, 20).map(|p| p.hold_us).sum();
        assert_eq!(total, 20_000);
    }

    #[test]
    fn test_zero_duration_is_silent() {
        assert_eq!(Buzz::new(&LIMITS, 1000, 0).next(), None);
    }
}
