//! サーボPWM入力（外部制御信号）
//!
//! 1000〜2000μsのパルス幅をデューティ 0〜max_duty に線形変換します。
//! 立ち上がりエッジごとにタイムアウト期限を更新し、一度でも信号を受信した後に
//! 期限を過ぎた場合は制御信号喪失として非常停止の対象になります。

use crate::config::params::servo;

/// サーボ入力の設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ServoConfig {
    pub pulse_min_us: u32,
    pub pulse_max_us: u32,
    pub timeout_us: u64,
    /// パルス最大時のデューティ
    pub max_duty: u8,
}

impl ServoConfig {
    pub const fn new(max_duty: u8) -> Self {
        Self {
            pulse_min_us: servo::PULSE_MIN_US,
            pulse_max_us: servo::PULSE_MAX_US,
            timeout_us: servo::TIMEOUT_US,
            max_duty,
        }
    }

    /// パルス幅をデューティに変換する
    pub fn pulse_to_duty(&self, high_us: u32) -> u8 {
        let span = self.pulse_max_us.saturating_sub(self.pulse_min_us);
        if span == 0 {
            return 0;
        }

        let clamped = high_us.clamp(self.pulse_min_us, self.pulse_max_us);
        let scaled = (clamped - self.pulse_min_us) * self.max_duty as u32 / span;
        scaled as u8
    }
}

/// サーボ入力のエッジ処理
#[derive(Debug, Clone)]
pub struct ServoInput {
    config: ServoConfig,
    last_rise_us: Option<u64>,
    deadline_us: Option<u64>,
}

impl ServoInput {
    pub const fn new(config: ServoConfig) -> Self {
        Self {
            config,
            last_rise_us: None,
            deadline_us: None,
        }
    }

    /// 立ち上がりエッジ: 時刻を記録しタイムアウト期限を更新
    pub fn on_rising(&mut self, now_us: u64) {
        self.last_rise_us = Some(now_us);
        self.deadline_us = Some(now_us + self.config.timeout_us);
    }

    /// 立ち下がりエッジ: パルス幅から要求デューティを返す
    ///
    /// 立ち上がりを一度も見ていない場合は `None`。
    pub fn on_falling(&mut self, now_us: u64) -> Option<u8> {
        let rise = self.last_rise_us?;
        let high = now_us.saturating_sub(rise).min(u32::MAX as u64) as u32;
        Some(self.config.pulse_to_duty(high))
    }

    /// 制御信号が途絶えたか
    pub fn is_timed_out(&self, now_us: u64) -> bool {
        match self.deadline_us {
            Some(deadline) => now_us > deadline,
            None => false,
        }
    }

    /// 次のタイムアウト期限（未受信なら `None`）
    pub fn deadline_us(&self) -> Option<u64> {
        self.deadline_us
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> ServoInput {
        ServoInput::new(ServoConfig::new(249))
    }

    #[test]
    fn test_pulse_mapping() {
        let config = ServoConfig::new(249);
        assert_eq!(config.pulse_to_duty(1000), 0);
        assert_eq!(config.pulse_to_duty(1500), 124);
        assert_eq!(config.pulse_to_duty(2000), 249);
    }

    #[test]
    fn test_pulse_is_clamped() {
        let config = ServoConfig::new(249);
        assert_eq!(config.pulse_to_duty(500), 0);
        assert_eq!(config.pulse_to_duty(2500), 249);
    }

    #[test]
    fn test_edges_produce_duty() {
        let mut servo = input();
        assert_eq!(servo.on_falling(100), None);
        servo.on_rising(10_000);
        assert_eq!(servo.on_falling(12_000), Some(249));
    }

    #[test]
    fn test_no_timeout_before_first_pulse() {
        let servo = input();
        assert!(!servo.is_timed_out(u64::MAX));
    }

    #[test]
    fn test_timeout_after_signal_loss() {
        let mut servo = input();
        servo.on_rising(0);
        assert!(!servo.is_timed_out(1_000_000));
        assert!(servo.is_timed_out(1_000_001));

        // 新しいパルスで期限が延びる
        servo.on_rising(1_000_000);
        assert!(!servo.is_timed_out(1_500_000));
    }
}
