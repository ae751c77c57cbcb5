//! ステータスLEDの点滅
//!
//! 点滅要求を受けるとLEDを消灯し、`period_ms` ごとにトグルを `2 × count − 1` 回行います。
//! 最後は必ず点灯状態で終わります。

/// 点滅要求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlinkRequest {
    pub period_ms: u16,
    pub count: u16,
}

/// 待ち時間の後にLEDを `led_on` にする
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BlinkStep {
    pub wait_ms: u16,
    pub led_on: bool,
}

/// 点滅の実行計画
#[derive(Debug, Clone)]
pub struct Blink {
    period_ms: u16,
    toggles_left: u32,
    led_on: bool,
}

impl Blink {
    pub fn new(request: BlinkRequest) -> Self {
        Self {
            period_ms: request.period_ms,
            toggles_left: (request.count as u32 * 2).saturating_sub(1),
            led_on: false,
        }
    }

    /// 開始時に設定するLED状態（count 0 なら何もしない）
    pub fn initial(&self) -> Option<bool> {
        if self.toggles_left == 0 {
            None
        } else {
            Some(false)
        }
    }
}

impl Iterator for Blink {
    type Item = BlinkStep;

    fn next(&mut self) -> Option<BlinkStep> {
        if self.toggles_left == 0 {
            return None;
        }

        self.toggles_left -= 1;
        self.led_on = if self.toggles_left == 0 {
            true
        } else {
            !self.led_on
        };

        Some(BlinkStep {
            wait_ms: self.period_ms,
            led_on: self.led_on,
        })
    }
}
