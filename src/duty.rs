//! PWMデューティ制御
//!
//! 3相共通の単一デューティ値の上下限を判定します。

/// デューティ要求の判定結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DutyRequest {
    /// 最小デューティ未満：モーターを停止する
    BelowMinimum,
    /// 適用するデューティ（上限でクランプ済み）
    Apply(u8),
}

/// デューティの上下限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DutyLimits {
    pub min: u8,
    pub max: u8,
}

impl DutyLimits {
    pub const fn new(min: u8, max: u8) -> Self {
        Self { min, max }
    }

    /// 要求値を判定する
    pub const fn evaluate(&self, requested: u8) -> DutyRequest {
        if requested < self.min {
            DutyRequest::BelowMinimum
        } else if requested > self.max {
            DutyRequest::Apply(self.max)
        } else {
            DutyRequest::Apply(requested)
        }
    }

    /// 起動・停止コマンドで使う最小の起動デューティ
    pub const fn enable_duty(&self) -> u8 {
        self.min.saturating_add(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_below_minimum() {
        let limits = DutyLimits::new(15, 249);
        assert_eq!(limits.evaluate(0), DutyRequest::BelowMinimum);
        assert_eq!(limits.evaluate(14), DutyRequest::BelowMinimum);
    }

    #[test]
    fn test_within_range_is_unchanged() {
        let limits = DutyLimits::new(15, 249);
        assert_eq!(limits.evaluate(15), DutyRequest::Apply(15));
        assert_eq!(limits.evaluate(100), DutyRequest::Apply(100));
        assert_eq!(limits.evaluate(249), DutyRequest::Apply(249));
    }

    #[test]
    fn test_clamp_to_maximum() {
        let limits = DutyLimits::new(15, 249);
        assert_eq!(limits.evaluate(250), DutyRequest::Apply(249));
        assert_eq!(limits.evaluate(255), DutyRequest::Apply(249));
    }

    #[test]
    fn test_enable_duty() {
        assert_eq!(DutyLimits::new(15, 249).enable_duty(), 16);
    }
}
