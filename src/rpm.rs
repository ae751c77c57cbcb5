//! 回転数推定と制御方式

/// 制御方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ControlScheme {
    /// アプリケーションのデューティ要求をそのまま適用
    Duty = 0,
    /// 目標回転数に向けてレギュレータがデューティを調整
    Rpm = 1,
}

impl ControlScheme {
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ControlScheme::Duty),
            1 => Some(ControlScheme::Rpm),
            _ => None,
        }
    }
}

/// 電気角1周のステップ数 × 2（半周期→ステップ周期）
const TICKS_PER_HALF_TO_CYCLE: u64 = 2 * 6;

/// 半周期 [tick] から機械角の回転数 [rpm] を求める
///
/// `rpm = 60 × tick_hz / (half_period × 2 × 6 × cycles_per_rotation)`
///
/// 未計測（半周期0）や `cycles_per_rotation == 0` の場合は 0 を返します。
pub fn estimate_rpm(half_period: u32, cycles_per_rotation: u8, tick_hz: u32) -> u32 {
    if half_period == 0 || cycles_per_rotation == 0 {
        return 0;
    }

    let denominator = half_period as u64 * TICKS_PER_HALF_TO_CYCLE * cycles_per_rotation as u64;
    let rpm = 60 * tick_hz as u64 / denominator;
    rpm.min(u32::MAX as u64) as u32
}

/// RPM制御方式で使う閉ループ調整ポリシー
///
/// 機械角1回転ごとに呼ばれ、新しいデューティを返すとそれが適用されます。
/// 割り込みコンテキストから呼ばれるため、ブロックしてはいけません。
pub trait RpmRegulator {
    fn adjust(&mut self, target_rpm: u16, measured_rpm: u32, duty: u8) -> Option<u8>;

    /// 有効化・無効化時に内部状態を初期化する
    fn reset(&mut self) {}
}

/// デューティを変更しないレギュレータ（デフォルト）
#[derive(Debug, Clone, Copy, Default)]
pub struct HoldDuty;

impl RpmRegulator for HoldDuty {
    fn adjust(&mut self, _target_rpm: u16, _measured_rpm: u32, _duty: u8) -> Option<u8> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpm_formula() {
        // 1MHz, 半周期1000tick → 1ステップ2ms, 電気角1周12ms, 2サイクル/回転で24ms
        assert_eq!(estimate_rpm(1000, 2, 1_000_000), 2500);
        assert_eq!(estimate_rpm(1000, 1, 1_000_000), 5000);
    }

    #[test]
    fn test_unset_half_period_is_zero() {
        assert_eq!(estimate_rpm(0, 2, 1_000_000), 0);
        assert_eq!(estimate_rpm(1000, 0, 1_000_000), 0);
    }

    #[test]
    fn test_rpm_is_inversely_monotonic() {
        let mut previous = u32::MAX;
        for half in [1u32, 10, 100, 500, 1000, 5000, 20000, 65535] {
            let rpm = estimate_rpm(half, 2, 1_000_000);
            assert!(rpm <= previous);
            previous = rpm;
        }
    }

    #[test]
    fn test_control_scheme_from_u8() {
        assert_eq!(ControlScheme::from_u8(0), Some(ControlScheme::Duty));
        assert_eq!(ControlScheme::from_u8(1), Some(ControlScheme::Rpm));
        assert_eq!(ControlScheme::from_u8(2), None);
    }

    #[test]
    fn test_hold_duty_never_adjusts() {
        let mut regulator = HoldDuty;
        assert_eq!(regulator.adjust(3000, 1000, 100), None);
    }
}
