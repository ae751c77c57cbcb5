//! 共有状態
//!
//! 割り込みハンドラ（転流・ゼロクロス）とタスク（通信・LEDなど）の両方から参照される
//! モーター状態です。1ワード以下のフィールドはアトミック、半周期はクリティカルセクション
//! 付きのMutexで保持します。`static` に置けるよう `const fn new()` で構築します。

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::commutation::{next_index, Direction};
use crate::config::DEFAULT_CYCLES_PER_ROTATION;
use crate::rpm::ControlScheme;

/// ライフサイクル状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Lifecycle {
    /// 停止（ブレーキ）
    Disabled = 0,
    /// オープンループ始動中
    SpinningUp = 1,
    /// BEMF閉ループで回転中
    Running = 2,
    /// 非常停止済み（リセットまで復帰しない）
    Halted = 3,
}

impl Lifecycle {
    pub const fn from_u8(value: u8) -> Self {
        match value {
            1 => Lifecycle::SpinningUp,
            2 => Lifecycle::Running,
            3 => Lifecycle::Halted,
            _ => Lifecycle::Disabled,
        }
    }

    /// モーターが駆動されているか（始動中を含む）
    pub const fn is_active(self) -> bool {
        matches!(self, Lifecycle::SpinningUp | Lifecycle::Running)
    }
}

/// モーター状態（プロセス全体で1つ）
pub struct MotorState {
    sequence_step: AtomicU8,
    reverse: AtomicBool,
    lifecycle: AtomicU8,
    duty: AtomicU8,
    cycles_per_rotation: AtomicU8,
    control_scheme: AtomicU8,
    target_rpm: AtomicU16,
    rotations: AtomicU32,
    /// 最後にカウントダウンへセットした半周期 [tick]
    half_period: Mutex<CriticalSectionRawMutex, Cell<u32>>,
}

impl MotorState {
    pub const fn new() -> Self {
        Self {
            sequence_step: AtomicU8::new(0),
            reverse: AtomicBool::new(false),
            lifecycle: AtomicU8::new(Lifecycle::Disabled as u8),
            duty: AtomicU8::new(0),
            cycles_per_rotation: AtomicU8::new(DEFAULT_CYCLES_PER_ROTATION),
            control_scheme: AtomicU8::new(ControlScheme::Duty as u8),
            target_rpm: AtomicU16::new(0),
            rotations: AtomicU32::new(0),
            half_period: Mutex::new(Cell::new(0)),
        }
    }

    // ===== 転流ステップ =====

    pub fn sequence_step(&self) -> u8 {
        self.sequence_step.load(Ordering::Relaxed)
    }

    pub fn set_sequence_step(&self, step: u8) {
        self.sequence_step.store(step % 6, Ordering::Relaxed);
    }

    /// ステップを1つ進めて新しいインデックスを返す
    pub fn advance_step(&self) -> u8 {
        let next = next_index(self.sequence_step());
        self.sequence_step.store(next, Ordering::Relaxed);
        next
    }

    // ===== 回転方向 =====

    pub fn direction(&self) -> Direction {
        if self.reverse.load(Ordering::Relaxed) {
            Direction::Reverse
        } else {
            Direction::Forward
        }
    }

    pub(crate) fn latch_direction(&self, direction: Direction) {
        self.reverse.store(direction.is_reverse(), Ordering::Relaxed);
    }

    // ===== ライフサイクル =====

    pub fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.lifecycle.load(Ordering::Relaxed))
    }

    pub(crate) fn set_lifecycle(&self, lifecycle: Lifecycle) {
        self.lifecycle.store(lifecycle as u8, Ordering::Relaxed);
    }

    /// モーター駆動中（始動中を含む）
    pub fn motor_enabled(&self) -> bool {
        self.lifecycle().is_active()
    }

    pub fn is_halted(&self) -> bool {
        self.lifecycle() == Lifecycle::Halted
    }

    // ===== デューティ =====

    pub fn duty(&self) -> u8 {
        self.duty.load(Ordering::Relaxed)
    }

    pub(crate) fn set_duty(&self, duty: u8) {
        self.duty.store(duty, Ordering::Relaxed);
    }

    // ===== 回転数関連 =====

    pub fn cycles_per_rotation(&self) -> u8 {
        self.cycles_per_rotation.load(Ordering::Relaxed)
    }

    pub(crate) fn set_cycles_per_rotation(&self, cycles: u8) {
        self.cycles_per_rotation.store(cycles, Ordering::Relaxed);
    }

    pub fn control_scheme(&self) -> ControlScheme {
        ControlScheme::from_u8(self.control_scheme.load(Ordering::Relaxed))
            .unwrap_or(ControlScheme::Duty)
    }

    pub(crate) fn set_control_scheme(&self, scheme: ControlScheme) {
        self.control_scheme.store(scheme as u8, Ordering::Relaxed);
    }

    pub fn target_rpm(&self) -> u16 {
        self.target_rpm.load(Ordering::Relaxed)
    }

    pub(crate) fn set_target_rpm(&self, rpm: u16) {
        self.target_rpm.store(rpm, Ordering::Relaxed);
    }

    /// 機械角の累積回転数
    pub fn rotations(&self) -> u32 {
        self.rotations.load(Ordering::Relaxed)
    }

    pub(crate) fn count_rotation(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    // ===== 半周期 =====

    /// 最後の予測半周期 [tick]（未計測なら0）
    ///
    /// 転流割り込み中の書き込みと競合しないよう、クリティカルセクション内で読む。
    pub fn half_period(&self) -> u32 {
        self.half_period.lock(|cell| cell.get())
    }

    pub(crate) fn set_half_period(&self, ticks: u32) {
        self.half_period.lock(|cell| cell.set(ticks));
    }
}

impl Default for MotorState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let state = MotorState::new();
        assert_eq!(state.lifecycle(), Lifecycle::Disabled);
        assert!(!state.motor_enabled());
        assert_eq!(state.duty(), 0);
        assert_eq!(state.sequence_step(), 0);
        assert_eq!(state.direction(), Direction::Forward);
        assert_eq!(state.cycles_per_rotation(), DEFAULT_CYCLES_PER_ROTATION);
        assert_eq!(state.control_scheme(), ControlScheme::Duty);
        assert_eq!(state.half_period(), 0);
    }

    #[test]
    fn test_advance_step_wraps() {
        let state = MotorState::new();
        state.set_sequence_step(5);
        assert_eq!(state.advance_step(), 0);
        assert_eq!(state.advance_step(), 1);
    }

    #[test]
    fn test_lifecycle_active() {
        let state = MotorState::new();
        state.set_lifecycle(Lifecycle::SpinningUp);
        assert!(state.motor_enabled());
        state.set_lifecycle(Lifecycle::Running);
        assert!(state.motor_enabled());
        state.set_lifecycle(Lifecycle::Halted);
        assert!(!state.motor_enabled());
        assert!(state.is_halted());
    }

    #[test]
    fn test_half_period_roundtrip_under_lock() {
        let state = MotorState::new();
        state.set_half_period(1234);
        assert_eq!(state.half_period(), 1234);
    }
}
