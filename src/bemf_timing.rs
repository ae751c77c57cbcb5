//! BEMFゼロクロス タイミングエンジン
//!
//! 同一クロックで動く2つのカウンタで転流タイミングを予測します。
//!
//! - 基準カウンタ: フリーランで回り続け、ゼロクロスのエッジで値をキャプチャする
//! - カウントダウン: ゼロクロスから予測した半周期をセットし、満了で転流する
//!
//! ゼロクロスはステップの中間で起きるため、前回転流からゼロクロスまでの経過時間の
//! 半分を待てば次の転流時刻になります。
//!
//! ```text
//!  転流        ゼロクロス       転流
//!   |<--- elapsed --->|<- elapsed/2 ->|
//!   prevRef           c               カウントダウン満了
//! ```
//!
//! このモジュールはタイミング計算だけを持ち、ハードウェアには触りません。
//! 割り込みハンドラからは [`crate::esc::Esc`] 経由で呼ばれます。

/// タイミングエンジンの設定（クロック・カウンタ幅依存の定数）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingConfig {
    /// 基準カウンタの値域（16bitなら 0x1_0000）
    pub counter_range: u32,
    /// 前回転流直後のノイズとして無視する範囲 [tick]
    pub debounce_ticks: u32,
    /// カウンタのクロック [Hz]
    pub tick_hz: u32,
}

/// エンジンの状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EngineState {
    /// 基準カウンタがゼロクロスのキャプチャ待ち
    AwaitingCrossing,
    /// カウントダウンが予測半周期で動作中
    Commutating,
}

/// キャプチャを無視した理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IgnoreReason {
    /// 前回転流直後のスイッチングノイズ
    Debounce,
    /// 既にカウントダウン中
    Busy,
}

/// ゼロクロス処理の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CrossingOutcome {
    Ignored(IgnoreReason),
    /// カウントダウンに `half_period` [tick] をセットする
    Armed { half_period: u32 },
}

/// 前回転流の基準値 `prev` からキャプチャ値 `capture` までの経過tick数
///
/// `capture <= prev` の場合はカウンタがちょうど1回ラップしたとみなします。
#[inline(always)]
pub const fn elapsed_ticks(prev: u32, capture: u32, counter_range: u32) -> u32 {
    if capture > prev {
        capture - prev
    } else {
        counter_range.wrapping_sub(prev).wrapping_add(capture)
    }
}

/// 2カウンタ方式のタイミングエンジン
#[derive(Debug, Clone)]
pub struct TimingEngine {
    config: TimingConfig,
    state: EngineState,
    reference_at_commutation: u32,
    predicted_half_period: u32,
    cycle_count: u8,
}

impl TimingEngine {
    pub const fn new(config: TimingConfig) -> Self {
        Self {
            config,
            state: EngineState::AwaitingCrossing,
            reference_at_commutation: 0,
            predicted_half_period: 0,
            cycle_count: 0,
        }
    }

    pub fn config(&self) -> &TimingConfig {
        &self.config
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    /// 最後に転流した時の基準カウンタ値
    pub fn reference_at_commutation(&self) -> u32 {
        self.reference_at_commutation
    }

    /// 最後にカウントダウンへセットした半周期（未計測なら0）
    pub fn predicted_half_period(&self) -> u32 {
        self.predicted_half_period
    }

    /// 有効化・無効化のたびに初期状態へ戻す
    ///
    /// `reference_now` を最初のゼロクロスに対する基準値とする。
    pub fn reset(&mut self, reference_now: u32) {
        self.state = EngineState::AwaitingCrossing;
        self.reference_at_commutation = reference_now;
        self.predicted_half_period = 0;
        self.cycle_count = 0;
    }

    /// 遷移1: 基準カウンタがゼロクロスをキャプチャした
    pub fn on_crossing(&mut self, capture: u32) -> CrossingOutcome {
        if self.state == EngineState::Commutating {
            return CrossingOutcome::Ignored(IgnoreReason::Busy);
        }

        let prev = self.reference_at_commutation;
        if prev < capture && capture < prev.saturating_add(self.config.debounce_ticks) {
            return CrossingOutcome::Ignored(IgnoreReason::Debounce);
        }

        let elapsed = elapsed_ticks(prev, capture, self.config.counter_range);
        let half_period = (elapsed / 2).max(1);

        self.predicted_half_period = half_period;
        self.state = EngineState::Commutating;

        CrossingOutcome::Armed { half_period }
    }

    /// 遷移2: カウントダウンが満了し、`new_step` へ転流した
    ///
    /// 基準値を記録してキャプチャ待ちに戻る。
    /// 機械角1回転分（ステップ0への復帰が `cycles_per_rotation` 回）が経過したら true を返す。
    pub fn on_countdown_expired(
        &mut self,
        reference_now: u32,
        new_step: u8,
        cycles_per_rotation: u8,
    ) -> bool {
        self.reference_at_commutation = reference_now;
        self.state = EngineState::AwaitingCrossing;

        if new_step != 0 {
            return false;
        }

        self.cycle_count = self.cycle_count.saturating_add(1);
        if self.cycle_count >= cycles_per_rotation.max(1) {
            self.cycle_count = 0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: TimingConfig = TimingConfig {
        counter_range: 0x1_0000,
        debounce_ticks: 50,
        tick_hz: 1_000_000,
    };

    fn engine_at(reference: u32) -> TimingEngine {
        let mut engine = TimingEngine::new(CONFIG);
        engine.reset(reference);
        engine
    }

    #[test]
    fn test_elapsed_without_wrap() {
        assert_eq!(elapsed_ticks(1000, 3000, 0x1_0000), 2000);
    }

    #[test]
    fn test_elapsed_with_wrap() {
        // c <= prevRef なら (range - prevRef) + c
        assert_eq!(elapsed_ticks(65000, 464, 0x1_0000), 536 + 464);
        assert_eq!(elapsed_ticks(1000, 1000, 0x1_0000), 0x1_0000);
    }

    #[test]
    fn test_crossing_arms_half_period() {
        let mut engine = engine_at(1000);
        assert_eq!(
            engine.on_crossing(3000),
            CrossingOutcome::Armed { half_period: 1000 }
        );
        assert_eq!(engine.state(), EngineState::Commutating);
        assert_eq!(engine.predicted_half_period(), 1000);
    }

    #[test]
    fn test_crossing_after_wrap() {
        let mut engine = engine_at(65000);
        // 経過 = (65536 - 65000) + 464 = 1000
        assert_eq!(
            engine.on_crossing(464),
            CrossingOutcome::Armed { half_period: 500 }
        );
    }

    #[test]
    fn test_debounce_ignores_noise() {
        let mut engine = engine_at(1000);
        for c in 1001..1050 {
            assert_eq!(
                engine.on_crossing(c),
                CrossingOutcome::Ignored(IgnoreReason::Debounce)
            );
        }
        // 状態はそのまま
        assert_eq!(engine.state(), EngineState::AwaitingCrossing);
        assert_eq!(engine.reference_at_commutation(), 1000);
        assert_eq!(engine.predicted_half_period(), 0);

        // 閾値ちょうどは有効
        assert_eq!(
            engine.on_crossing(1050),
            CrossingOutcome::Armed { half_period: 25 }
        );
    }

    #[test]
    fn test_capture_below_reference_is_wrap_not_noise() {
        // c <= prevRef は常に1回ラップとして扱う
        let mut engine = engine_at(1000);
        let expected = (0x1_0000 - 1000 + 990) / 2;
        assert_eq!(
            engine.on_crossing(990),
            CrossingOutcome::Armed {
                half_period: expected
            }
        );
    }

    #[test]
    fn test_minimum_half_period_is_one_tick() {
        let mut engine = TimingEngine::new(TimingConfig {
            debounce_ticks: 0,
            ..CONFIG
        });
        engine.reset(100);
        assert_eq!(
            engine.on_crossing(101),
            CrossingOutcome::Armed { half_period: 1 }
        );
    }

    #[test]
    fn test_crossing_while_commutating_is_ignored() {
        let mut engine = engine_at(0);
        engine.on_crossing(2000);
        assert_eq!(
            engine.on_crossing(4000),
            CrossingOutcome::Ignored(IgnoreReason::Busy)
        );
        assert_eq!(engine.predicted_half_period(), 1000);
    }

    #[test]
    fn test_countdown_records_reference() {
        let mut engine = engine_at(0);
        engine.on_crossing(2000);
        engine.on_countdown_expired(3000, 1, 2);
        assert_eq!(engine.state(), EngineState::AwaitingCrossing);
        assert_eq!(engine.reference_at_commutation(), 3000);

        // 次のゼロクロスは新しい基準から測る
        assert_eq!(
            engine.on_crossing(5000),
            CrossingOutcome::Armed { half_period: 1000 }
        );
    }

    #[test]
    fn test_rotation_every_cycles_per_rotation() {
        let mut engine = engine_at(0);
        let mut rotations = 0;
        let mut step = 0u8;
        // 2サイクル/回転で4電気サイクル = 2回転
        for _ in 0..24 {
            step = (step + 1) % 6;
            if engine.on_countdown_expired(0, step, 2) {
                rotations += 1;
            }
        }
        assert_eq!(rotations, 2);
    }

    #[test]
    fn test_reset_clears_cycle_count() {
        let mut engine = engine_at(0);
        assert!(!engine.on_countdown_expired(0, 0, 2));
        engine.reset(0);
        assert!(!engine.on_countdown_expired(0, 0, 2));
        assert!(engine.on_countdown_expired(0, 0, 2));
    }
}
