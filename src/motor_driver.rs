//! モータードライバー抽象化レイヤー
//!
//! 制御ロジックが触るハードウェアは次の3つだけです。
//! - [`PhaseBridge`]: 3相ハーフブリッジ（PWM出力）
//! - [`BemfComparator`]: フローティング相と仮想中性点を比較するコンパレータ
//! - [`CommutationTimers`]: 同一クロックで動く基準カウンタ（フリーラン＋キャプチャ）と
//!   ワンショットのカウントダウン
//!
//! いずれも割り込みコンテキストから呼ばれるため、ブロックしてはいけません。

use crate::commutation::{DriveState, SenseConfig};

/// 3相ハーフブリッジ
pub trait PhaseBridge {
    /// 3相すべてのコンペア値を同時に更新する（0 - フルスケールのデューティ単位）
    fn set_duty(&mut self, duty: u8);

    /// ハイサイドをPWM、ローサイドをON、残りの相をフローティングにする
    fn drive(&mut self, state: DriveState);

    /// PWMを使わずハイサイドを常時ONにする（ブザー用）
    fn energize(&mut self, state: DriveState);

    /// 全相ハイ・ローともOFF（フローティング）
    fn release(&mut self);

    /// 全相ローサイドON（ブレーキ）、PWM停止
    fn brake(&mut self);
}

/// BEMFコンパレータ
pub trait BemfComparator {
    fn enable(&mut self);
    fn disable(&mut self);

    /// 監視する相と極性を切り替える
    fn select(&mut self, sense: SenseConfig);
}

/// 転流タイミング用の2つのカウンタ
pub trait CommutationTimers {
    /// 両カウンタを起動する（基準カウンタはフリーラン）
    fn start(&mut self);

    /// 両カウンタと割り込みを停止する
    fn stop(&mut self);

    /// 基準カウンタの現在値
    fn reference_count(&mut self) -> u32;

    /// ゼロクロスのキャプチャ割り込みを有効化する
    fn arm_capture(&mut self);

    /// キャプチャ割り込みを無効化する（転流待ちの間）
    fn disarm_capture(&mut self);

    /// カウントダウンを `ticks` で起動する（満了で転流割り込み）
    fn arm_countdown(&mut self, ticks: u32);
}

/// ESCが所有するハードウェア一式
pub struct Hardware<B, C, T> {
    pub bridge: B,
    pub comparator: C,
    pub timers: T,
}

impl<B, C, T> Hardware<B, C, T>
where
    B: PhaseBridge,
    C: BemfComparator,
    T: CommutationTimers,
{
    pub fn new(bridge: B, comparator: C, timers: T) -> Self {
        Self {
            bridge,
            comparator,
            timers,
        }
    }

    /// 出力・コンパレータ・カウンタをすべて停止してブレーキ状態にする
    pub fn quiesce(&mut self) {
        self.timers.stop();
        self.comparator.disable();
        self.bridge.brake();
    }
}
