//! ゼロクロス タイミング用カウンタ（TIM4 + TIM6）
//!
//! ## ハードウェア構成
//! - TIM4: 基準カウンタ。1MHz・16ビットでフリーランし、TI1（選択中のコンパレータ出力）の
//!   立ち上がりエッジで CCR1 にキャプチャする
//! - TIM6: ワンショットのカウントダウン。同じ1MHzで予測した半周期を数え、
//!   満了（更新イベント）で転流する
//!
//! 両カウンタとも同じクロック（APB1 170MHz ÷ 170）なので tick 単位が一致します。
//! 割り込み優先度は TIM6（転流）> TIM4（ゼロクロス）。
//!
//! 両ハンドラとも [`with_esc`] のクリティカルセクション内で ESC を操作するため、
//! 互いに割り込むことはありません。優先度は両方が保留中のときの実行順を決めます。
//! 転流の遅れは最長のロック区間（ハンドラ1回分、またはタスク側の `with_esc` 1回分）で
//! 上限が決まり、どの区間もレジスタ操作のみで待ちやループを含みません。

use embassy_stm32::pac;
use g4_esc::CommutationTimers;

use crate::config::{irq, timing::TICK_HZ, SYSCLK_HZ};
use crate::state::with_esc;

const PRESCALER: u16 = (SYSCLK_HZ / TICK_HZ - 1) as u16;

/// ARR/CCR は16ビット
const MAX_COUNTDOWN: u32 = 0xFFFF;

/// TIM4 / TIM6
pub struct BemfTimers {
    _private: (),
}

impl BemfTimers {
    /// 両タイマーを初期化する（停止状態）
    ///
    /// # Safety
    /// PACを使用した直接的なレジスタ操作と割り込みの有効化を含むため、unsafe。
    pub unsafe fn new() -> Self {
        let rcc = pac::RCC;
        let tim4 = pac::TIM4;
        let tim6 = pac::TIM6;

        // 1. クロック有効化
        rcc.apb1enr1().modify(|w| {
            w.set_tim4en(true);
            w.set_tim6en(true);
        });

        // 2. TIM4: 1MHzフリーラン、CH1入力キャプチャ
        tim4.cr1().modify(|w| w.set_cen(false));
        tim4.psc().write_value(PRESCALER);
        tim4.arr().write_value(pac::timer::regs::ArrCore(0xFFFF));

        // CC1S = TI1（TISELでコンパレータ出力を選択）、8サイクルフィルタ
        tim4.ccmr_input(0).modify(|w| {
            w.set_ccs(0, pac::timer::vals::CcmrInputCcs::TI4); // CC1S = 01 (TI1にマップ)
            w.set_icf(0, pac::timer::vals::FilterValue::FCK_INT_N8);
        });

        // 立ち上がりエッジのみ（極性はコンパレータ側で反転）
        tim4.ccer().modify(|w| {
            w.set_cce(0, true);
            w.set_ccp(0, false);
        });
        tim4.egr().write(|w| w.set_ug(true));
        tim4.sr().write(|w| w.0 = 0);

        // 3. TIM6: ワンショット
        tim6.cr1().modify(|w| {
            w.set_cen(false);
            w.set_opm(true);
            w.set_urs(pac::timer::vals::Urs::COUNTER_ONLY);
        });
        tim6.psc().write_value(PRESCALER);
        tim6.egr().write(|w| w.set_ug(true));
        tim6.sr().write(|w| w.0 = 0);
        tim6.dier().modify(|w| w.set_uie(true));

        // 4. 割り込み有効化（NVIC）
        unsafe {
            let mut cp = cortex_m::Peripherals::steal();
            cp.NVIC
                .set_priority(pac::Interrupt::TIM6_DACUNDER, irq::COMMUTATION_PRIORITY);
            cp.NVIC
                .set_priority(pac::Interrupt::TIM4, irq::ZERO_CROSSING_PRIORITY);
            cortex_m::peripheral::NVIC::unmask(pac::Interrupt::TIM6_DACUNDER);
            cortex_m::peripheral::NVIC::unmask(pac::Interrupt::TIM4);
        }

        Self { _private: () }
    }
}

impl CommutationTimers for BemfTimers {
    fn start(&mut self) {
        let tim4 = pac::TIM4;
        tim4.sr().write(|w| w.0 = 0);
        tim4.cr1().modify(|w| w.set_cen(true));
    }

    fn stop(&mut self) {
        let tim4 = pac::TIM4;
        let tim6 = pac::TIM6;

        tim4.dier().modify(|w| w.set_ccie(0, false));
        tim4.cr1().modify(|w| w.set_cen(false));
        tim4.sr().write(|w| w.0 = 0);

        tim6.cr1().modify(|w| w.set_cen(false));
        tim6.sr().write(|w| w.0 = 0);
    }

    fn reference_count(&mut self) -> u32 {
        pac::TIM4.cnt().read().cnt() as u32
    }

    fn arm_capture(&mut self) {
        let tim4 = pac::TIM4;
        // 待機中に溜まったキャプチャは捨てる
        tim4.sr().modify(|w| w.set_ccif(0, false));
        tim4.dier().modify(|w| w.set_ccie(0, true));
    }

    fn disarm_capture(&mut self) {
        pac::TIM4.dier().modify(|w| w.set_ccie(0, false));
    }

    fn arm_countdown(&mut self, ticks: u32) {
        let tim6 = pac::TIM6;
        let ticks = ticks.clamp(1, MAX_COUNTDOWN);

        tim6.cr1().modify(|w| w.set_cen(false));
        tim6.cnt().write(|w| w.set_cnt(0));
        tim6.arr().write(|w| w.set_arr(ticks as u16));
        tim6.sr().write(|w| w.0 = 0);
        tim6.cr1().modify(|w| w.set_cen(true));
    }
}

/// TIM4割り込みハンドラー（ゼロクロス キャプチャ）
///
/// # Safety
/// 割り込みコンテキストで実行されるため、処理は最小限にする
#[inline(always)]
pub unsafe fn tim4_irq_handler() {
    let tim4 = pac::TIM4;
    let sr = tim4.sr().read();

    if sr.ccif(0) {
        tim4.sr().modify(|w| w.set_ccif(0, false));
        let capture = tim4.ccr(0).read().ccr() as u32;
        with_esc(|esc| esc.on_zero_crossing(capture));
    }
}

/// TIM6割り込みハンドラー（カウントダウン満了 → 転流）
///
/// # Safety
/// 割り込みコンテキストで実行されるため、処理は最小限にする
#[inline(always)]
pub unsafe fn tim6_irq_handler() {
    let tim6 = pac::TIM6;

    if tim6.sr().read().uif() {
        tim6.sr().modify(|w| w.set_uif(false));
        with_esc(|esc| esc.on_commutation_due());
    }
}

/// TIM4割り込みのRust側エントリーポイント
#[allow(non_snake_case)]
#[no_mangle]
pub unsafe extern "C" fn TIM4() {
    tim4_irq_handler();
}

/// TIM6割り込みのRust側エントリーポイント
#[allow(non_snake_case)]
#[no_mangle]
pub unsafe extern "C" fn TIM6_DACUNDER() {
    tim6_irq_handler();
}
