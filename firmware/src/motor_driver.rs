//! 3相ハーフブリッジドライバー（TIM1）
//!
//! ComplementaryPwm の各チャネルを相ごとに次のいずれかの出力モードにします。
//! - PWM: ハイサイドをPWM、ローサイドは相補出力
//! - Low: ローサイド常時ON（OCxM = 強制インアクティブ）
//! - High: ハイサイド常時ON（OCxM = 強制アクティブ、ブザー用）
//! - Float: CCxE/CCxNE とも無効（BEMF観測用にフローティング）
//!
//! コンペア値はプリロード有効なので、3相とも次の更新イベントで同時に反映されます。

use embassy_stm32::{
    pac::{self, timer::vals::Ocm},
    peripherals,
    timer::{complementary_pwm::ComplementaryPwm, Channel},
};
use g4_esc::commutation::{DriveState, Phase};
use g4_esc::config::duty::MAX_DUTY;
use g4_esc::PhaseBridge;

/// 相ごとの出力モード
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PhaseOutput {
    Pwm,
    Low,
    High,
    Float,
}

const fn channel(phase: Phase) -> Channel {
    match phase {
        Phase::A => Channel::Ch1,
        Phase::B => Channel::Ch2,
        Phase::C => Channel::Ch3,
    }
}

/// TIM1による3相ブリッジ
pub struct Tim1Bridge {
    pwm: ComplementaryPwm<'static, peripherals::TIM1>,
    /// タイマーのフルスケール（ARR）
    max_compare: u16,
}

impl Tim1Bridge {
    /// 全相ブレーキ状態で作成
    pub fn new(pwm: ComplementaryPwm<'static, peripherals::TIM1>) -> Self {
        let max_compare = pwm.get_max_duty();
        let mut bridge = Self { pwm, max_compare };
        bridge.brake();
        bridge
    }

    /// デューティ（0 - MAX_DUTY）をコンペア値に変換
    fn compare(&self, duty: u8) -> u16 {
        let scaled = duty.min(MAX_DUTY) as u32 * self.max_compare as u32 / MAX_DUTY as u32;
        scaled as u16
    }

    fn set_output(&mut self, phase: Phase, output: PhaseOutput) {
        let ch = channel(phase);
        let index = phase.index();

        let mode = match output {
            PhaseOutput::Pwm => Ocm::PWM_MODE1,
            PhaseOutput::Low | PhaseOutput::Float => Ocm::FORCE_INACTIVE,
            PhaseOutput::High => Ocm::FORCE_ACTIVE,
        };
        pac::TIM1
            .ccmr_output(index / 2)
            .modify(|w| w.set_ocm(index % 2, mode));

        if output == PhaseOutput::Float {
            self.pwm.disable(ch);
        } else {
            self.pwm.enable(ch);
        }
    }

    fn apply(&mut self, outputs: [PhaseOutput; 3]) {
        // 先に全相を切ってから再設定し、切替途中の貫通を避ける
        for phase in Phase::ALL {
            self.pwm.disable(channel(phase));
        }
        for phase in Phase::ALL {
            self.set_output(phase, outputs[phase.index()]);
        }
    }

    fn outputs_for(state: DriveState, high: PhaseOutput) -> [PhaseOutput; 3] {
        let mut outputs = [PhaseOutput::Float; 3];
        outputs[state.high.index()] = high;
        outputs[state.low.index()] = PhaseOutput::Low;
        outputs
    }
}

impl PhaseBridge for Tim1Bridge {
    fn set_duty(&mut self, duty: u8) {
        let compare = self.compare(duty);
        self.pwm.set_duty(Channel::Ch1, compare);
        self.pwm.set_duty(Channel::Ch2, compare);
        self.pwm.set_duty(Channel::Ch3, compare);
    }

    fn drive(&mut self, state: DriveState) {
        self.apply(Self::outputs_for(state, PhaseOutput::Pwm));
    }

    fn energize(&mut self, state: DriveState) {
        self.apply(Self::outputs_for(state, PhaseOutput::High));
    }

    fn release(&mut self) {
        self.apply([PhaseOutput::Float; 3]);
    }

    fn brake(&mut self) {
        self.set_duty(0);
        self.apply([PhaseOutput::Low; 3]);
    }
}
