//! BEMFコンパレータ（COMP1/COMP2/COMP4）
//!
//! 各相の分圧入力を仮想中性点と比較し、選択中のコンパレータ出力を
//! TIM4 の TI1 に接続します（TISEL）。
//!
//! ## ハードウェア構成
//! | 相 | コンパレータ | 非反転入力 | 反転入力（中性点） | TIM4 TI1SEL |
//! |----|--------------|------------|--------------------|-------------|
//! | A  | COMP1        | PA1        | PA4                | 1           |
//! | B  | COMP2        | PA7        | PA5                | 2           |
//! | C  | COMP4        | PB0        | PB2                | 4           |

use embassy_stm32::pac;
use g4_esc::commutation::{Phase, SenseConfig};
use g4_esc::BemfComparator;

/// ヒステリシス 10mV
const HYSTERESIS: u8 = 0b001;

struct CompChannel {
    regs: pac::comp::Comp,
    /// 中性点入力の INMSEL 値
    inmsel: u8,
    /// TIM4_TISEL の TI1SEL 値
    ti1sel: u8,
}

const fn channel(phase: Phase) -> CompChannel {
    match phase {
        Phase::A => CompChannel {
            regs: pac::COMP1,
            inmsel: 0b110, // PA4
            ti1sel: 1,
        },
        Phase::B => CompChannel {
            regs: pac::COMP2,
            inmsel: 0b110, // PA5
            ti1sel: 2,
        },
        Phase::C => CompChannel {
            regs: pac::COMP4,
            inmsel: 0b111, // PB2
            ti1sel: 4,
        },
    }
}

/// BEMFコンパレータ一式
pub struct BemfComparators {
    enabled: bool,
    selected: Option<SenseConfig>,
}

impl BemfComparators {
    /// GPIOをアナログ入力にして各コンパレータを設定する（無効状態）
    ///
    /// # Safety
    /// PACを使用した直接レジスタ操作を含む。COMP1/2/4 と該当ピンを他で使わないこと。
    pub unsafe fn new() -> Self {
        let rcc = pac::RCC;
        rcc.ahb2enr().modify(|w| {
            w.set_gpioaen(true);
            w.set_gpioben(true);
        });
        rcc.apb2enr().modify(|w| w.set_syscfgen(true)); // COMPはSYSCFGクロック

        // PA1, PA4, PA5, PA7, PB0, PB2: アナログ
        for pin in [1, 4, 5, 7] {
            pac::GPIOA
                .moder()
                .modify(|w| w.set_moder(pin, pac::gpio::vals::Moder::ANALOG));
        }
        for pin in [0, 2] {
            pac::GPIOB
                .moder()
                .modify(|w| w.set_moder(pin, pac::gpio::vals::Moder::ANALOG));
        }

        for phase in Phase::ALL {
            let ch = channel(phase);
            ch.regs.csr().write(|w| {
                w.set_en(false);
                w.set_inmsel(ch.inmsel);
                w.set_inpsel(false); // INP = PA1 / PA7 / PB0
                w.set_hyst(HYSTERESIS);
            });
        }

        Self {
            enabled: false,
            selected: None,
        }
    }

    fn configure(&self, sense: SenseConfig) {
        for phase in Phase::ALL {
            let ch = channel(phase);
            let active = self.enabled && phase == sense.phase;
            ch.regs.csr().modify(|w| {
                w.set_en(active);
                // 立ち下がり待ちは出力を反転し、キャプチャは常に立ち上がりで受ける
                w.set_pol(sense.inverted());
            });
        }

        let ti1sel = channel(sense.phase).ti1sel;
        pac::TIM4.tisel().modify(|w| w.set_ti1sel(ti1sel));
    }
}

impl BemfComparator for BemfComparators {
    fn enable(&mut self) {
        self.enabled = true;
        if let Some(sense) = self.selected {
            self.configure(sense);
        }
    }

    fn disable(&mut self) {
        self.enabled = false;
        for phase in Phase::ALL {
            channel(phase).regs.csr().modify(|w| w.set_en(false));
        }
    }

    fn select(&mut self, sense: SenseConfig) {
        self.selected = Some(sense);
        self.configure(sense);
    }
}
