//! ハードウェア初期化モジュール
//!
//! クロック設定、割り込みバインド、ストラップピン読み取り、非常停止時の停止処理。

use embassy_stm32::{bind_interrupts, can, gpio::Input, pac, peripherals, usart, Config};
use g4_esc::config::protocol::BASE_ADDRESS;
use g4_esc::Direction;

// CAN・UARTの割り込みをバインド
bind_interrupts!(pub struct Irqs {
    FDCAN1_IT0 => can::IT0InterruptHandler<peripherals::FDCAN1>;
    FDCAN1_IT1 => can::IT1InterruptHandler<peripherals::FDCAN1>;
    USART2 => usart::InterruptHandler<peripherals::USART2>;
});

/// RCCクロック設定を初期化
///
/// HSI → PLL（÷4 × 85 ÷ 2）で170MHz生成
pub fn create_clock_config() -> Config {
    let mut config = Config::default();
    {
        use embassy_stm32::rcc::mux::{ClockMux, Fdcansel};
        use embassy_stm32::rcc::{Pll, PllMul, PllPreDiv, PllQDiv, PllRDiv, PllSource, Sysclk};

        config.rcc.hsi = true;
        config.rcc.pll = Some(Pll {
            source: PllSource::HSI,
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL85,
            divp: None,
            divq: Some(PllQDiv::DIV2), // FDCANクロック用
            divr: Some(PllRDiv::DIV2),
        });
        config.rcc.sys = Sysclk::PLL1_R;

        let mut clock_mux = ClockMux::default();
        clock_mux.fdcansel = Fdcansel::PLL1_Q;
        config.rcc.mux = clock_mux;
    }
    config
}

/// 起動時に一度だけ読むストラップ設定
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Straps {
    pub direction: Direction,
    /// デバイスアドレス（BASE_ADDRESS + 3ビット）
    pub address: u8,
}

/// ストラップピンを読む
///
/// いずれもプルアップ入力で、GNDに落とすと1（反転論理）。
/// - 回転方向: PC4（ジャンパありで逆転）
/// - アドレス: PC0 = bit0, PC1 = bit1, PC2 = bit2
pub fn read_straps(direction: &Input<'_>, address: [&Input<'_>; 3]) -> Straps {
    let direction = if direction.is_low() {
        Direction::Reverse
    } else {
        Direction::Forward
    };

    let offset = address
        .iter()
        .enumerate()
        .fold(0u8, |acc, (bit, pin)| acc | ((pin.is_low() as u8) << bit));

    let straps = Straps {
        direction,
        address: BASE_ADDRESS + offset,
    };
    info!(
        "Straps: direction={}, address={}",
        straps.direction, straps.address
    );
    straps
}

/// 非常停止後の恒久停止
///
/// 非常停止LED（PC15）を点灯し、全割り込みを禁止して停止し続ける。
/// 復帰はリセットのみ。
pub fn halt() -> ! {
    error!("System halted");
    pac::GPIOC.bsrr().write(|w| w.set_bs(15, true));
    cortex_m::interrupt::disable();
    loop {
        cortex_m::asm::wfi();
    }
}
