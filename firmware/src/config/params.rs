//! ボード固有の設定パラメータ

// 制御パラメータ（デューティ範囲・始動・タイミングなど）はライブラリ側のデフォルト値を使う
pub use g4_esc::config::params::*;

/// CPUクロック [Hz]（HSI → PLL 170MHz）
pub const SYSCLK_HZ: u32 = 170_000_000;

/// PWM設定
pub mod pwm {
    use embassy_stm32::time::Hertz;

    /// PWM周波数（20kHz）
    pub const FREQUENCY: Hertz = Hertz(20_000);

    /// デッドタイム
    pub const DEAD_TIME: u16 = 100;
}

/// CAN設定
pub mod can {
    /// CANビットレート（250kbps）
    pub const BITRATE: u32 = 250_000;

    /// ステータス送信周期 [ms]
    pub const STATUS_PERIOD_MS: u64 = 100;
}

/// UART設定（テキストコマンド）
pub mod uart {
    /// ボーレート
    pub const BAUDRATE: u32 = 115_200;
}

/// 割り込み優先度（上位4ビット、値が小さいほど高優先）
pub mod irq {
    /// 転流（TIM6カウントダウン満了）
    pub const COMMUTATION_PRIORITY: u8 = 0x10;

    /// ゼロクロス（TIM4キャプチャ）
    pub const ZERO_CROSSING_PRIORITY: u8 = 0x20;
}
