//! モーター制御の設定パラメータ（デフォルト値）

/// 電気サイクル数 / 機械1回転（ポール数4 / 2 = 2）（デフォルト値）
pub const DEFAULT_CYCLES_PER_ROTATION: u8 = 2;

/// PWMデューティ（0 - MAX_DUTY の単位）
pub mod duty {
    /// 最大デューティ（PWM周期のフルスケール）
    pub const MAX_DUTY: u8 = 249;

    /// 最小デューティ（これ未満の要求はモーター停止）
    pub const MIN_DUTY: u8 = 15;
}

/// オープンループ始動（強制転流）パラメータ
pub mod spin_up {
    /// 初期ステップ周期 [μs]
    pub const START_PERIOD_US: u32 = 5000;

    /// 終了ステップ周期 [μs]（この周期以下でBEMF検出に移行）
    pub const END_PERIOD_US: u32 = 500;

    /// 周期の減少量 [μs]
    pub const PERIOD_DECREMENT_US: u32 = 10;

    /// 周期を短縮するまでのステップ数
    pub const STEPS_PER_INCREMENT: u8 = 6;
}

/// ゼロクロスタイミングエンジン（基準カウンタ + ワンショットカウンタ）
pub mod timing {
    /// カウンタクロック [Hz]（両カウンタ共通、1 tick = 1μs）
    pub const TICK_HZ: u32 = 1_000_000;

    /// 基準カウンタの範囲（16ビット）
    pub const COUNTER_RANGE: u32 = 0x1_0000;

    /// 転流直後のスイッチングノイズを無視する区間 [tick]
    pub const DEBOUNCE_TICKS: u32 = 50;
}

/// ブザー（モーター巻線を使った発音）
pub mod buzz {
    /// 最小トーン周期 [μs]
    pub const MIN_PERIOD_US: u32 = 200;

    /// 最大トーン周期 [μs]
    pub const MAX_PERIOD_US: u32 = 2000;

    /// パルスのオン時間 [μs]
    pub const HOLD_ON_US: u32 = 50;
}

/// サーボPWM入力（外部制御信号）
pub mod servo {
    /// パルス幅の下限 [μs]（デューティ0）
    pub const PULSE_MIN_US: u32 = 1000;

    /// パルス幅の上限 [μs]（最大デューティ）
    pub const PULSE_MAX_US: u32 = 2000;

    /// 信号途絶タイムアウト [μs]
    pub const TIMEOUT_US: u64 = 1_000_000;
}

/// コマンドプロトコル
pub mod protocol {
    /// デバイスアドレスの基準値（ストラップ3ビットを加算）
    pub const BASE_ADDRESS: u8 = 10;
}
