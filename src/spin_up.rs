//! オープンループ始動（強制転流）
//!
//! 低速ではBEMFの振幅が小さくゼロクロスを検出できないため、始動時は
//! フィードバック無しで一定間隔の強制転流を行い、間隔を徐々に短くして加速させます。
//! `STEPS_PER_INCREMENT` ステップごとに周期を `PERIOD_DECREMENT_US` だけ短縮し、
//! 周期が終了周期以下になったらBEMF制御（タイミングエンジン）に引き渡します。

/// 始動ランプのパラメータ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpinUpProfile {
    /// 初期ステップ周期 [μs]
    pub start_period_us: u32,
    /// 終了ステップ周期 [μs]
    pub end_period_us: u32,
    /// 周期の減少量 [μs]
    pub period_decrement_us: u32,
    /// 周期を短縮するまでのステップ数
    pub steps_per_increment: u8,
}

impl SpinUpProfile {
    /// 周期短縮の回数
    pub fn increments(&self) -> u32 {
        if self.period_decrement_us == 0 || self.steps_per_increment == 0 {
            return 0;
        }
        self.start_period_us
            .saturating_sub(self.end_period_us)
            .div_ceil(self.period_decrement_us)
    }

    /// 強制転流の総ステップ数
    pub fn total_steps(&self) -> u32 {
        self.increments() * self.steps_per_increment as u32
    }
}

/// 始動シーケンス
///
/// イテレータとして1ステップごとの待ち時間 [μs] を返します。
/// 呼び出し側は各ステップで転流を1つ進め、返された時間だけ待ちます。
#[derive(Debug, Clone)]
pub struct SpinUp {
    period_us: u32,
    end_period_us: u32,
    period_decrement_us: u32,
    steps_per_increment: u8,
    step_in_increment: u8,
}

impl SpinUp {
    pub fn new(profile: SpinUpProfile) -> Self {
        // 減少量0では終わらないので空のシーケンスにする
        let start = if profile.increments() == 0 {
            profile.end_period_us
        } else {
            profile.start_period_us
        };

        Self {
            period_us: start,
            end_period_us: profile.end_period_us,
            period_decrement_us: profile.period_decrement_us,
            steps_per_increment: profile.steps_per_increment,
            step_in_increment: 0,
        }
    }

    /// 現在のステップ周期 [μs]
    pub fn period_us(&self) -> u32 {
        self.period_us
    }

    /// 終了周期に到達したか
    pub fn is_finished(&self) -> bool {
        self.period_us <= self.end_period_us
    }
}

impl Iterator for SpinUp {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.is_finished() {
            return None;
        }

        let delay = self.period_us;
        self.step_in_increment += 1;
        if self.step_in_increment >= self.steps_per_increment {
            self.step_in_increment = 0;
            self.period_us = self.period_us.saturating_sub(self.period_decrement_us);
        }

        Some(delay)
    }
}
