//! センサレスBLDC ESC 制御ライブラリ
//!
//! 6ステップ転流とBEMFゼロクロス検出によるセンサレス駆動のハードウェア非依存部分です。
//! ハードウェアは [`motor_driver`] のトレイト経由でのみ操作するため、
//! ホスト上で `cargo test` できます。
//!
//! ## 構成
//! - [`commutation`]: 6ステップ転流テーブル（駆動相・BEMF検出設定）
//! - [`duty`]: デューティの上下限判定
//! - [`spin_up`]: オープンループ始動
//! - [`bemf_timing`]: 2カウンタ方式のゼロクロス タイミングエンジン
//! - [`rpm`]: 回転数推定と制御方式
//! - [`esc`]: ライフサイクル・割り込み処理・コマンド実行
//! - [`protocol`]: バイナリ（CAN）/テキスト（UART）コマンド
//! - [`buzzer`], [`led`], [`servo_input`]: 周辺機能

#![cfg_attr(not(test), no_std)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod bemf_timing;
pub mod buzzer;
pub mod commutation;
pub mod config;
pub mod duty;
pub mod esc;
pub mod led;
pub mod motor_driver;
pub mod protocol;
pub mod rpm;
pub mod servo_input;
pub mod spin_up;
pub mod state;

#[cfg(test)]
mod mock;

pub use commutation::Direction;
pub use config::EscConfig;
pub use esc::{Esc, LifecycleError};
pub use motor_driver::{BemfComparator, CommutationTimers, Hardware, PhaseBridge};
pub use state::{Lifecycle, MotorState};
