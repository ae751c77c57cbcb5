//! Configuration module
//!
//! ボード固有の設定（PWM・CAN・UART・割り込み優先度）と、
//! ライブラリ側の制御パラメータの再エクスポート。
//! 設定はすべてコンパイル時定数で、永続化はしません。

pub mod params;

// params.rsから主要な定数を再エクスポート
pub use params::*;
