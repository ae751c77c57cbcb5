//! タスクモジュール
//!
//! 各タスクの実装を分離して管理します。

pub mod can;
pub mod led;
pub mod motor_control;
#[cfg(feature = "servo-input")]
pub mod servo_input;
pub mod uart;

// タスク関数を再エクスポート
pub use can::can_task;
pub use led::led_task;
pub use motor_control::motor_control_task;
#[cfg(feature = "servo-input")]
pub use servo_input::servo_input_task;
pub use uart::{uart_rx_task, uart_tx_task};
