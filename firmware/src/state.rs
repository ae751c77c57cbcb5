//! グローバル共有状態管理
//!
//! - `MOTOR_STATE`: 割り込みとタスクで共有するモーター状態（アトミック）
//! - `ESC`: ハードウェアを所有するコントローラ。タイマー割り込みとタスクから
//!   クリティカルセクション内で短時間だけ借用する
//! - チャネル/シグナル: 通信タスク → モーター制御タスク → 応答先

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use g4_esc::led::BlinkRequest;
use g4_esc::protocol::{Command, Reply};
use g4_esc::{Esc, MotorState};

use crate::bemf_tim::BemfTimers;
use crate::comparator::BemfComparators;
use crate::motor_driver::Tim1Bridge;

pub type FirmwareEsc = Esc<'static, Tim1Bridge, BemfComparators, BemfTimers>;

/// モーター状態
pub static MOTOR_STATE: MotorState = MotorState::new();

/// ESCコントローラ（起動時に `install` する）
static ESC: Mutex<CriticalSectionRawMutex, RefCell<Option<FirmwareEsc>>> =
    Mutex::new(RefCell::new(None));

/// コマンドの送信元（応答の返し先）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Origin {
    Can,
    Uart,
}

/// モーター制御タスクへのコマンド
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Request {
    pub command: Command,
    pub origin: Origin,
}

/// 受信コマンド
pub static COMMANDS: Channel<CriticalSectionRawMutex, Request, 8> = Channel::new();

/// CANへの応答
pub static CAN_REPLIES: Channel<CriticalSectionRawMutex, Reply, 4> = Channel::new();

/// UARTへの応答
pub static UART_REPLIES: Channel<CriticalSectionRawMutex, Reply, 4> = Channel::new();

/// UARTで受理を表示するコマンド（応答を持たないもの）
pub static UART_ACKS: Channel<CriticalSectionRawMutex, Command, 4> = Channel::new();

/// LED点滅要求
pub static BLINK: Signal<CriticalSectionRawMutex, BlinkRequest> = Signal::new();

pub fn install(esc: FirmwareEsc) {
    ESC.lock(|cell| cell.replace(Some(esc)));
}

/// ESCを借用して処理する（未初期化なら `None`）
///
/// クリティカルセクション内で実行されるので、`f` は短時間で終わること。
/// 転流割り込みはこの間待たされるため、`f` の中で待機やシーケンス全体の実行をしてはいけない
/// （始動・ブザーは1ステップずつ呼ぶ）。
pub fn with_esc<R>(f: impl FnOnce(&mut FirmwareEsc) -> R) -> Option<R> {
    ESC.lock(|cell| cell.borrow_mut().as_mut().map(f))
}

/// 応答を送信元のチャネルに渡す（満杯なら捨てる）
pub fn respond(origin: Origin, reply: Reply) {
    let channel = match origin {
        Origin::Can => &CAN_REPLIES,
        Origin::Uart => &UART_REPLIES,
    };
    let _ = channel.try_send(reply);
}
