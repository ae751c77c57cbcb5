//! UART通信タスク（テキストコマンド）
//!
//! USART2（PA2 = TX, PA3 = RX, 115200bps）。アイドル検出で1行ずつ受信し、
//! 応答は人が読める1行のテキストで返します。受信と送信は別タスクです。

use embassy_futures::select::{select, Either};
use embassy_stm32::mode::Async;
use embassy_stm32::usart::{UartRx, UartTx};
use g4_esc::protocol::text::{format_acknowledge, format_reply, parse_line, LINE_CAPACITY};

use crate::state::{Origin, Request, COMMANDS, UART_ACKS, UART_REPLIES};

/// UART受信タスク
#[embassy_executor::task]
pub async fn uart_rx_task(mut rx: UartRx<'static, Async>) {
    info!("UART RX task started");

    let mut buf = [0u8; LINE_CAPACITY];

    loop {
        let len = match rx.read_until_idle(&mut buf).await {
            Ok(len) => len,
            Err(_e) => {
                warn!("UART RX error");
                continue;
            }
        };

        let Some(command) = parse_line(&buf[..len]) else {
            continue;
        };

        if format_acknowledge(&command).is_some() {
            let _ = UART_ACKS.try_send(command);
        }
        COMMANDS
            .send(Request {
                command,
                origin: Origin::Uart,
            })
            .await;
    }
}

/// UART送信タスク
#[embassy_executor::task]
pub async fn uart_tx_task(mut tx: UartTx<'static, Async>) {
    info!("UART TX task started");

    loop {
        let line = match select(UART_ACKS.receive(), UART_REPLIES.receive()).await {
            Either::First(command) => match format_acknowledge(&command) {
                Some(line) => line,
                None => continue,
            },
            Either::Second(reply) => format_reply(&reply),
        };

        if tx.write(line.as_bytes()).await.is_err() || tx.write(b"\r\n").await.is_err() {
            warn!("UART TX error");
        }
    }
}
