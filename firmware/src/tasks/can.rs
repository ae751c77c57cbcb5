//! CAN通信タスク
//!
//! バイナリコマンドの受信・応答送信と、ステータスの周期送信を行います。
//!
//! | ID                     | 方向 | 内容                                  |
//! |------------------------|------|---------------------------------------|
//! | 0x300 + アドレス       | 受信 | `[index, payload...]`                 |
//! | 0x380 + アドレス       | 送信 | `[index, value...]`                   |
//! | 0x200 + アドレス       | 送信 | ステータス（100ms周期）               |

use embassy_futures::select::{select3, Either3};
use embassy_stm32::can;
use embassy_time::{Duration, Ticker};
use embedded_can::{Id, StandardId};
use g4_esc::protocol::binary::{can_ids, encode_reply, encode_status, parse_frame};

use crate::config;
use crate::state::{with_esc, Origin, Request, CAN_REPLIES, COMMANDS};

async fn send(tx: &mut can::CanTx<'static>, id: u32, data: &[u8]) {
    let Some(std_id) = StandardId::new(id as u16) else {
        return;
    };
    if let Ok(frame) = can::frame::Frame::new_data(Id::Standard(std_id), data) {
        let _ = tx.write(&frame).await;
    }
}

/// CAN通信タスク - コマンド受信・応答とステータス送信
#[embassy_executor::task]
pub async fn can_task(can: can::Can<'static>, address: u8) {
    let (mut tx, mut rx, _properties) = can.split();

    let request_id = can_ids::request(address);
    info!("CAN task started: request id 0x{:03X}", request_id);

    // ステータス送信用タイマー（100ms周期）
    let mut status_ticker = Ticker::every(Duration::from_millis(config::can::STATUS_PERIOD_MS));

    loop {
        match select3(rx.read(), status_ticker.next(), CAN_REPLIES.receive()).await {
            Either3::First(Ok(envelope)) => {
                let frame = envelope.frame;

                // IDを数値として取得
                let id_raw = match frame.header().id() {
                    Id::Standard(std_id) => std_id.as_raw() as u32,
                    Id::Extended(ext_id) => ext_id.as_raw(),
                };
                if id_raw != request_id {
                    continue;
                }

                match parse_frame(frame.data()) {
                    Some(command) => {
                        COMMANDS
                            .send(Request {
                                command,
                                origin: Origin::Can,
                            })
                            .await
                    }
                    None => debug!("Ignored CAN frame: {}", frame.data()),
                }
            }
            Either3::First(Err(_e)) => {
                // error!("CAN RX Error: {:?}", _e);
            }
            Either3::Second(()) => {
                if let Some(status) = with_esc(|esc| esc.status()) {
                    send(&mut tx, can_ids::status(address), &encode_status(&status)).await;
                }
            }
            Either3::Third(reply) => {
                let frame = encode_reply(reply);
                send(&mut tx, can_ids::response(address), frame.as_bytes()).await;
            }
        }
    }
}
