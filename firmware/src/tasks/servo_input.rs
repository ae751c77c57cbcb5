//! サーボPWM入力タスク（PB5）
//!
//! 1000 - 2000μs のパルス幅をデューティ要求に変換します。
//! 一度信号を受けた後に1秒途絶えると非常停止します。

use embassy_futures::select::{select, Either};
use embassy_stm32::exti::ExtiInput;
use embassy_time::{Instant, Timer};
use g4_esc::config::duty::MAX_DUTY;
use g4_esc::servo_input::{ServoConfig, ServoInput};

use crate::hardware;
use crate::state::with_esc;

/// サーボPWM入力タスク
#[embassy_executor::task]
pub async fn servo_input_task(mut pin: ExtiInput<'static>) {
    info!("Servo input task started");

    let mut servo = ServoInput::new(ServoConfig::new(MAX_DUTY));

    loop {
        let edge = match servo.deadline_us() {
            Some(deadline) => {
                let timeout = Timer::at(Instant::from_micros(deadline + 1));
                match select(pin.wait_for_any_edge(), timeout).await {
                    Either::First(()) => true,
                    Either::Second(()) => false,
                }
            }
            None => {
                pin.wait_for_any_edge().await;
                true
            }
        };

        let now = Instant::now().as_micros();

        if !edge {
            if servo.is_timed_out(now) {
                error!("Servo signal lost");
                with_esc(|esc| esc.emergency_stop());
                hardware::halt();
            }
            continue;
        }

        if pin.is_high() {
            servo.on_rising(now);
        } else if let Some(duty) = servo.on_falling(now) {
            with_esc(|esc| esc.request_duty(duty));
        }
    }
}
