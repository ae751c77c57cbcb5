//! LED制御タスク
//!
//! - LED1 (PC13): 点滅要求の表示
//! - LED2 (PC14): モーター有効（始動中・回転中）で点灯
//! - LED3 (PC15): 非常停止で点灯（`hardware::halt` が直接点灯する）

use embassy_futures::select::{select, Either};
use embassy_stm32::gpio::Output;
use embassy_time::{Duration, Timer};
use g4_esc::led::Blink;

use crate::state::{BLINK, MOTOR_STATE};

/// 状態表示の更新周期
const STATUS_PERIOD: Duration = Duration::from_millis(50);

/// LED制御タスク
#[embassy_executor::task]
pub async fn led_task(
    mut led1: Output<'static>,
    mut led2: Output<'static>,
    mut led3: Output<'static>,
) {
    info!("LED task started");

    led1.set_low();
    led2.set_low();
    led3.set_low();

    loop {
        led2.set_level(MOTOR_STATE.motor_enabled().into());

        let request = match select(BLINK.wait(), Timer::after(STATUS_PERIOD)).await {
            Either::First(request) => request,
            Either::Second(()) => continue,
        };

        debug!("Blink: {}", request);
        let blink = Blink::new(request);
        if let Some(on) = blink.initial() {
            led1.set_level(on.into());
        }
        for step in blink {
            Timer::after_millis(step.wait_ms as u64).await;
            led1.set_level(step.led_on.into());
            led2.set_level(MOTOR_STATE.motor_enabled().into());
        }
    }
}
