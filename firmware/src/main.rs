#![no_std]
#![no_main]

// This mod MUST go first, so that the others see its macros.
mod fmt;

mod bemf_tim;
mod comparator;
mod config;
mod hardware;
mod motor_driver;
mod state;
mod tasks;

#[cfg(not(feature = "defmt"))]
use panic_halt as _;
#[cfg(feature = "defmt")]
use {defmt_rtt as _, panic_probe as _};

use embassy_executor::Spawner;
use embassy_stm32::{
    can,
    gpio::{Input, Level, Output, OutputType, Pull, Speed},
    timer::{
        complementary_pwm::{ComplementaryPwm, ComplementaryPwmPin},
        low_level::CountingMode,
        simple_pwm::PwmPin,
    },
    usart::{self, Uart},
};
use g4_esc::{EscConfig, Hardware};

use bemf_tim::BemfTimers;
use comparator::BemfComparators;
use hardware::Irqs;
use motor_driver::Tim1Bridge;
use state::MOTOR_STATE;
use tasks::{can_task, led_task, motor_control_task, uart_rx_task, uart_tx_task};

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // ハードウェア初期化
    let config = hardware::create_clock_config();
    let p = embassy_stm32::init(config);

    info!("═══════════════════════════════════════════════════════════");
    info!("");
    info!("    ██████╗ ██╗  ██╗    ███████╗███████╗ ██████╗");
    info!("   ██╔════╝ ██║  ██║    ██╔════╝██╔════╝██╔════╝");
    info!("   ██║  ███╗███████║    █████╗  ███████╗██║     ");
    info!("   ██║   ██║╚════██║    ██╔══╝  ╚════██║██║     ");
    info!("   ╚██████╔╝     ██║    ███████╗███████║╚██████╗");
    info!("    ╚═════╝      ╚═╝    ╚══════╝╚══════╝ ╚═════╝");
    info!("");
    info!("     Sensorless BLDC ESC • STM32G431VB @ 170MHz");
    info!("");
    info!("═══════════════════════════════════════════════════════════");

    // ストラップ（起動時に一度だけ読む）
    let straps = {
        let direction = Input::new(p.PC4, Pull::Up);
        let a0 = Input::new(p.PC0, Pull::Up);
        let a1 = Input::new(p.PC1, Pull::Up);
        let a2 = Input::new(p.PC2, Pull::Up);
        hardware::read_straps(&direction, [&a0, &a1, &a2])
    };

    // LED初期化＆タスク起動
    let led1 = Output::new(p.PC13, Level::Low, Speed::Low);
    let led2 = Output::new(p.PC14, Level::Low, Speed::Low);
    let led3 = Output::new(p.PC15, Level::Low, Speed::Low);
    unwrap!(spawner.spawn(led_task(led1, led2, led3)));

    // PWM初期化（TIM1、3相補完PWM）
    let mut uvw_pwm = ComplementaryPwm::new(
        p.TIM1,
        Some(PwmPin::new(p.PE9, OutputType::PushPull)),
        Some(ComplementaryPwmPin::new(p.PE8, OutputType::PushPull)),
        Some(PwmPin::new(p.PE11, OutputType::PushPull)),
        Some(ComplementaryPwmPin::new(p.PE10, OutputType::PushPull)),
        Some(PwmPin::new(p.PE13, OutputType::PushPull)),
        Some(ComplementaryPwmPin::new(p.PE12, OutputType::PushPull)),
        None,
        None,
        config::pwm::FREQUENCY,
        CountingMode::EdgeAlignedUp,
    );
    uvw_pwm.set_dead_time(config::pwm::DEAD_TIME);
    let bridge = Tim1Bridge::new(uvw_pwm);

    // BEMFコンパレータとタイミング用カウンタ（PAC直接操作）
    let comparators = unsafe { BemfComparators::new() };
    let timers = unsafe { BemfTimers::new() };

    // ESC初期化（ブレーキ状態で待機）
    let esc = g4_esc::Esc::new(
        &MOTOR_STATE,
        straps.direction,
        EscConfig::default(),
        Hardware::new(bridge, comparators, timers),
    );
    state::install(esc);

    // CAN初期化＆タスク起動
    let mut can_configurator = can::CanConfigurator::new(p.FDCAN1, p.PA11, p.PA12, Irqs);
    can_configurator.properties().set_standard_filter(
        can::filter::StandardFilterSlot::_0,
        can::filter::StandardFilter::accept_all_into_fifo0(),
    );
    can_configurator.set_bitrate(config::can::BITRATE);
    let can = can_configurator.start(can::OperatingMode::NormalOperationMode);
    unwrap!(spawner.spawn(can_task(can, straps.address)));

    // UART初期化＆タスク起動
    let mut uart_config = usart::Config::default();
    uart_config.baudrate = config::uart::BAUDRATE;
    let uart = unwrap!(Uart::new(
        p.USART2,
        p.PA3,
        p.PA2,
        Irqs,
        p.DMA1_CH1,
        p.DMA1_CH2,
        uart_config,
    ));
    let (uart_tx, uart_rx) = uart.split();
    unwrap!(spawner.spawn(uart_tx_task(uart_tx)));
    unwrap!(spawner.spawn(uart_rx_task(uart_rx)));

    // サーボPWM入力（PB5）
    #[cfg(feature = "servo-input")]
    {
        use embassy_stm32::exti::ExtiInput;

        let servo_pin = ExtiInput::new(p.PB5, p.EXTI5, Pull::Down);
        unwrap!(spawner.spawn(tasks::servo_input_task(servo_pin)));
    }

    info!("Starting sensorless ESC control...");

    // モーター制御タスクを起動
    unwrap!(spawner.spawn(motor_control_task()));
}
