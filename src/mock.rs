//! テスト用のハードウェアモック
//!
//! 呼び出しを記録するだけのフェイク実装です。

use embedded_hal::delay::DelayNs;

use crate::commutation::{DriveState, SenseConfig};
use crate::motor_driver::{BemfComparator, CommutationTimers, Hardware, PhaseBridge};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeEvent {
    SetDuty(u8),
    Drive(DriveState),
    Energize(DriveState),
    Release,
    Brake,
}

#[derive(Debug, Default)]
pub struct MockBridge {
    pub events: Vec<BridgeEvent>,
    pub duty: u8,
    pub braked: bool,
}

impl MockBridge {
    pub fn drive_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, BridgeEvent::Drive(_)))
            .count()
    }

    pub fn last_drive(&self) -> Option<DriveState> {
        self.events.iter().rev().find_map(|e| match e {
            BridgeEvent::Drive(state) => Some(*state),
            _ => None,
        })
    }
}

impl PhaseBridge for MockBridge {
    fn set_duty(&mut self, duty: u8) {
        self.duty = duty;
        self.events.push(BridgeEvent::SetDuty(duty));
    }

    fn drive(&mut self, state: DriveState) {
        self.braked = false;
        self.events.push(BridgeEvent::Drive(state));
    }

    fn energize(&mut self, state: DriveState) {
        self.braked = false;
        self.events.push(BridgeEvent::Energize(state));
    }

    fn release(&mut self) {
        self.braked = false;
        self.events.push(BridgeEvent::Release);
    }

    fn brake(&mut self) {
        self.braked = true;
        self.events.push(BridgeEvent::Brake);
    }
}

#[derive(Debug, Default)]
pub struct MockComparator {
    pub enabled: bool,
    pub selected: Option<SenseConfig>,
}

impl BemfComparator for MockComparator {
    fn enable(&mut self) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
    }

    fn select(&mut self, sense: SenseConfig) {
        self.selected = Some(sense);
    }
}

#[derive(Debug, Default)]
pub struct MockTimers {
    pub running: bool,
    pub reference: u32,
    pub capture_armed: bool,
    pub countdown: Option<u32>,
}

impl CommutationTimers for MockTimers {
    fn start(&mut self) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
        self.capture_armed = false;
        self.countdown = None;
    }

    fn reference_count(&mut self) -> u32 {
        self.reference
    }

    fn arm_capture(&mut self) {
        self.capture_armed = true;
    }

    fn disarm_capture(&mut self) {
        self.capture_armed = false;
    }

    fn arm_countdown(&mut self, ticks: u32) {
        self.countdown = Some(ticks);
    }
}

pub type MockHardware = Hardware<MockBridge, MockComparator, MockTimers>;

pub fn hardware() -> MockHardware {
    Hardware::new(
        MockBridge::default(),
        MockComparator::default(),
        MockTimers::default(),
    )
}

/// 待ち時間を積算するだけのディレイ
#[derive(Debug, Default)]
pub struct MockDelay {
    pub total_ns: u64,
}

impl MockDelay {
    pub fn total_us(&self) -> u64 {
        self.total_ns / 1000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += ns as u64;
    }
}
