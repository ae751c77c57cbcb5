//! ESCコントローラ
//!
//! ライフサイクル（停止→始動→回転→停止/非常停止）、デューティ制御、
//! タイミングエンジンの割り込み処理、ブザー、コマンド実行をまとめます。
//!
//! ## 使い方
//! - 割り込みハンドラ: ゼロクロスのキャプチャで [`Esc::on_zero_crossing`]、
//!   カウントダウン満了で [`Esc::on_commutation_due`] を呼ぶ
//! - 始動とブザーは時間のかかるシーケンスなので、1ステップずつ進めるAPI
//!   （`spin_up_step` / `buzz_step`）と、`DelayNs` でまとめて実行するAPI
//!   （[`Esc::enable`] / [`Esc::buzz`]）の両方を用意している

use embedded_hal::delay::DelayNs;

use crate::bemf_timing::{CrossingOutcome, TimingEngine};
use crate::buzzer::Buzz;
use crate::commutation::{next_index, CommutationTable, Direction};
use crate::config::EscConfig;
use crate::duty::DutyRequest;
use crate::led::BlinkRequest;
use crate::motor_driver::{BemfComparator, CommutationTimers, Hardware, PhaseBridge};
use crate::protocol::{Action, Command, CommandIndex, Reply, StatusReport};
use crate::rpm::{estimate_rpm, ControlScheme, HoldDuty, RpmRegulator};
use crate::spin_up::SpinUp;
use crate::state::{Lifecycle, MotorState};

/// ライフサイクル操作のエラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LifecycleError {
    /// 始動デューティが最小値未満
    DutyBelowMinimum,
    /// 既に始動中または回転中
    AlreadyRunning,
    /// 非常停止済み
    Halted,
    /// シーケンス実行中に状態が変わった（停止要求など）
    Aborted,
    /// モーター駆動中のためブザー不可
    MotorActive,
}

/// [`Esc::execute`] の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Executed {
    pub reply: Option<Reply>,
    pub blink: Option<BlinkRequest>,
    /// 非常停止した（呼び出し側は停止し続けること）
    pub halt: bool,
}

/// ESCコントローラ
pub struct Esc<'a, B, C, T, R = HoldDuty> {
    state: &'a MotorState,
    config: EscConfig,
    table: CommutationTable,
    hw: Hardware<B, C, T>,
    engine: TimingEngine,
    regulator: R,
    spin_up: Option<SpinUp>,
    /// 始動完了後に適用するデューティ
    start_duty: u8,
    buzz: Option<Buzz>,
}

impl<'a, B, C, T> Esc<'a, B, C, T, HoldDuty>
where
    B: PhaseBridge,
    C: BemfComparator,
    T: CommutationTimers,
{
    /// 起動時に一度だけ呼ぶ
    ///
    /// 回転方向を確定して転流テーブルを選び、ハードウェアを停止（ブレーキ）状態にする。
    pub fn new(
        state: &'a MotorState,
        direction: Direction,
        config: EscConfig,
        hw: Hardware<B, C, T>,
    ) -> Self {
        state.latch_direction(direction);
        state.set_cycles_per_rotation(config.cycles_per_rotation);
        state.set_sequence_step(0);
        state.set_duty(0);
        state.set_half_period(0);
        state.set_lifecycle(Lifecycle::Disabled);

        let mut esc = Self {
            state,
            config,
            table: CommutationTable::new(direction),
            hw,
            engine: TimingEngine::new(config.timing),
            regulator: HoldDuty,
            spin_up: None,
            start_duty: 0,
            buzz: None,
        };
        esc.hw.quiesce();

        info!("ESC initialized: direction={}", direction);
        esc
    }
}

impl<'a, B, C, T, R> Esc<'a, B, C, T, R>
where
    B: PhaseBridge,
    C: BemfComparator,
    T: CommutationTimers,
    R: RpmRegulator,
{
    /// RPM制御方式で使うレギュレータを差し替える
    pub fn with_regulator<R2: RpmRegulator>(self, regulator: R2) -> Esc<'a, B, C, T, R2> {
        Esc {
            state: self.state,
            config: self.config,
            table: self.table,
            hw: self.hw,
            engine: self.engine,
            regulator,
            spin_up: self.spin_up,
            start_duty: self.start_duty,
            buzz: self.buzz,
        }
    }

    pub fn state(&self) -> &'a MotorState {
        self.state
    }

    pub fn config(&self) -> &EscConfig {
        &self.config
    }

    pub fn table(&self) -> &CommutationTable {
        &self.table
    }

    pub fn engine(&self) -> &TimingEngine {
        &self.engine
    }

    pub fn hardware(&self) -> &Hardware<B, C, T> {
        &self.hw
    }

    pub fn hardware_mut(&mut self) -> &mut Hardware<B, C, T> {
        &mut self.hw
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.state.lifecycle()
    }

    // ===== 始動 =====

    /// 始動を開始する（オープンループの強制転流を準備）
    ///
    /// 以後 [`Self::spin_up_step`] が `Ok(None)` を返すまで繰り返し、
    /// [`Self::finish_enable`] で閉ループに移行する。
    pub fn begin_enable(&mut self, start_duty: u8) -> Result<(), LifecycleError> {
        match self.state.lifecycle() {
            Lifecycle::Halted => return Err(LifecycleError::Halted),
            Lifecycle::SpinningUp | Lifecycle::Running => {
                warn!("Enable rejected: motor already running");
                return Err(LifecycleError::AlreadyRunning);
            }
            Lifecycle::Disabled => {}
        }

        let DutyRequest::Apply(duty) = self.config.duty.evaluate(start_duty) else {
            warn!("Enable rejected: duty {} below minimum", start_duty);
            return Err(LifecycleError::DutyBelowMinimum);
        };

        // ブザー中なら打ち切る
        self.buzz = None;
        self.hw.timers.stop();
        self.hw.comparator.disable();

        self.start_duty = duty;
        self.write_duty(self.config.duty.max);
        self.spin_up = Some(SpinUp::new(self.config.spin_up));
        self.state.set_lifecycle(Lifecycle::SpinningUp);

        info!("Spin-up started: start duty={}", duty);
        Ok(())
    }

    /// 強制転流を1ステップ進める
    ///
    /// 転流した場合は次のステップまでの待ち時間 [μs] を返す。
    /// 終了周期に達したら `Ok(None)`。
    pub fn spin_up_step(&mut self) -> Result<Option<u32>, LifecycleError> {
        if self.state.lifecycle() != Lifecycle::SpinningUp {
            self.spin_up = None;
            return Err(LifecycleError::Aborted);
        }

        let Some(spin_up) = self.spin_up.as_mut() else {
            return Err(LifecycleError::Aborted);
        };

        let Some(delay_us) = spin_up.next() else {
            return Ok(None);
        };

        let step = self.state.advance_step();
        self.hw.bridge.drive(self.table.drive(step));
        Ok(Some(delay_us))
    }

    /// 始動を完了し、タイミングエンジンを起動して始動デューティを適用する
    pub fn finish_enable(&mut self) -> Result<(), LifecycleError> {
        if self.state.lifecycle() != Lifecycle::SpinningUp {
            self.spin_up = None;
            return Err(LifecycleError::Aborted);
        }
        self.spin_up = None;

        // 始動が最後に通電したステップのゼロクロスを待つ
        let step = self.state.sequence_step();
        self.hw.timers.start();
        let reference = self.hw.timers.reference_count();
        self.engine.reset(reference);
        self.state.set_half_period(0);
        self.regulator.reset();

        self.hw.comparator.select(self.table.sense(step));
        self.hw.comparator.enable();
        self.hw.timers.arm_capture();

        self.write_duty(self.start_duty);
        self.state.set_lifecycle(Lifecycle::Running);

        info!("Motor running: duty={}", self.start_duty);
        Ok(())
    }

    /// 始動から回転開始までをブロッキングで実行する
    pub fn enable<D: DelayNs>(
        &mut self,
        start_duty: u8,
        delay: &mut D,
    ) -> Result<(), LifecycleError> {
        self.begin_enable(start_duty)?;
        while let Some(delay_us) = self.spin_up_step()? {
            delay.delay_us(delay_us);
        }
        self.finish_enable()
    }

    // ===== 停止 =====

    /// 停止（何度呼んでも同じ結果）
    ///
    /// 全相ブレーキ、コンパレータと両カウンタを停止し、デューティを0にする。
    pub fn disable(&mut self) {
        let was_active = self.state.motor_enabled();

        self.hw.quiesce();
        self.spin_up = None;
        self.buzz = None;
        self.engine.reset(0);
        self.state.set_duty(0);
        self.state.set_half_period(0);

        if self.state.lifecycle() != Lifecycle::Halted {
            self.state.set_lifecycle(Lifecycle::Disabled);
        }

        if was_active {
            info!("Motor disabled");
        }
    }

    /// 非常停止
    ///
    /// 停止後 `Halted` に固定され、以後どの操作も受け付けない。
    /// 割り込みの全停止と無限ループは呼び出し側（ファームウェア）が行う。
    pub fn emergency_stop(&mut self) {
        self.disable();
        self.state.set_lifecycle(Lifecycle::Halted);
        error!("Emergency stop: halted until reset");
    }

    // ===== デューティ =====

    /// デューティを設定する
    ///
    /// 最小値未満なら停止、最大値超ならクランプ。
    pub fn set_duty(&mut self, requested: u8) {
        match self.config.duty.evaluate(requested) {
            DutyRequest::BelowMinimum => {
                debug!("Duty {} below minimum: disabling", requested);
                self.disable();
            }
            DutyRequest::Apply(duty) => match self.state.lifecycle() {
                Lifecycle::Halted => {}
                // 始動中は最大デューティのまま、完了後に適用
                Lifecycle::SpinningUp => self.start_duty = duty,
                Lifecycle::Running | Lifecycle::Disabled => self.write_duty(duty),
            },
        }
    }

    /// アプリケーション（通信・サーボ入力）からのデューティ要求
    ///
    /// RPM制御方式で回転中はレギュレータがデューティを持つため無視する。
    /// 最小値未満（停止要求）は制御方式によらず適用する。
    pub fn request_duty(&mut self, requested: u8) {
        if self.config.duty.evaluate(requested) != DutyRequest::BelowMinimum
            && self.state.control_scheme() == ControlScheme::Rpm
            && self.state.lifecycle() == Lifecycle::Running
        {
            debug!("Duty request {} ignored in RPM scheme", requested);
            return;
        }
        self.set_duty(requested);
    }

    fn write_duty(&mut self, duty: u8) {
        self.hw.bridge.set_duty(duty);
        self.state.set_duty(duty);
    }

    // ===== 設定 =====

    pub fn set_control_scheme(&mut self, scheme: ControlScheme) {
        if self.state.control_scheme() != scheme {
            self.regulator.reset();
            info!("Control scheme: {}", scheme);
        }
        self.state.set_control_scheme(scheme);
    }

    pub fn set_target_rpm(&mut self, rpm: u16) {
        self.state.set_target_rpm(rpm);
    }

    /// 機械角1回転あたりの電気サイクル数を設定する（0は拒否）
    pub fn set_cycles_per_rotation(&mut self, cycles: u8) -> bool {
        if cycles == 0 {
            warn!("Cycles per rotation must be non-zero");
            return false;
        }
        self.state.set_cycles_per_rotation(cycles);
        true
    }

    /// 現在の回転数推定値 [rpm]
    pub fn rpm(&self) -> u32 {
        estimate_rpm(
            self.state.half_period(),
            self.state.cycles_per_rotation(),
            self.config.timing.tick_hz,
        )
    }

    pub fn status(&self) -> StatusReport {
        StatusReport {
            rpm: self.rpm(),
            duty: self.state.duty(),
            lifecycle: self.state.lifecycle(),
            reverse: self.state.direction().is_reverse(),
            scheme: self.state.control_scheme(),
        }
    }

    // ===== タイミングエンジン（割り込みから呼ぶ） =====

    /// ゼロクロスのキャプチャ割り込み
    pub fn on_zero_crossing(&mut self, capture: u32) {
        if self.state.lifecycle() != Lifecycle::Running {
            return;
        }

        match self.engine.on_crossing(capture) {
            CrossingOutcome::Ignored(reason) => {
                trace!("Crossing at {} ignored: {}", capture, reason);
            }
            CrossingOutcome::Armed { half_period } => {
                self.hw.timers.disarm_capture();
                self.hw.timers.arm_countdown(half_period);
                self.state.set_half_period(half_period);

                // 次のステップのゼロクロスに備えて先に切り替える
                let next = next_index(self.state.sequence_step());
                self.hw.comparator.select(self.table.sense(next));
            }
        }
    }

    /// カウントダウン満了（転流）割り込み
    pub fn on_commutation_due(&mut self) {
        if self.state.lifecycle() != Lifecycle::Running {
            return;
        }

        let step = self.state.advance_step();
        self.hw.bridge.drive(self.table.drive(step));

        let reference = self.hw.timers.reference_count();
        let rotation =
            self.engine
                .on_countdown_expired(reference, step, self.state.cycles_per_rotation());
        self.hw.timers.arm_capture();

        if rotation {
            self.state.count_rotation();
            if self.state.control_scheme() == ControlScheme::Rpm {
                self.regulate();
            }
        }
    }

    fn regulate(&mut self) {
        let target = self.state.target_rpm();
        let measured = self.rpm();
        if let Some(duty) = self.regulator.adjust(target, measured, self.state.duty()) {
            trace!("Regulator: target={} measured={} duty={}", target, measured, duty);
            self.set_duty(duty);
        }
    }

    // ===== ブザー =====

    /// ブザーを開始する（停止中のみ）
    pub fn begin_buzz(&mut self, period_us: u32, duration_ms: u32) -> Result<(), LifecycleError> {
        match self.state.lifecycle() {
            Lifecycle::Halted => return Err(LifecycleError::Halted),
            Lifecycle::SpinningUp | Lifecycle::Running => {
                warn!("Buzz refused: motor active");
                return Err(LifecycleError::MotorActive);
            }
            Lifecycle::Disabled => {}
        }

        self.hw.timers.stop();
        self.hw.comparator.disable();
        self.hw.bridge.release();
        self.buzz = Some(Buzz::new(&self.config.buzz, period_us, duration_ms));

        info!("Buzz: period={}us duration={}ms", period_us, duration_ms);
        Ok(())
    }

    /// ブザーを1区間進める
    ///
    /// 区間の長さ [μs] を返す。終了したらブレーキ状態に戻して `Ok(None)`。
    pub fn buzz_step(&mut self) -> Result<Option<u32>, LifecycleError> {
        if self.state.lifecycle() != Lifecycle::Disabled {
            self.buzz = None;
            return Err(LifecycleError::Aborted);
        }

        let Some(buzz) = self.buzz.as_mut() else {
            return Err(LifecycleError::Aborted);
        };

        match buzz.next() {
            Some(phase) => {
                match phase.drive {
                    Some(drive) => self.hw.bridge.energize(drive),
                    None => self.hw.bridge.release(),
                }
                Ok(Some(phase.hold_us))
            }
            None => {
                self.disable();
                Ok(None)
            }
        }
    }

    /// ブザーをブロッキングで鳴らす
    pub fn buzz<D: DelayNs>(
        &mut self,
        period_us: u32,
        duration_ms: u32,
        delay: &mut D,
    ) -> Result<(), LifecycleError> {
        self.begin_buzz(period_us, duration_ms)?;
        while let Some(hold_us) = self.buzz_step()? {
            delay.delay_us(hold_us);
        }
        Ok(())
    }

    // ===== コマンド =====

    /// コマンドの即時効果を適用し、呼び出し側が続けて行う処理を返す
    pub fn apply(&mut self, command: Command) -> Action {
        if self.state.is_halted() {
            return Action::Done;
        }

        debug!("Command: {}", command);

        match command {
            Command::Kill => {
                self.emergency_stop();
                Action::Halt
            }
            Command::Duty(Some(duty)) => {
                if self.state.lifecycle() == Lifecycle::Disabled {
                    Action::Enable(duty)
                } else {
                    self.request_duty(duty);
                    Action::Done
                }
            }
            Command::ControlScheme(Some(raw)) => {
                if let Some(scheme) = ControlScheme::from_u8(raw) {
                    self.set_control_scheme(scheme);
                }
                Action::Done
            }
            Command::TargetRpm(Some(rpm)) => {
                self.set_target_rpm(rpm);
                Action::Done
            }
            Command::CyclesPerRotation(Some(cycles)) => {
                self.set_cycles_per_rotation(cycles);
                Action::Done
            }
            Command::MotorEnable(Some(true)) => Action::Enable(self.config.duty.enable_duty()),
            Command::MotorEnable(Some(false)) => {
                self.disable();
                Action::Done
            }
            Command::Blink(request) => Action::Blink(request),
            Command::Buzz {
                period_us,
                duration_ms,
            } => Action::Buzz {
                period_us: period_us as u32,
                duration_ms: duration_ms as u32,
            },
            Command::Reverse
            | Command::Rpm
            | Command::Duty(None)
            | Command::ControlScheme(None)
            | Command::TargetRpm(None)
            | Command::CyclesPerRotation(None)
            | Command::MotorEnable(None) => Action::Done,
        }
    }

    /// コマンドに対する応答（コマンド実行後の現在値）
    pub fn query(&self, index: CommandIndex) -> Option<Reply> {
        if self.state.is_halted() {
            return None;
        }

        let reply = match index {
            CommandIndex::Kill | CommandIndex::Blink | CommandIndex::Buzz => return None,
            CommandIndex::Reverse => Reply::Reverse(self.state.direction().is_reverse()),
            CommandIndex::Duty => Reply::Duty(self.state.duty()),
            CommandIndex::Rpm => Reply::Rpm(self.rpm()),
            CommandIndex::ControlScheme => Reply::ControlScheme(self.state.control_scheme()),
            CommandIndex::TargetRpm => Reply::TargetRpm(self.state.target_rpm()),
            CommandIndex::CyclesPerRotation => {
                Reply::CyclesPerRotation(self.state.cycles_per_rotation())
            }
            CommandIndex::MotorEnable => Reply::MotorEnabled(self.state.motor_enabled()),
        };

        Some(reply)
    }

    /// コマンドをブロッキングで実行する（始動・ブザーも完了まで待つ）
    pub fn execute<D: DelayNs>(&mut self, command: Command, delay: &mut D) -> Executed {
        let mut executed = Executed::default();

        match self.apply(command) {
            Action::Done => {}
            Action::Enable(duty) => {
                if let Err(e) = self.enable(duty, delay) {
                    warn!("Enable failed: {}", e);
                }
            }
            Action::Buzz {
                period_us,
                duration_ms,
            } => {
                if let Err(e) = self.buzz(period_us, duration_ms, delay) {
                    warn!("Buzz failed: {}", e);
                }
            }
            Action::Blink(request) => executed.blink = Some(request),
            Action::Halt => executed.halt = true,
        }

        executed.reply = self.query(command.index());
        executed
    }
}
