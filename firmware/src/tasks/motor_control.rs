//! モーター制御タスク
//!
//! 通信タスクから受け取ったコマンドを ESC に適用し、時間のかかる処理
//! （始動・ブザー）を1ステップずつ進めてから応答を返します。
//! ステップの待ち時間中もコマンドを受信して適用するので、始動中・ブザー中の
//! 停止（Kill / MotorEnable=0 / 最小値未満のデューティ）は次のステップで反映されます。
//! 各ステップの間は ESC のロックを解放するので、その間も割り込みと他タスクは動けます。

use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Instant, Timer};
use g4_esc::protocol::Action;
use g4_esc::LifecycleError;

use crate::hardware;
use crate::state::{self, with_esc, FirmwareEsc, Request, BLINK, COMMANDS};

/// ESC未初期化は中断扱い
fn esc_step<T>(
    f: impl FnOnce(&mut FirmwareEsc) -> Result<T, LifecycleError>,
) -> Result<T, LifecycleError> {
    with_esc(f).unwrap_or(Err(LifecycleError::Aborted))
}

/// 実行中のシーケンスの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum PlanKind {
    /// 始動（強制転流）から閉ループ移行まで
    SpinUp,
    Buzz,
}

/// 実行中のシーケンス
struct Plan {
    kind: PlanKind,
    /// 完了後に応答するコマンド
    request: Request,
    /// 次のステップの時刻
    deadline: Instant,
}

/// コマンドの現在値を送信元に返す
fn reply(request: Request) {
    if let Some(reply) = with_esc(|esc| esc.query(request.command.index())).flatten() {
        state::respond(request.origin, reply);
    }
}

/// シーケンスを開始する（最初のステップはすぐに実行）
fn start(kind: PlanKind, request: Request, begin: Result<(), LifecycleError>) -> Option<Plan> {
    match begin {
        Ok(()) => Some(Plan {
            kind,
            request,
            deadline: Instant::now(),
        }),
        Err(e) => {
            warn!("{} refused: {}", kind, e);
            reply(request);
            None
        }
    }
}

/// 受信コマンドを適用する
///
/// 新しいシーケンスが始まった場合は実行中のものと置き換える
/// （置き換えられた側は ESC 内で打ち切られている）。
fn handle(request: Request, active: Option<Plan>) -> Option<Plan> {
    let Some(action) = with_esc(|esc| esc.apply(request.command)) else {
        return active;
    };

    match action {
        Action::Enable(duty) => {
            let begin = esc_step(|esc| esc.begin_enable(duty));
            return replace(active, start(PlanKind::SpinUp, request, begin));
        }
        Action::Buzz {
            period_us,
            duration_ms,
        } => {
            let begin = esc_step(|esc| esc.begin_buzz(period_us, duration_ms));
            return replace(active, start(PlanKind::Buzz, request, begin));
        }
        Action::Blink(blink) => BLINK.signal(blink),
        Action::Halt => hardware::halt(),
        Action::Done => {}
    }

    reply(request);
    active
}

fn replace(active: Option<Plan>, started: Option<Plan>) -> Option<Plan> {
    match started {
        Some(plan) => {
            if let Some(previous) = active {
                reply(previous.request);
            }
            Some(plan)
        }
        None => active,
    }
}

/// シーケンスを1ステップ進める（終了・中断したら応答して `None`）
fn advance(mut plan: Plan) -> Option<Plan> {
    let step = match plan.kind {
        PlanKind::SpinUp => esc_step(|esc| esc.spin_up_step()),
        PlanKind::Buzz => esc_step(|esc| esc.buzz_step()),
    };

    let result = match step {
        Ok(Some(delay_us)) => {
            plan.deadline += Duration::from_micros(delay_us as u64);
            return Some(plan);
        }
        Ok(None) => match plan.kind {
            PlanKind::SpinUp => esc_step(|esc| esc.finish_enable()),
            PlanKind::Buzz => Ok(()),
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        warn!("{} ended: {}", plan.kind, e);
    }
    reply(plan.request);
    None
}

/// モーター制御タスク
#[embassy_executor::task]
pub async fn motor_control_task() {
    info!("Motor control task started");

    let mut active: Option<Plan> = None;

    loop {
        let request = match active.as_ref().map(|plan| plan.deadline) {
            Some(deadline) => match select(COMMANDS.receive(), Timer::at(deadline)).await {
                Either::First(request) => Some(request),
                Either::Second(()) => None,
            },
            None => Some(COMMANDS.receive().await),
        };

        active = match request {
            Some(request) => handle(request, active.take()),
            None => active.take().and_then(advance),
        };
    }
}

