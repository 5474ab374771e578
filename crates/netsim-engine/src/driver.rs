//! Real-time driver loop.
//!
//! Converts wall-clock time into session time. The loop wakes on a fixed
//! cadence, or earlier when the next timer is due sooner, and feeds the
//! real time that actually elapsed into [`Session::advance_real`]. The
//! session lock is held only for the advance itself so observer requests
//! interleave freely.
//!
//! [`Session::advance_real`]: netsim_core::Session::advance_real

use std::future::Future;
use std::time::Duration;

use netsim_observer::state::SharedSession;
use netsim_types::GameOverReason;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default real-time cadence of the driver loop.
pub const TICK: Duration = Duration::from_millis(100);

/// Why the driver loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The session ended.
    GameOver(GameOverReason),
    /// The shutdown future completed.
    Shutdown,
}

/// Drive `session` until it ends or `shutdown` completes.
pub async fn run(
    session: &SharedSession,
    tick: Duration,
    shutdown: impl Future<Output = ()>,
) -> StopReason {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);
    let mut last = Instant::now();

    loop {
        let due = session.lock().await.next_real_delay();
        let early = due.filter(|delay| *delay < tick);

        tokio::select! {
            biased;
            () = &mut shutdown => {
                info!("shutdown requested");
                return StopReason::Shutdown;
            }
            _ = interval.tick() => {}
            () = tokio::time::sleep(early.unwrap_or(tick)), if early.is_some() => {}
        }

        let now = Instant::now();
        let real = now.saturating_duration_since(last);
        last = now;

        let mut guard = session.lock().await;
        match guard.advance_real(real) {
            Ok(report) => {
                if report.timers_fired > 0 {
                    debug!(
                        timers = report.timers_fired,
                        virtual_now = %guard.now(),
                        "timers fired"
                    );
                }
                if let Some(reason) = report.game_over {
                    info!(?reason, "session ended");
                    return StopReason::GameOver(reason);
                }
            }
            Err(e) => {
                warn!(error = %e, "advance failed");
                if let Some(reason) = guard.game_over() {
                    return StopReason::GameOver(reason);
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use netsim_core::{Session, SimulationConfig};
    use tokio::sync::Mutex;

    use super::*;

    fn shared() -> SharedSession {
        Arc::new(Mutex::new(Session::new(SimulationConfig::default()).unwrap()))
    }

    #[tokio::test]
    async fn stops_when_shutdown_completes() {
        let session = shared();
        let reason = run(&session, TICK, std::future::ready(())).await;
        assert_eq!(reason, StopReason::Shutdown);
    }

    #[tokio::test]
    async fn advances_virtual_time_while_running() {
        let session = shared();
        let start = session.lock().await.now();

        let reason = run(
            &session,
            Duration::from_millis(20),
            tokio::time::sleep(Duration::from_millis(300)),
        )
        .await;

        assert_eq!(reason, StopReason::Shutdown);
        assert!(session.lock().await.now() > start);
    }

    #[tokio::test]
    async fn paused_session_keeps_its_clock() {
        let session = shared();
        session.lock().await.pause();
        let start = session.lock().await.now();

        run(
            &session,
            Duration::from_millis(20),
            tokio::time::sleep(Duration::from_millis(100)),
        )
        .await;

        assert_eq!(session.lock().await.now(), start);
    }
}
