use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration};

use super::{SessionEvent, SessionWindow};

/// Text published once the countdown runs out
pub const EXPIRED_TEXT: &str = "Status updating...";

/// Render a countdown line such as `Closes in 5h 30m 0s`
pub fn format_countdown(event: SessionEvent, remaining_ms: i64) -> String {
    let ms = remaining_ms.max(0);
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    format!("{} {}h {}m {}s", event.label(), hours, minutes, seconds)
}

/// Ticking countdown to the next session event.
///
/// Owned by whoever displays it; the analysis engine never holds one. The task
/// is aborted on [`Countdown::cancel`] or when the handle is dropped.
pub struct Countdown {
    handle: JoinHandle<()>,
    rx: watch::Receiver<String>,
}

impl Countdown {
    /// Start a one-second countdown for `window`
    pub fn start(window: &SessionWindow) -> Self {
        Self::with_tick(window, Duration::from_secs(1))
    }

    pub fn with_tick(window: &SessionWindow, tick: Duration) -> Self {
        let event = window.next_event_label;
        let mut remaining = window.time_to_event;
        let step = i64::try_from(tick.as_millis()).unwrap_or(i64::MAX);

        let (tx, rx) = watch::channel(format_countdown(event, remaining));

        let handle = tokio::spawn(async move {
            let mut ticker = interval(tick);
            loop {
                ticker.tick().await;
                if remaining <= 0 {
                    let _ = tx.send(EXPIRED_TEXT.to_string());
                    break;
                }
                if tx.send(format_countdown(event, remaining)).is_err() {
                    break;
                }
                remaining = remaining.saturating_sub(step);
            }
            tracing::debug!("Countdown to '{}' finished", event.label());
        });

        Self { handle, rx }
    }

    /// Latest rendered line
    pub fn current(&self) -> String {
        self.rx.borrow().clone()
    }

    /// Receiver notified on every tick
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.rx.clone()
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    fn window(event: SessionEvent, ms: i64) -> SessionWindow {
        SessionWindow {
            is_open: event == SessionEvent::Closes,
            market_status: "Open".to_string(),
            next_event_label: event,
            time_to_event: ms,
            next_event_at: FixedOffset::east_opt(19_800)
                .unwrap()
                .with_ymd_and_hms(2024, 6, 10, 15, 30, 0)
                .single()
                .unwrap(),
        }
    }

    #[test]
    fn test_format_countdown() {
        assert_eq!(
            format_countdown(SessionEvent::Closes, (5 * 3600 + 30 * 60) * 1000),
            "Closes in 5h 30m 0s"
        );
        assert_eq!(
            format_countdown(SessionEvent::Opens, 3_723_999),
            "Opens in 1h 2m 3s"
        );
        assert_eq!(format_countdown(SessionEvent::Opens, -5), "Opens in 0h 0m 0s");
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_ticks_down_and_expires() {
        let countdown = Countdown::start(&window(SessionEvent::Opens, 2_500));
        assert_eq!(countdown.current(), "Opens in 0h 0m 2s");

        tokio::time::sleep(Duration::from_millis(1_100)).await;
        assert_eq!(countdown.current(), "Opens in 0h 0m 1s");

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(countdown.current(), EXPIRED_TEXT);
        assert!(countdown.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_updates() {
        let countdown = Countdown::start(&window(SessionEvent::Closes, 60_000));
        tokio::time::sleep(Duration::from_millis(1_100)).await;
        let before = countdown.current();
        assert_eq!(before, "Closes in 0h 0m 59s");

        countdown.cancel();
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(countdown.current(), before);
        assert!(countdown.is_finished());
    }
}
