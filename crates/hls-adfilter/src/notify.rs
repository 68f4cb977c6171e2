//! User-facing "ads filtered" notifications.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

/// Receives the one-line report emitted after a successful removal.
///
/// Implementations must not block; the pipeline calls this inline.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Format a duration the way the notification reads it: `45 秒`, `2 分钟`, `1 分 30 秒`.
pub fn format_duration(seconds: f64) -> String {
    let seconds = seconds.max(0.0).round() as u64;
    if seconds < 60 {
        return format!("{seconds} 秒");
    }
    let minutes = seconds / 60;
    let remaining = seconds % 60;
    if remaining == 0 {
        format!("{minutes} 分钟")
    } else {
        format!("{minutes} 分 {remaining} 秒")
    }
}

pub fn filtered_message(seconds: f64) -> String {
    format!("已过滤 {} 广告", format_duration(seconds))
}

/// Logs notifications instead of showing them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        info!(target: "adfilter::notify", "{message}");
    }
}

/// Discards notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _message: &str) {}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    /// Increments with every notification; lets a UI tell replacements apart.
    pub id: u64,
    pub message: String,
    /// Time left before the toast dismisses itself.
    #[serde(rename = "remaining_ms", serialize_with = "serialize_millis")]
    pub remaining: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

struct ActiveToast {
    id: u64,
    message: String,
    shown_at: Instant,
}

/// Holds at most one visible notification.
///
/// A new notification replaces the current one; a notification disappears on its own
/// once `timeout` has elapsed.
pub struct ToastSlot {
    timeout: Duration,
    state: Mutex<(u64, Option<ActiveToast>)>,
}

impl ToastSlot {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            state: Mutex::new((0, None)),
        }
    }

    /// The toast visible right now, if any.
    pub fn current(&self) -> Option<Toast> {
        self.current_at(Instant::now())
    }

    pub fn current_at(&self, now: Instant) -> Option<Toast> {
        let mut state = self.state.lock();
        let elapsed = state
            .1
            .as_ref()
            .map(|t| now.saturating_duration_since(t.shown_at))?;
        if elapsed >= self.timeout {
            state.1 = None;
            return None;
        }
        state.1.as_ref().map(|t| Toast {
            id: t.id,
            message: t.message.clone(),
            remaining: self.timeout - elapsed,
        })
    }

    pub fn dismiss(&self) {
        self.state.lock().1 = None;
    }

    fn show_at(&self, message: &str, now: Instant) {
        let mut state = self.state.lock();
        state.0 += 1;
        let id = state.0;
        state.1 = Some(ActiveToast {
            id,
            message: message.to_string(),
            shown_at: now,
        });
    }
}

impl Notifier for ToastSlot {
    fn notify(&self, message: &str) {
        self.show_at(message, Instant::now());
        info!(target: "adfilter::notify", "{message}");
    }
}
