//! Notification sink backed by the tracing pipeline

use crate::circulation::Notifier;

/// Emits every reported reason as a structured event on the `notifications` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn report(&self, reason: &str) {
        tracing::info!(target: "notifications", reason = %reason, "Circulation notice");
    }
}
