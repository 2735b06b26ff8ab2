//! User-facing notification boundary.
//!
//! The pipeline emits discrete notification events; rendering them (toasts,
//! banners) is the host application's job. The default implementation just
//! logs through `tracing`.

/// Notification severity, mirrored by the host UI's toast styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Sink for user-facing notifications.
pub trait Notifier {
    fn notify(&mut self, severity: Severity, message: &str);
}

/// Notifier that forwards to the `tracing` log.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => tracing::info!("notify: {}", message),
            Severity::Warning => tracing::warn!("notify: {}", message),
            Severity::Error => tracing::error!("notify: {}", message),
        }
    }
}
