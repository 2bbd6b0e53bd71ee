//! User-visible notifications.

use std::time::Duration;

use tracing::{error, info, warn};

/// How loudly a message should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

/// Best-effort user-visible messages. Implementations swallow their own
/// failures; callers never hear about them.
pub trait NotificationSink {
    fn show(&self, message: &str, severity: Severity, duration: Duration);
}

/// Writes notifications to the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifications;

impl NotificationSink for LogNotifications {
    fn show(&self, message: &str, severity: Severity, duration: Duration) {
        let secs = duration.as_secs_f32();
        match severity {
            Severity::Info => info!(secs, "{}", message),
            Severity::Warning => warn!(secs, "{}", message),
            Severity::Error => error!(secs, "{}", message),
        }
    }
}

/// System desktop notifications through the platform notification daemon.
#[cfg(feature = "desktop-notifications")]
#[derive(Debug, Clone)]
pub struct DesktopNotifications {
    app_name: String,
}

#[cfg(feature = "desktop-notifications")]
impl DesktopNotifications {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }

    fn send(app_name: &str, message: &str, severity: Severity, duration: Duration) -> Result<(), notify_rust::error::Error> {
        use notify_rust::{Notification, Timeout};

        let mut notification = Notification::new();
        notification
            .summary(app_name)
            .body(message)
            .appname(app_name)
            .icon(match severity {
                Severity::Info => "dialog-information",
                Severity::Warning => "dialog-warning",
                Severity::Error => "dialog-error",
            })
            .timeout(Timeout::Milliseconds(duration.as_millis().min(u32::MAX as u128) as u32));

        #[cfg(target_os = "linux")]
        {
            use notify_rust::Urgency;
            notification.urgency(match severity {
                Severity::Info => Urgency::Low,
                Severity::Warning => Urgency::Normal,
                Severity::Error => Urgency::Critical,
            });
        }

        notification.show()?;
        Ok(())
    }
}

#[cfg(feature = "desktop-notifications")]
impl NotificationSink for DesktopNotifications {
    fn show(&self, message: &str, severity: Severity, duration: Duration) {
        let app_name = self.app_name.clone();
        let message = message.to_string();

        // Talking to the daemon can block; keep it off the UI thread.
        tokio::task::spawn_blocking(move || {
            if let Err(e) = Self::send(&app_name, &message, severity, duration) {
                warn!(error = %e, "failed to send desktop notification");
            }
        });
    }
}
