// Desktop stand-ins for the host capabilities the service needs
//
// Notifications are rendered to stderr, the wake-lock is a deadline, and
// "stop self" flips a flag the run loop watches.

use background_locator_core::platform::{
    Notification, NotificationChannel, NotificationManager, PlatformError, ServiceHost, WakeLock,
};
use colored::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Notify;

// ============================================================================
// NOTIFICATIONS
// ============================================================================

#[derive(Default)]
pub struct ConsoleNotifications {
    foreground: AtomicBool,
}

impl ConsoleNotifications {
    pub fn new() -> Self {
        Self::default()
    }

    fn render(&self, id: u32, notification: &Notification) {
        eprintln!(
            "  {} [{}] {}: {}",
            "◉".bright_blue(),
            id,
            notification.title.bold(),
            notification.text
        );
        for action in &notification.actions {
            eprintln!("      [{}]", action.label.bright_cyan());
        }
    }
}

impl NotificationManager for ConsoleNotifications {
    fn create_channel(&self, channel: &NotificationChannel) -> Result<(), PlatformError> {
        tracing::debug!("Notification channel {} ({})", channel.id, channel.name);
        Ok(())
    }

    fn start_foreground(&self, id: u32, notification: &Notification) -> Result<(), PlatformError> {
        self.foreground.store(true, Ordering::SeqCst);
        self.render(id, notification);
        Ok(())
    }

    fn notify(&self, id: u32, notification: &Notification) -> Result<(), PlatformError> {
        self.render(id, notification);
        Ok(())
    }

    fn stop_foreground(&self, remove_notification: bool) -> Result<(), PlatformError> {
        if !self.foreground.swap(false, Ordering::SeqCst) {
            return Err(PlatformError::Notification(
                "not in foreground".to_string(),
            ));
        }
        if remove_notification {
            eprintln!("  {} notification removed", "◌".dimmed());
        }
        Ok(())
    }
}

// ============================================================================
// WAKE LOCK
// ============================================================================

/// Wake-lock that lapses on its own once the timeout passes
#[derive(Default)]
pub struct TimedWakeLock {
    held_until: Mutex<Option<Instant>>,
}

impl TimedWakeLock {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WakeLock for TimedWakeLock {
    fn acquire(&self, tag: &str, timeout: Duration) -> Result<(), PlatformError> {
        let deadline = Instant::now()
            .checked_add(timeout)
            .ok_or_else(|| PlatformError::WakeLock(format!("timeout too large: {:?}", timeout)))?;
        *self.held_until.lock() = Some(deadline);
        tracing::debug!("Wake lock {} held for {:?}", tag, timeout);
        Ok(())
    }

    fn is_held(&self) -> bool {
        matches!(*self.held_until.lock(), Some(deadline) if Instant::now() < deadline)
    }

    fn release(&self) -> Result<(), PlatformError> {
        let mut held_until = self.held_until.lock();
        match held_until.take() {
            Some(deadline) if Instant::now() < deadline => Ok(()),
            Some(_) => Err(PlatformError::WakeLock("already expired".to_string())),
            None => Err(PlatformError::WakeLock("not held".to_string())),
        }
    }
}

// ============================================================================
// PROCESS HOST
// ============================================================================

/// Records the service's request to stop and wakes whoever waits on it
#[derive(Default)]
pub struct ProcessHost {
    stopped: AtomicBool,
    notify: Notify,
}

impl ProcessHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_requested(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Resolve once the service has asked to stop
    pub async fn stopped(&self) {
        while !self.stop_requested() {
            self.notify.notified().await;
        }
    }
}

impl ServiceHost for ProcessHost {
    fn stop_self(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }
}
