pub trait Notifier {
    fn alert(&self, title: &str, body: &str);
}

/// Desktop notifications through the session notification daemon.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn alert(&self, title: &str, body: &str) {
        send(title, body);
    }
}

/// Swallows alerts; used while user-facing alerts are switched off.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn alert(&self, title: &str, body: &str) {
        tracing::debug!(title, body, "alert suppressed");
    }
}

pub fn send(title: &str, body: &str) {
    if let Err(err) = notify_rust::Notification::new()
        .appname("geosnap")
        .summary(title)
        .body(body)
        .show()
    {
        tracing::warn!("system notification failed: {err}");
    }
}
