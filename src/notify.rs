//! Notification collaborator seam.
//!
//! Delivery (push, local, toast) lives outside this crate; the engine only
//! hands over a title and body and receives a success flag it never acts on.

/// Fire-and-forget notification sink.
pub trait Notifier {
    /// Delivers one notification. Returns whether delivery was accepted;
    /// callers treat the result as informational only.
    fn notify(&self, title: &str, body: &str, icon: Option<&str>) -> bool;
}

/// Notifier that drops everything. Default collaborator when the host
/// application has not wired one up.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _title: &str, _body: &str, _icon: Option<&str>) -> bool {
        false
    }
}
