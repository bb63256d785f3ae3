//! Platform abstraction for the reconciler's scheduling needs.
//!
//! The core never decides when work runs. It asks the host for a callback to
//! be run "when convenient" and performs one slice of work each time that
//! callback fires.

/// Callback handed to the host to resume the work loop.
pub type IdleCallback = Box<dyn FnOnce() + 'static>;

/// Schedules opportunistic work for a root.
///
/// Callbacks must run on the thread that owns the root and never from inside
/// `request_idle_callback` itself. A scheduler that drops them leaves the root
/// to be driven with [`Root::flush`](crate::Root::flush).
pub trait RuntimeScheduler {
    /// Request that `callback` be run when the host is idle.
    fn request_idle_callback(&self, callback: IdleCallback);
}
