//! The message observer contract: external collaborators (a transcript
//! logger, a UI catch-up feed) subscribe to every message the loop
//! appends, in append order, exactly once.

use kin_core::Message;

/// Notified once per appended message, in order. The loop calls this from
/// `flush`, not as each message is pushed, so an observer sees a batch per
/// turn rather than a call per mutation.
pub trait MessageObserver: Send + Sync {
    /// `msg` was just appended to history and has not been observed before.
    fn on_message(&self, msg: &Message);
}

/// An observer that discards everything. The default when no collaborator
/// is wired up.
pub struct NullObserver;

impl MessageObserver for NullObserver {
    fn on_message(&self, _msg: &Message) {}
}
