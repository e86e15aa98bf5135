//! Notifier loop: watches the store and wakes idle agents.

pub mod stateless_tracker;
pub mod tick;
pub mod watcher;

pub use stateless_tracker::StatelessTracker;
pub use watcher::run;
