//! Domain models for the care-reminders system.

mod document;
mod patient;
mod reminder;

pub use document::*;
pub use patient::*;
pub use reminder::*;
