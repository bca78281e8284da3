//! Session lifecycle management.

pub mod cleanup;
pub mod controller;

pub use cleanup::SessionCleanup;
pub use controller::{AdmissionRequest, AdmittedSession, SessionController};
