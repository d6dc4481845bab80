//! Service assembly and lifecycle

pub mod app;

pub use app::{wait_for_shutdown_signal, App, Role};
