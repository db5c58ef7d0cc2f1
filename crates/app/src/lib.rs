//! # stimlink-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define the **port traits** adapters must implement:
//!   - `Transport`: the BLE stack (scan, connect, GATT access, RSSI)
//!   - `EventPublisher`: fan-out of session events
//! - Drive a **scan session** and collect advertisements
//! - Run the **connection protocol** (connect, discover, subscribe,
//!   handshake) and write configuration frames
//! - Own the session in a single-queue **device controller** actor, with a
//!   scoped **signal-strength poller**
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `stimlink-domain` only (plus `tokio` for channels, tasks and
//! timers). Never imports adapter crates. Adapters depend on *this* crate,
//! not the reverse.

pub mod connection;
pub mod controller;
pub mod event_bus;
pub mod ports;
pub mod scan_session;
pub mod settings;
pub mod signal;

#[cfg(test)]
pub(crate) mod testing;
