//! # stimlink-domain
//!
//! Pure domain model for the stimlink device controller.
//!
//! ## Responsibilities
//! - Foundational types: peripheral identifiers, error conventions
//! - Define the **device configuration** record and its 24-byte wire frame
//! - Define **scan results** (peripherals seen during one scanning session)
//! - Define the **connection state machine** (selection + lifecycle + last
//!   known configuration) as a pure transition function
//! - Define the **pending edit** (locally drafted configuration) and the
//!   derived dirty flag
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod protocol;

pub mod config;
pub mod edit;
pub mod event;
pub mod frame;
pub mod scan;
pub mod selection;
