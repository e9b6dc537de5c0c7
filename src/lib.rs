//! Gated loan-application intake: a four-step wizard state machine with
//! challenge and tax-ID verification, debounced record-store synchronization,
//! and local draft durability. Presentation is out of scope; this crate is
//! the engine a front end drives.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod wizard;
