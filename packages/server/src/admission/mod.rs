//! Capacity-checked admission of registrants to events.
//!
//! Every mutation that can change how many places an event has taken goes
//! through [`AdmissionService`] inside a transaction. The event row is locked
//! first, then the registration row, so concurrent admissions for one event
//! are serialized and never deadlock against a status change.

mod service;

pub use service::{AdmissionService, GuestContact, Registrant, active_counts};
