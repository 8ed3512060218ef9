//! Request-for-Quote domain module (event-sourced).
//!
//! This crate contains business rules for RFQs, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod rfq;

pub use rfq::{
    CreateRfq, MarkRfqAccepted, RequirementKind, RequirementLineItem, Rfq, RfqAccepted,
    RfqCommand, RfqCreated, RfqEvent, RfqId, RfqStatus, RfqUpdated, UpdateRfq,
};
