//! Inventory domain module (event-sourced).
//!
//! Inventory units come into existence when a purchase order is submitted:
//! one unit per unit of ordered quantity, starting out on-order. This crate
//! contains purely deterministic domain logic (no IO, no HTTP, no storage).

pub mod unit;

pub use unit::{
    InventoryCommand, InventoryEvent, InventoryId, InventoryStatus, InventoryUnit,
    MarkUnitAvailable, MaterializeUnit, PimRef, UnitMarkedAvailable, UnitMaterialized,
};
