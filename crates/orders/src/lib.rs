//! Order domain module (event-sourced): sales orders and purchase orders.
//!
//! Both documents are materialized from an accepted quote revision and trace
//! every line back to its source quote line item. This crate contains purely
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod line_item;
pub mod purchase_order;
pub mod sales_order;

pub use line_item::{OrderLineItem, OrderLineItemKind};
pub use purchase_order::{
    CreatePurchaseOrder, PurchaseOrder, PurchaseOrderCommand, PurchaseOrderCreated,
    PurchaseOrderEvent, PurchaseOrderId, PurchaseOrderStatus, PurchaseOrderSubmitted,
    SubmitPurchaseOrder,
};
pub use sales_order::{
    ConfirmSalesOrder, CreateSalesOrder, SalesOrder, SalesOrderCommand, SalesOrderConfirmed,
    SalesOrderCreated, SalesOrderEvent, SalesOrderId, SalesOrderStatus,
};
