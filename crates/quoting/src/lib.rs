//! Quote and revision pricing domain module (event-sourced).
//!
//! A quote is a seller-owned document answering a buyer's request: it carries
//! an append-only history of priced revisions, and `current_revision_id`
//! points at the revision the buyer is acting on. This crate contains purely
//! deterministic domain logic (no IO, no HTTP, no storage); price lookup goes
//! through the [`PricingResolver`] seam.

pub mod draft;
pub mod pricing;
pub mod quote;

pub use draft::{QuoteLineItemDraft, carry_forward_tracking, price_line_items};
pub use pricing::{InMemoryPriceBook, PricingResolver};
pub use quote::{
    AcceptQuote, CreateQuote, CreateQuoteRevision, Quote, QuoteAccepted, QuoteCommand,
    QuoteCreated, QuoteEvent, QuoteId, QuoteLineItem, QuoteLineItemKind, QuoteRejected,
    QuoteRevision, QuoteRevisionCreated, QuoteRevisionUpdated, QuoteSent, QuoteStatus,
    RejectQuote, RevisionStatus, SendQuote, UpdateQuoteRevision,
};
