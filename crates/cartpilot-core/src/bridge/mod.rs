//! Host ↔ page bridge plumbing.
//!
//! Outbound messages are delivered by evaluating a dispatch script that
//! raises a DOM `CustomEvent` carrying the encoded envelope. Inbound
//! messages arrive as JSON text posted to the [`BRIDGE_HANDLER`] handler.

mod dispatch;
mod pending;

pub use dispatch::{BRIDGE_EVENT, BRIDGE_HANDLER, dispatch_script, dispatched_payload};
pub use pending::PendingRequests;
