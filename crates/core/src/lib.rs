//! Domain types and pure logic for the generation job tracker.
//!
//! No async and no I/O: everything here is shared by the event bus, the
//! pipeline crate, and the worker binary.

pub mod content;
pub mod error;
pub mod generation;
pub mod job;
pub mod job_events;
pub mod search;
pub mod tiers;
pub mod types;
