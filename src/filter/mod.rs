//! DNS query filtering against a denylist of domains.

mod blocklist;

pub use blocklist::{normalize, Blocklist};
