//! Modification policy
//!
//! A predicate `is_modifiable(fields, now)` gating update/delete. The store
//! is agnostic to the rule; it calls the predicate and rejects the
//! operation when it returns false.

mod clock;
mod rules;

pub use clock::{Clock, FixedClock, SystemClock};
pub use rules::{LeadTimePolicy, ModificationPolicy, PolicyConfig, Unrestricted};
