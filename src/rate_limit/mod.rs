//! Rate limiting subsystem.
//!
//! # Data Flow
//! ```text
//! Inspected request
//!     → selector.rs (path → policy or no limit)
//!     → partition.rs (request → partition key)
//!     → window.rs (admit / reject for (policy, key) at now)
//! ```
//!
//! # Design Decisions
//! - One limiter; path rules pick the policy, so a request is never
//!   counted by two mechanisms
//! - Queue limit is zero: rejection is immediate
//! - Counter state is the only shared mutable state in admission

pub mod partition;
pub mod policy;
pub mod selector;
pub mod window;

pub use partition::PartitionKeyResolver;
pub use policy::{Decision, Policy};
pub use selector::{PolicySelection, PolicySelector};
pub use window::RateLimiter;
