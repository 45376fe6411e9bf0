//! Admission pipeline subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → orchestrator.rs (runs stages in order)
//!         → stage.rs: HttpsStage → InspectionStage → RateLimitStage
//!     → rejection.rs (terminal response) or downstream forward gate
//!     → orchestrator.rs (outbound headers on every response)
//! ```

pub mod orchestrator;
pub mod rejection;
pub mod stage;

pub use orchestrator::{admission_middleware, Admission, AdmissionPipeline};
pub use rejection::Rejection;
pub use stage::{HttpsStage, InspectionStage, Quota, RateLimitStage, Stage, StageOutcome};
