//! Point-to-point routing of messages and control signals.

pub mod router;

pub use router::MessageRouter;
