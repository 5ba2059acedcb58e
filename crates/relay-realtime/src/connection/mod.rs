//! WebSocket connection management.

pub mod gate;
pub mod handle;
pub mod heartbeat;
pub mod lifecycle;
pub mod manager;
pub mod pool;
pub mod registry;

pub use gate::{Admission, ConnectionGate, GateError};
pub use handle::{ConnectionHandle, DeliveryFailure};
pub use lifecycle::{ConnectionLifecycle, LifecycleEvent, LifecycleState};
pub use manager::{ConnectionManager, ConnectionSession};
pub use pool::ConnectionPool;
pub use registry::{IdentityRegistry, MembershipChange};
