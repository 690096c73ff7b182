pub mod capability;
pub mod dispatcher;
pub mod order_executor;
pub mod position_sizer;
pub mod registry;
pub mod risk_gate;

pub use capability::{Authorization, CapabilityModel, DenialReason, ExecutionMode};
pub use dispatcher::{DispatcherConfig, DispatcherDeps, MirrorDispatcher, MirrorFailure};
pub use order_executor::{OrderExecutor, RetryPolicy};
pub use registry::PositionRegistry;
pub use risk_gate::{RiskGate, RiskGateConfig, RiskViolation};
