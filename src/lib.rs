pub mod config;
pub mod prp;
pub mod session;

pub use config::{ConfigError, EngineConfig};
pub use prp::{ApiLookupStrategy, RequirementError, RequirementStore};
pub use session::{FlowPlan, PlanSource, Session, SessionError, SessionSummary};
