//! Bot filtering for the limbo front door: the check pipeline that
//! judges individual connections, the shared connection-rate counters,
//! and the global attack-state machine fed by both.

pub mod attack;
pub mod checks;
pub mod lookup;
pub mod reason;
pub mod statistics;

pub use attack::{AttackEvent, AttackManager, AttackSettings};
pub use checks::{CheckPipeline, CheckVerdict};
pub use reason::BlockReason;
pub use statistics::ConnectionStatistics;
