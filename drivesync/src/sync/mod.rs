pub mod engine;
pub mod local;
pub mod plan;
pub mod remote;
pub mod transfer;

pub use engine::{RemoteOp, SyncEngine, SyncError, SyncReport, SyncTarget};
pub use local::{FsTree, LocalEntry, LocalError, LocalTree};
pub use plan::{Exclusions, LevelPlan, SyncOp, plan_level};
pub use remote::{DriveRemote, RemoteEntry, RemoteError, RemoteKind, RemoteTree};
