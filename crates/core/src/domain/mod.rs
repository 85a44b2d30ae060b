pub mod profile;
pub mod report;
pub mod task;

pub use profile::{Objective, RiskAppetite, UserProfile};
pub use report::Report;
pub use task::{Task, TaskErrorReason, TaskId, TaskState};
