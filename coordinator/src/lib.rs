pub mod failover;
pub mod handlers;
pub mod inputs;
pub mod state;

pub use handlers::{build_router, AppState};
pub use state::{Coordinator, CoordinatorConfig, TaskStatus};
