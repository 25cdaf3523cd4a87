pub mod app;
pub mod endpoint;
pub mod engine;
pub mod indexer;
pub mod job;
pub mod results;
pub mod task;
pub mod wordcount;
pub mod worker;

pub use app::App;
pub use engine::{EngineError, KeyValue, MapFn, MissingShards, ReduceFn};
pub use job::{JobPhase, JobProgress};
pub use results::JobResults;
pub use task::{Task, TaskId, TaskKind};
pub use worker::{TaskAssignment, TaskReport, TaskReportAck, TaskRequest, WorkerId};
