pub mod client;
pub mod worker;

pub use client::{CoordinatorClient, HttpCoordinator};
pub use worker::{Worker, WorkerConfig, WorkerSummary};
