//! Workflow Orchestrator (C8): drives a request through the agent pipeline,
//! applying C6's recovery edges and streaming progress via C10.

mod orchestrator;

pub use orchestrator::Orchestrator;
