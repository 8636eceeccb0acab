//! Agent Library (C7): one pure `WorkflowState` transformer per stage of the
//! analytics pipeline — router, NL2SQL, SQL validator, query executor
//! invocation, results validator, chart generation, insights, narrator.

mod agent;
mod chart;
mod deps;
mod insights;
mod narrator;
mod nl2sql;
mod query_exec;
mod results_validator;
mod router;
#[cfg(test)]
mod test_support;
mod validator;

pub use agent::Agent;
pub use chart::ChartGenerationAgent;
pub use deps::AgentDeps;
pub use insights::InsightsAgent;
pub use narrator::NarratorAgent;
pub use nl2sql::Nl2SqlAgent;
pub use query_exec::QueryExecutorAgent;
pub use results_validator::ResultsValidatorAgent;
pub use router::RouterAgent;
pub use validator::SqlValidatorAgent;
