use qflow_core::{ChartConfig, ClassifiedError, Insight, Recommendation, Stage};
use serde::{Deserialize, Serialize};

/// One event on the wire (spec §6). Tagged so a client can dispatch on `type`
/// without knowing the payload shape up front.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Frame {
    Start { request_id: String, conversation_id: String },
    Progress { percentage: u8, message: String, stage: Stage },
    Partial { narration: String },
    Chart { config: ChartConfig },
    Insights { items: Vec<Insight> },
    Recommendations { items: Vec<Recommendation> },
    Complete { cached: bool },
    Error { message: String, classified: Option<ClassifiedError> },
}

/// A `Frame` with the sequence number the session assigned it. Sequence numbers
/// are per-session, start at 0, and strictly increase for every frame that
/// actually reaches the channel — buffered-and-replaced progress frames never
/// consume a number, so gaps never appear on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub seq: u64,
    #[serde(flatten)]
    pub frame: Frame,
}
