use serde::{Deserialize, Serialize};

/// Channel carrying trade-executed and lifecycle events, emitted by workers.
pub const CHANNEL_AGENT_EVENTS: &str = "agent_events";
/// Channel carrying aggregated group insights, emitted by the analyzer.
pub const CHANNEL_GROUP_UPDATES: &str = "group_updates";
/// Channel carrying per-agent parameter suggestions, emitted by the analyzer and consumed
/// by workers via their adaptation path.
pub const CHANNEL_LEARNING_MODULE: &str = "learning_module";

/// Wire envelope published on every bus channel. `agent_id`/`group_id` are carried at the
/// top level so a handler can route without deserialising `payload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<i64>,
    pub payload: serde_json::Value,
}

impl Envelope {
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            agent_id: None,
            group_id: None,
            payload,
        }
    }

    pub fn with_agent_id(mut self, agent_id: i64) -> Self {
        self.agent_id = Some(agent_id);
        self
    }

    pub fn with_group_id(mut self, group_id: Option<i64>) -> Self {
        self.group_id = group_id;
        self
    }
}
