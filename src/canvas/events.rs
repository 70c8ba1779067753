use chrono::{DateTime, Utc};
use serde::Serialize;

/// Pushed over the editor event stream so an open canvas mirrors what
/// the runner and other tabs are doing.
#[derive(Debug, Clone, Serialize)]
pub struct CanvasEvent {
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
    pub node_id: Option<String>,
    pub event_type: CanvasEventType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanvasEventType {
    NodeExecuting,
    ExecutionCleared,
    Saved,
}

impl CanvasEventType {
    pub fn as_sse_event(&self) -> &'static str {
        match self {
            CanvasEventType::NodeExecuting => "node_executing",
            CanvasEventType::ExecutionCleared => "execution_cleared",
            CanvasEventType::Saved => "saved",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_names_match_wire_format() {
        assert_eq!(
            serde_json::to_string(&CanvasEventType::NodeExecuting).unwrap(),
            format!("\"{}\"", CanvasEventType::NodeExecuting.as_sse_event())
        );
        assert_eq!(
            serde_json::to_string(&CanvasEventType::ExecutionCleared).unwrap(),
            format!("\"{}\"", CanvasEventType::ExecutionCleared.as_sse_event())
        );
        assert_eq!(
            serde_json::to_string(&CanvasEventType::Saved).unwrap(),
            format!("\"{}\"", CanvasEventType::Saved.as_sse_event())
        );
    }
}
