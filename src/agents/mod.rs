pub mod file_repository;
pub mod repository;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::canvas::persist::FlowData;

/// An agent definition together with its workflow drawing. The canvas
/// editor owns `flow`; everything else is plain record keeping for the
/// console.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Persisted canvas, exactly the node and edge arrays.
    #[serde(default)]
    pub flow: FlowData,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Agent {
    pub fn new(name: String, description: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            description,
            flow: FlowData::default(),
            created_at: now,
            updated_at: now,
        }
    }
}
