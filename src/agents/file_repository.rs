use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::Agent;
use super::repository::AgentRepository;
use crate::canvas::persist::FlowData;

/// File-based store for agents: in-memory `RwLock<HashMap>` backed by
/// one JSON file per agent under `<data_dir>/agents/`.
pub struct FileAgentRepository {
    agents: RwLock<HashMap<String, Agent>>,
    dir: PathBuf,
}

impl FileAgentRepository {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            agents: RwLock::new(HashMap::new()),
            dir: base_dir.as_ref().join("agents"),
        }
    }

    fn write_file(&self, agent: &Agent) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.json", agent.id));
        let content = serde_json::to_string_pretty(agent)?;

        // Atomic write via temp file + rename
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, content)?;
        std::fs::rename(&tmp_path, &path)?;
        Ok(())
    }
}

#[async_trait]
impl AgentRepository for FileAgentRepository {
    async fn list(&self) -> Vec<Agent> {
        self.agents.read().await.values().cloned().collect()
    }

    async fn get(&self, id: &str) -> Option<Agent> {
        self.agents.read().await.get(id).cloned()
    }

    async fn save(&self, agent: Agent) -> Result<()> {
        self.write_file(&agent)?;
        self.agents.write().await.insert(agent.id.clone(), agent);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let existed = self.agents.write().await.remove(id).is_some();
        let path = self.dir.join(format!("{id}.json"));
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        Ok(existed)
    }

    async fn set_flow(&self, id: &str, flow: FlowData) -> Result<bool> {
        let mut agents = self.agents.write().await;
        let Some(agent) = agents.get(id) else {
            return Ok(false);
        };
        let mut updated = agent.clone();
        updated.flow = flow;
        updated.updated_at = Utc::now();

        // Commit to the map only after the file write succeeds.
        self.write_file(&updated)?;
        agents.insert(updated.id.clone(), updated);
        Ok(true)
    }

    /// Load all agent JSON files from disk into the in-memory map.
    async fn load_all(&self) -> Result<()> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir)?;
            return Ok(());
        }

        let mut map = HashMap::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match std::fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str::<Agent>(&content) {
                    Ok(agent) => {
                        map.insert(agent.id.clone(), agent);
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "failed to parse agent file");
                    }
                },
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to read agent file");
                }
            }
        }

        tracing::info!(count = map.len(), "loaded agents");
        *self.agents.write().await = map;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::graph::Graph;
    use crate::canvas::persist::to_persisted;
    use crate::canvas::{NodeKind, Position};

    fn drawn_flow() -> FlowData {
        let mut graph = Graph::with_entry();
        let entry = graph.entry().unwrap().id.clone();
        let agent = graph
            .add_node(NodeKind::AgentCall, Position::new(300.0, 100.0))
            .unwrap();
        graph.connect(&entry, None, &agent).unwrap();
        to_persisted(&graph)
    }

    #[tokio::test]
    async fn test_agent_crud() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileAgentRepository::new(tmp.path());
        store.load_all().await.unwrap();

        let agent = Agent::new("Triage".to_string(), "Routes tickets".to_string());
        let id = agent.id.clone();
        store.save(agent).await.unwrap();

        assert_eq!(store.list().await.len(), 1);
        let fetched = store.get(&id).await.unwrap();
        assert_eq!(fetched.name, "Triage");
        assert!(fetched.flow.is_empty());

        let mut updated = fetched;
        updated.name = "Ticket triage".to_string();
        store.save(updated).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap().name, "Ticket triage");

        assert!(store.delete(&id).await.unwrap());
        assert!(store.get(&id).await.is_none());
        assert!(!store.delete(&id).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_flow_persists_drawing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileAgentRepository::new(tmp.path());
        store.load_all().await.unwrap();

        let agent = Agent::new("Triage".to_string(), "Routes tickets".to_string());
        let id = agent.id.clone();
        let created_at = agent.created_at;
        store.save(agent).await.unwrap();

        assert!(store.set_flow(&id, drawn_flow()).await.unwrap());
        let fetched = store.get(&id).await.unwrap();
        assert_eq!(fetched.flow.nodes.len(), 2);
        assert_eq!(fetched.flow.edges.len(), 1);
        assert!(fetched.updated_at >= created_at);

        // New store instance, load from disk. Only the flow changed; the
        // rest of the record rode along untouched.
        let store2 = FileAgentRepository::new(tmp.path());
        store2.load_all().await.unwrap();
        let loaded = store2.get(&id).await.unwrap();
        assert_eq!(loaded.flow.nodes.len(), 2);
        assert_eq!(loaded.flow.nodes[1].kind, NodeKind::AgentCall);
        assert_eq!(loaded.name, "Triage");
        assert_eq!(loaded.description, "Routes tickets");
    }

    #[tokio::test]
    async fn test_set_flow_write_failure_keeps_record_unchanged() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileAgentRepository::new(tmp.path());
        store.load_all().await.unwrap();

        let agent = Agent::new("Triage".to_string(), String::new());
        let id = agent.id.clone();
        store.save(agent).await.unwrap();

        // Occupy the temp-file path with a directory so the next write
        // cannot land.
        let blocker = tmp.path().join("agents").join(format!("{id}.json.tmp"));
        std::fs::create_dir_all(&blocker).unwrap();

        assert!(store.set_flow(&id, drawn_flow()).await.is_err());

        // The cached record still matches what is on disk.
        let cached = store.get(&id).await.unwrap();
        assert!(cached.flow.is_empty());

        let reloaded = FileAgentRepository::new(tmp.path());
        reloaded.load_all().await.unwrap();
        assert!(reloaded.get(&id).await.unwrap().flow.is_empty());
    }

    #[tokio::test]
    async fn test_set_flow_unknown_agent() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileAgentRepository::new(tmp.path());
        store.load_all().await.unwrap();
        assert!(!store.set_flow("ghost", drawn_flow()).await.unwrap());
    }

    #[tokio::test]
    async fn test_load_all_skips_bad_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("agents");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("broken.json"), "{not json").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignore me").unwrap();

        let store = FileAgentRepository::new(tmp.path());
        store.load_all().await.unwrap();
        assert!(store.list().await.is_empty());
    }
}
