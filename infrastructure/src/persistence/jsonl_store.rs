//! Append-only JSONL state store
//!
//! Sessions, agent instances, and collaboration records each live in their
//! own `.jsonl` file under the state directory. Every save appends one
//! line; opening a store replays each file with last-write-wins into an
//! in-memory index, so reads never touch disk. Unreadable lines are
//! skipped with a warning rather than failing the open.

use async_trait::async_trait;
use foreman_application::ports::instance_store::{CollaborationStore, InstanceStore};
use foreman_domain::{
    AgentInstance, CollaborationSession, DomainError, Session, SessionRepository,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

/// One keyed JSONL file with an in-memory last-write-wins index
struct Journal<T> {
    path: PathBuf,
    index: Mutex<HashMap<String, T>>,
}

impl<T: Serialize + DeserializeOwned + Clone> Journal<T> {
    fn open(path: PathBuf, key_of: fn(&T) -> &str) -> Result<Self, DomainError> {
        let mut index = HashMap::new();

        match File::open(&path) {
            Ok(file) => {
                for line in BufReader::new(file).lines() {
                    let line = line.map_err(|e| {
                        DomainError::StorageError(format!("reading {}: {e}", path.display()))
                    })?;
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<T>(&line) {
                        Ok(value) => {
                            index.insert(key_of(&value).to_string(), value);
                        }
                        Err(e) => {
                            warn!("Skipping unreadable line in {}: {e}", path.display());
                        }
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(DomainError::StorageError(format!(
                    "opening {}: {e}",
                    path.display()
                )));
            }
        }

        debug!(path = %path.display(), records = index.len(), "journal opened");
        Ok(Self {
            path,
            index: Mutex::new(index),
        })
    }

    fn put(&self, key: &str, value: T) -> Result<(), DomainError> {
        let line = serde_json::to_string(&value)
            .map_err(|e| DomainError::StorageError(format!("encoding record: {e}")))?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                DomainError::StorageError(format!("opening {}: {e}", self.path.display()))
            })?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{line}").and_then(|()| writer.flush()).map_err(|e| {
            DomainError::StorageError(format!("writing {}: {e}", self.path.display()))
        })?;

        self.index
            .lock()
            .map_err(|_| DomainError::StorageError("journal index poisoned".to_string()))?
            .insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<T>, DomainError> {
        Ok(self
            .index
            .lock()
            .map_err(|_| DomainError::StorageError("journal index poisoned".to_string()))?
            .get(key)
            .cloned())
    }

    fn keys(&self) -> Result<Vec<String>, DomainError> {
        let mut keys: Vec<String> = self
            .index
            .lock()
            .map_err(|_| DomainError::StorageError("journal index poisoned".to_string()))?
            .keys()
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn values(&self) -> Result<Vec<T>, DomainError> {
        Ok(self
            .index
            .lock()
            .map_err(|_| DomainError::StorageError("journal index poisoned".to_string()))?
            .values()
            .cloned()
            .collect())
    }
}

/// Durable store for coordinator state, one JSONL file per record kind
pub struct JsonlStateStore {
    sessions: Journal<Session>,
    agents: Journal<AgentInstance>,
    collaborations: Journal<CollaborationSession>,
}

impl JsonlStateStore {
    /// Open the store under `dir`, creating it if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, DomainError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(|e| {
            DomainError::StorageError(format!("creating {}: {e}", dir.display()))
        })?;

        Ok(Self {
            sessions: Journal::open(dir.join("sessions.jsonl"), |s: &Session| s.id())?,
            agents: Journal::open(dir.join("agents.jsonl"), |a: &AgentInstance| &a.id)?,
            collaborations: Journal::open(
                dir.join("collaborations.jsonl"),
                |c: &CollaborationSession| &c.id,
            )?,
        })
    }
}

#[async_trait]
impl SessionRepository for JsonlStateStore {
    async fn load(&self, id: &str) -> Result<Option<Session>, DomainError> {
        self.sessions.get(id)
    }

    async fn save(&self, session: &Session) -> Result<(), DomainError> {
        self.sessions.put(session.id(), session.clone())
    }

    async fn list_ids(&self) -> Result<Vec<String>, DomainError> {
        self.sessions.keys()
    }
}

#[async_trait]
impl InstanceStore for JsonlStateStore {
    async fn put(&self, instance: AgentInstance) -> Result<(), DomainError> {
        self.agents.put(&instance.id.clone(), instance)
    }

    async fn get(&self, id: &str) -> Result<Option<AgentInstance>, DomainError> {
        self.agents.get(id)
    }

    async fn list_for_session(&self, session_id: &str) -> Result<Vec<AgentInstance>, DomainError> {
        let mut instances: Vec<AgentInstance> = self
            .agents
            .values()?
            .into_iter()
            .filter(|i| i.session_id == session_id)
            .collect();
        instances.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(instances)
    }
}

#[async_trait]
impl CollaborationStore for JsonlStateStore {
    async fn save(&self, session: &CollaborationSession) -> Result<(), DomainError> {
        self.collaborations.put(&session.id.clone(), session.clone())
    }

    async fn load(&self, id: &str) -> Result<Option<CollaborationSession>, DomainError> {
        self.collaborations.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foreman_domain::{AgentRole, RoleCatalog};

    fn sample_instance(session_id: &str, role: &str) -> AgentInstance {
        let catalog = RoleCatalog::builtin();
        let role: &AgentRole = catalog.get(role).unwrap();
        AgentInstance::instantiate(role, session_id)
    }

    #[tokio::test]
    async fn test_sessions_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonlStateStore::open(dir.path()).unwrap();
            SessionRepository::save(&store, &Session::new("s-1")).await.unwrap();
            SessionRepository::save(&store, &Session::new("s-2")).await.unwrap();
        }
        let store = JsonlStateStore::open(dir.path()).unwrap();
        assert_eq!(store.list_ids().await.unwrap(), vec!["s-1", "s-2"]);
        assert!(SessionRepository::load(&store, "s-1").await.unwrap().is_some());
        assert!(SessionRepository::load(&store, "s-9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_last_write_wins_on_replay() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonlStateStore::open(dir.path()).unwrap();
            let mut session = Session::new("s-1");
            SessionRepository::save(&store, &session).await.unwrap();
            session.bump_gathering_turns();
            SessionRepository::save(&store, &session).await.unwrap();
        }
        let store = JsonlStateStore::open(dir.path()).unwrap();
        let session = SessionRepository::load(&store, "s-1").await.unwrap().unwrap();
        assert_eq!(session.gathering_turns(), 1);
        assert_eq!(store.list_ids().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_instances_filter_by_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStateStore::open(dir.path()).unwrap();

        let mine = sample_instance("s-1", "developer");
        store.put(mine.clone()).await.unwrap();
        store.put(sample_instance("s-2", "tester")).await.unwrap();

        let found = store.list_for_session("s-1").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, mine.id);
        assert!(InstanceStore::get(&store, &mine.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_corrupt_line_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonlStateStore::open(dir.path()).unwrap();
            SessionRepository::save(&store, &Session::new("s-1")).await.unwrap();
        }
        let path = dir.path().join("sessions.jsonl");
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "not json at all").unwrap();

        let store = JsonlStateStore::open(dir.path()).unwrap();
        assert_eq!(store.list_ids().await.unwrap(), vec!["s-1"]);
    }

    #[tokio::test]
    async fn test_collaborations_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlStateStore::open(dir.path()).unwrap();

        let collab =
            CollaborationSession::new("sprint 1 plan", vec!["agent-a".to_string()], 8);
        CollaborationStore::save(&store, &collab).await.unwrap();

        let found = CollaborationStore::load(&store, &collab.id).await.unwrap().unwrap();
        assert_eq!(found.goal, "sprint 1 plan");
        assert_eq!(found.max_rounds, 8);
    }
}
