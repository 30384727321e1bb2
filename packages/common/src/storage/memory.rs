use async_trait::async_trait;
use dashmap::DashMap;

use super::error::StorageError;
use super::traits::SessionStore;
use crate::upload::UploadSession;

/// In-process session store.
///
/// Sessions are lost on restart, so this only suits tests and single-shot
/// deployments where chunk state is disposable anyway.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, UploadSession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, upload_id: &str) -> Result<Option<UploadSession>, StorageError> {
        Ok(self.sessions.get(upload_id).map(|s| s.value().clone()))
    }

    async fn put(&self, session: &UploadSession) -> Result<(), StorageError> {
        self.sessions
            .insert(session.upload_id.clone(), session.clone());
        Ok(())
    }

    async fn delete(&self, upload_id: &str) -> Result<bool, StorageError> {
        Ok(self.sessions.remove(upload_id).is_some())
    }

    async fn list(&self) -> Result<Vec<UploadSession>, StorageError> {
        Ok(self.sessions.iter().map(|s| s.value().clone()).collect())
    }
}
