use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use prep_core::model::QuestionId;
use remote::{QuestionUpdate, RemoteError, SyncClient};
use tokio::sync::Mutex as AsyncMutex;

/// Serializes question updates per question id.
///
/// Two updates for the same question never overlap: the later one waits until
/// the earlier one has been acknowledged or has failed, so the backend always
/// applies them in issue order. Updates for different questions run freely.
#[derive(Debug, Default)]
pub struct SubmissionQueue {
    slots: Mutex<HashMap<QuestionId, Arc<AsyncMutex<()>>>>,
}

impl SubmissionQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, id: QuestionId) -> Result<Arc<AsyncMutex<()>>, RemoteError> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|e| RemoteError::Backend(e.to_string()))?;
        Ok(Arc::clone(slots.entry(id).or_default()))
    }

    /// Send `update` once its question's previous update has settled.
    ///
    /// # Errors
    ///
    /// Returns whatever the client returned for this update.
    pub async fn submit(
        &self,
        client: &dyn SyncClient,
        update: &QuestionUpdate,
    ) -> Result<(), RemoteError> {
        let slot = self.slot(update.question_id)?;
        let _turn = slot.lock().await;
        client.submit_question(update).await
    }
}
