//! Owner of the "current search".
//!
//! Starting a search cancels the previous one and waits for its task to
//! finish before the new request goes out, so a lineage never has two
//! requests in flight and only the latest session can report an outcome.

use std::sync::Arc;

use prospect_core::SearchQuery;
use tokio::task::JoinHandle;

use crate::client::ProspectClient;
use crate::session::{SearchSession, SessionHandle, SessionSettings};

struct ActiveSession {
    handle: SessionHandle,
    task: JoinHandle<()>,
}

pub struct SearchController {
    client: Arc<ProspectClient>,
    settings: SessionSettings,
    current: Option<ActiveSession>,
    next_id: u64,
}

impl SearchController {
    #[must_use]
    pub fn new(client: ProspectClient, settings: SessionSettings) -> Self {
        Self {
            client: Arc::new(client),
            settings,
            current: None,
            next_id: 0,
        }
    }

    /// Cancels whatever is running and starts a new session for `query`.
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start_search(&mut self, query: SearchQuery) -> SessionHandle {
        self.cancel_current().await;

        self.next_id += 1;
        let (session, handle) = SearchSession::new(
            self.next_id,
            Arc::clone(&self.client),
            query,
            self.settings.clone(),
        );
        tracing::debug!(session = self.next_id, "starting search session");
        let task = tokio::spawn(session.run());
        self.current = Some(ActiveSession {
            handle: handle.clone(),
            task,
        });
        handle
    }

    /// Cancels the current session, if any, and waits for it to stop.
    pub async fn cancel_current(&mut self) {
        let Some(active) = self.current.take() else {
            return;
        };
        active.handle.cancel();
        if let Err(err) = active.task.await {
            tracing::warn!(
                session = active.handle.id(),
                error = %err,
                "search session task ended abnormally"
            );
        }
    }

    /// Handle of the most recently started session.
    #[must_use]
    pub fn current(&self) -> Option<&SessionHandle> {
        self.current.as_ref().map(|active| &active.handle)
    }
}
