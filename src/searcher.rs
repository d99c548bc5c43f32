//! Isolated search context.
//!
//! A [`SearchSession`] runs on its own blocking thread and is reachable
//! only through channels: [`SearcherCommand`]s go in, [`SearcherEvent`]s
//! come out. No memory is shared with the caller.
//!
//! | Inbound | Outbound |
//! |---------|----------|
//! | `Load(catalogs)` | `Loaded` |
//! | `Search { request_id, query }` | `Searched { request_id, result }` |
//!
//! Every search carries a monotonic `request_id`, echoed in the reply, so
//! a caller with overlapping searches can drop stale replies.
//!
//! A search issued before any load is a programming error: the worker
//! emits `Failed` and stops. Dropping the [`SearcherHandle`] cancels the
//! worker; queued commands are discarded without replies.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use catalog_core::models::{CatalogQuery, CatalogQueryResult, Catalogs};
use catalog_core::search::{IndexOptions, SearchSession};

#[derive(Debug)]
pub enum SearcherCommand {
    Load(Catalogs),
    Search {
        request_id: u64,
        query: Option<CatalogQuery>,
    },
}

#[derive(Debug, Clone)]
pub enum SearcherEvent {
    Loaded,
    Searched {
        request_id: u64,
        result: CatalogQueryResult,
    },
    /// The worker hit an unrecoverable error and has stopped.
    Failed { request_id: u64, error: String },
}

pub struct SearcherHandle {
    commands: mpsc::UnboundedSender<SearcherCommand>,
    events: mpsc::UnboundedReceiver<SearcherEvent>,
    cancelled: Arc<AtomicBool>,
    next_request_id: u64,
    worker: Option<JoinHandle<()>>,
}

impl SearcherHandle {
    /// Start a worker with a fresh, unloaded session.
    pub fn spawn(options: IndexOptions) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let cancelled = Arc::new(AtomicBool::new(false));

        let session = SearchSession::new(options);
        let flag = cancelled.clone();
        let worker = tokio::task::spawn_blocking(move || run_worker(session, cmd_rx, event_tx, flag));

        Self {
            commands: cmd_tx,
            events: event_rx,
            cancelled,
            next_request_id: 1,
            worker: Some(worker),
        }
    }

    fn send(&self, command: SearcherCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("searcher has stopped"))
    }

    /// Push a catalog snapshot. `Loaded` follows once the index is rebuilt.
    pub fn load(&self, catalogs: Catalogs) -> Result<()> {
        self.send(SearcherCommand::Load(catalogs))
    }

    /// Push a query and return the request id its reply will carry.
    pub fn search(&mut self, query: Option<CatalogQuery>) -> Result<u64> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.send(SearcherCommand::Search { request_id, query })?;
        Ok(request_id)
    }

    /// Next event from the worker; `None` once it has stopped.
    pub async fn next_event(&mut self) -> Option<SearcherEvent> {
        self.events.recv().await
    }

    /// Wait for the next `Loaded`.
    pub async fn wait_loaded(&mut self) -> Result<()> {
        loop {
            match self.next_event().await {
                Some(SearcherEvent::Loaded) => return Ok(()),
                Some(SearcherEvent::Searched { request_id, .. }) => {
                    tracing::debug!(request_id, "dropping search reply while waiting for load");
                }
                Some(SearcherEvent::Failed { error, .. }) => bail!(error),
                None => bail!("searcher stopped before loading"),
            }
        }
    }

    /// Send `query` and wait for its own reply, discarding stale ones.
    pub async fn search_and_wait(&mut self, query: Option<CatalogQuery>) -> Result<CatalogQueryResult> {
        let wanted = self.search(query)?;
        loop {
            match self.next_event().await {
                Some(SearcherEvent::Searched { request_id, result }) if request_id == wanted => {
                    return Ok(result)
                }
                Some(SearcherEvent::Searched { request_id, .. }) => {
                    tracing::debug!(request_id, wanted, "dropping stale search reply");
                }
                Some(SearcherEvent::Loaded) => {}
                Some(SearcherEvent::Failed { error, .. }) => bail!(error),
                None => bail!("searcher stopped before replying"),
            }
        }
    }

    /// Stop the worker and wait for it to exit.
    pub async fn shutdown(mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            // Closing the command channel wakes a worker blocked on recv.
            let (closed, _) = mpsc::unbounded_channel();
            self.commands = closed;
            let _ = worker.await;
        }
    }
}

impl Drop for SearcherHandle {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

fn run_worker(
    mut session: SearchSession,
    mut commands: mpsc::UnboundedReceiver<SearcherCommand>,
    events: mpsc::UnboundedSender<SearcherEvent>,
    cancelled: Arc<AtomicBool>,
) {
    while let Some(command) = commands.blocking_recv() {
        if cancelled.load(Ordering::SeqCst) {
            break;
        }
        let event = match command {
            SearcherCommand::Load(catalogs) => {
                session.load(catalogs);
                SearcherEvent::Loaded
            }
            SearcherCommand::Search { request_id, query } => {
                match session.search(query.as_ref()) {
                    Ok(result) => SearcherEvent::Searched { request_id, result },
                    Err(e) => {
                        tracing::error!(request_id, error = %e, "searcher failed");
                        let _ = events.send(SearcherEvent::Failed {
                            request_id,
                            error: e.to_string(),
                        });
                        break;
                    }
                }
            }
        };
        if cancelled.load(Ordering::SeqCst) || events.send(event).is_err() {
            break;
        }
    }
    tracing::debug!("searcher worker stopped");
}
