//! Serialized write access to the index
//!
//! The index accepts one writer at a time. [`IndexingActor`] owns the
//! [`IndexManager`] on a dedicated tokio task and applies mutations strictly
//! in arrival order. Each mutation runs inside `spawn_blocking` so index I/O
//! never stalls the async runtime.
//!
//! Reads do not go through the actor: use the [`Searcher`] exposed by the
//! handle, which opens its own snapshot per call.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::core::{NewsSearchError, Record, Result};
use crate::search::{IndexError, IndexManager, Searcher};


/// Default capacity of the command queue
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

type Reply<T> = oneshot::Sender<Result<T>>;

/// Mutations accepted by the actor
enum Command {
    Upsert {
        records: Vec<Record>,
        reply: Reply<usize>,
    },
    Delete {
        id: i64,
        reply: Reply<()>,
    },
    ClearAll {
        reply: Reply<()>,
    },
    Optimize {
        reply: Reply<()>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Upsert { .. } => "upsert",
            Command::Delete { .. } => "delete",
            Command::ClearAll { .. } => "clear_all",
            Command::Optimize { .. } => "optimize",
            Command::Shutdown { .. } => "shutdown",
        }
    }
}

/// Single owner of the index writer
pub struct IndexingActor {
    manager: Arc<IndexManager>,
    receiver: mpsc::Receiver<Command>,
}

impl IndexingActor {
    /// Move the manager onto a background task and return a handle to it
    pub fn spawn(manager: IndexManager) -> IndexerHandle {
        Self::spawn_with_capacity(manager, DEFAULT_QUEUE_CAPACITY)
    }

    pub fn spawn_with_capacity(manager: IndexManager, capacity: usize) -> IndexerHandle {
        let searcher = manager.searcher();
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let actor = Self {
            manager: Arc::new(manager),
            receiver,
        };
        tokio::spawn(actor.run());

        IndexerHandle { sender, searcher }
    }

    async fn run(mut self) {
        tracing::info!(
            index_path = %self.manager.index_path().display(),
            "Indexing actor started"
        );

        while let Some(command) = self.receiver.recv().await {
            tracing::trace!(command = command.name(), "Indexing command received");
            match command {
                Command::Upsert { records, reply } => {
                    let result = self.blocking(move |m| m.upsert_batch(&records)).await;
                    let _ = reply.send(result);
                }
                Command::Delete { id, reply } => {
                    let result = self.blocking(move |m| m.delete(id)).await;
                    let _ = reply.send(result);
                }
                Command::ClearAll { reply } => {
                    let result = self.blocking(|m| m.clear_all()).await;
                    let _ = reply.send(result);
                }
                Command::Optimize { reply } => {
                    let result = self.blocking(|m| m.optimize()).await;
                    let _ = reply.send(result);
                }
                Command::Shutdown { reply } => {
                    let _ = reply.send(());
                    break;
                }
            }
        }

        tracing::info!("Indexing actor stopped");
    }

    /// Run one mutation on the blocking pool and wait for it
    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&IndexManager) -> std::result::Result<T, IndexError> + Send + 'static,
        T: Send + 'static,
    {
        let manager = Arc::clone(&self.manager);
        match tokio::task::spawn_blocking(move || op(&manager)).await {
            Ok(result) => result.map_err(|e| {
                tracing::error!("Indexing command failed: {}", e);
                NewsSearchError::from(e)
            }),
            Err(join_err) => Err(NewsSearchError::IndexerStopped(format!(
                "indexing task panicked: {}",
                join_err
            ))),
        }
    }
}

/// Cheap, cloneable front end of an [`IndexingActor`]
#[derive(Clone)]
pub struct IndexerHandle {
    sender: mpsc::Sender<Command>,
    searcher: Searcher,
}

impl IndexerHandle {
    /// Insert or replace a single record
    pub async fn upsert(&self, record: Record) -> Result<()> {
        self.upsert_batch(vec![record]).await.map(|_| ())
    }

    /// Insert or replace records in one writer session.
    ///
    /// Not transactional: on failure the records before the failing one stay
    /// committed and the error reports how many made it.
    pub async fn upsert_batch(&self, records: Vec<Record>) -> Result<usize> {
        self.request(|reply| Command::Upsert { records, reply }).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.request(|reply| Command::Delete { id, reply }).await
    }

    pub async fn clear_all(&self) -> Result<()> {
        self.request(|reply| Command::ClearAll { reply }).await
    }

    pub async fn optimize(&self) -> Result<()> {
        self.request(|reply| Command::Optimize { reply }).await
    }

    /// Stop the actor after the commands already queued have run
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Command::Shutdown { reply })
            .await
            .map_err(|_| stopped())?;
        response.await.map_err(|_| stopped())
    }

    /// Read-side handle for the same index
    pub fn searcher(&self) -> &Searcher {
        &self.searcher
    }

    pub fn is_running(&self) -> bool {
        !self.sender.is_closed()
    }

    async fn request<T, F>(&self, make: F) -> Result<T>
    where
        F: FnOnce(Reply<T>) -> Command,
    {
        let (reply, response) = oneshot::channel();
        self.sender.send(make(reply)).await.map_err(|_| stopped())?;
        response.await.map_err(|_| stopped())?
    }
}

impl std::fmt::Debug for IndexerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexerHandle")
            .field("running", &self.is_running())
            .finish()
    }
}

fn stopped() -> NewsSearchError {
    NewsSearchError::IndexerStopped("indexing actor is not running".to_string())
}
