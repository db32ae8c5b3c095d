use std::io;
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use super::retrieval::OrderRetrieval;
use crate::cursor_store::CursorStore;
use crate::external::MarketplaceApi;
use crate::store::EntityStore;

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    ///
    /// A cycle in progress runs to completion first.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Polling loop around [`OrderRetrieval::run_cycle`].
///
/// - Runs one cycle immediately, then one per `interval`
/// - A failed cycle is logged and retried on the next tick from the old cursor
/// - Shutdown is checked between cycles
#[derive(Debug)]
pub struct RetrievalWorker;

impl RetrievalWorker {
    pub fn spawn<A, S, C>(
        name: &'static str,
        retrieval: Arc<OrderRetrieval<A, S, C>>,
        interval: Duration,
    ) -> io::Result<WorkerHandle>
    where
        A: MarketplaceApi + 'static,
        S: EntityStore + 'static,
        C: CursorStore + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(name, &retrieval, shutdown_rx, interval))?;

        Ok(WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        })
    }
}

fn worker_loop<A, S, C>(
    name: &'static str,
    retrieval: &OrderRetrieval<A, S, C>,
    shutdown_rx: mpsc::Receiver<()>,
    interval: Duration,
) where
    A: MarketplaceApi,
    S: EntityStore,
    C: CursorStore,
{
    info!(worker = name, interval_secs = interval.as_secs(), "retrieval worker started");

    loop {
        if let Err(err) = retrieval.run_cycle() {
            warn!(worker = name, error = ?err, "retrieval cycle failed, cursor kept");
        }

        match shutdown_rx.recv_timeout(interval) {
            Err(RecvTimeoutError::Timeout) => continue,
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!(worker = name, "retrieval worker stopped");
}
