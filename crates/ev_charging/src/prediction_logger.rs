//! Single-writer task that owns every append to the prediction log.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use datastore::PredictionLogStore;
use object_store::ObjectStore;
use station_structs::{PredictionLogEntry, StationFeatures};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Predictions that may wait for the writer before new ones are dropped.
pub const LOG_QUEUE_CAPACITY: usize = 1024;

enum LogCommand {
    Record {
        request: StationFeatures,
        prediction: f64,
    },
    Shutdown,
}

/// Handle to the background prediction log writer.
///
/// Serving never waits on the log: [`record`](Self::record) only enqueues,
/// and a failed append is reported with `warn!` and otherwise ignored.
pub struct PredictionLogWriter {
    sender: mpsc::Sender<LogCommand>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PredictionLogWriter {
    /// Starts the writer task. Must be called inside a tokio runtime.
    #[must_use]
    pub fn spawn(store: Arc<dyn ObjectStore>) -> Self {
        let (sender, receiver) = mpsc::channel(LOG_QUEUE_CAPACITY);
        let task = tokio::spawn(run_writer(PredictionLogStore::new(store), receiver));

        Self {
            sender,
            task: Mutex::new(Some(task)),
        }
    }

    /// Queues one served prediction for logging.
    pub fn record(&self, request: StationFeatures, prediction: f64) {
        match self.sender.try_send(LogCommand::Record {
            request,
            prediction,
        }) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(capacity = LOG_QUEUE_CAPACITY, "Prediction log queue full, dropping entry");
            }
            Err(TrySendError::Closed(_)) => {
                warn!("Prediction log writer stopped, dropping entry");
            }
        }
    }

    /// Stops accepting entries and waits until every queued one is written.
    ///
    /// Calling this more than once is harmless.
    pub async fn shutdown(&self) {
        let task = match self.task.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(task) = task else {
            return;
        };

        if self.sender.send(LogCommand::Shutdown).await.is_err() {
            debug!("Prediction log writer already stopped");
        }

        if let Err(e) = task.await {
            warn!(error = %e, "Prediction log writer task failed");
        }
    }
}

async fn run_writer(log: PredictionLogStore, mut receiver: mpsc::Receiver<LogCommand>) {
    let mut last_timestamp: Option<DateTime<Utc>> = None;

    while let Some(command) = receiver.recv().await {
        let LogCommand::Record {
            request,
            prediction,
        } = command
        else {
            // Entries already queued are still drained below.
            receiver.close();
            continue;
        };

        let mut entry = PredictionLogEntry::new(request, prediction);
        if let Some(last) = last_timestamp {
            entry.timestamp_utc = entry.timestamp_utc.max(last);
        }
        last_timestamp = Some(entry.timestamp_utc);

        if let Err(e) = log.append(entry).await {
            warn!(error = %e, "Failed to log prediction");
        }
    }

    debug!("Prediction log writer drained");
}
