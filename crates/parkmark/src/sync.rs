//! Remote sync shim for parkmark.
//!
//! One-way, best-effort push of individual records to a remote document
//! collection. Each record becomes one document keyed by its local id, so a
//! retry overwrites the previous attempt instead of duplicating it. There is
//! no batching, no backoff, and no merge: push, and move on.

use std::sync::mpsc;
use std::thread;

use chrono::Utc;
use tracing::{debug, warn};
use ureq::Agent;

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::record::ParkingRecord;

/// Client for the remote document collection.
#[derive(Debug, Clone)]
pub struct SyncClient {
    agent: Agent,
    base_url: String,
    collection: String,
}

/// Outcome of one push attempt, keyed by the record's local id.
#[derive(Debug)]
pub struct PushOutcome {
    /// Local id of the record that was pushed (if it had one).
    pub id: Option<i64>,
    /// Whether the push succeeded.
    pub result: Result<()>,
}

impl SyncClient {
    /// Build a client from the sync configuration section.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL is configured.
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        let base_url = config.base_url.clone().ok_or(Error::ConfigValidation {
            message: "sync.base_url is not set".to_string(),
        })?;

        let agent = Agent::config_builder()
            .timeout_global(Some(std::time::Duration::from_secs(config.timeout_secs)))
            .build()
            .new_agent();

        Ok(Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: config.collection.clone(),
        })
    }

    /// Document id for a record: its local id, or a generated key.
    #[must_use]
    pub fn document_id(record: &ParkingRecord) -> String {
        record
            .id
            .map_or_else(generated_key, |id| id.to_string())
    }

    /// Push one record to the remote collection.
    ///
    /// A single attempt: the document is `PUT` under its id and any previous
    /// content is overwritten. The caller is responsible for marking the
    /// record synced in the local store on success.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure or a non-success status. The
    /// record simply stays unsynced; the next sync run retries it.
    pub fn push(&self, record: &ParkingRecord) -> Result<()> {
        let doc_id = Self::document_id(record);
        let url = format!("{}/{}/{}", self.base_url, self.collection, doc_id);
        debug!("Pushing record to {}", url);

        match self.agent.put(&url).send_json(record) {
            Ok(_) => Ok(()),
            Err(ureq::Error::StatusCode(code)) => Err(Error::RemoteStatus {
                endpoint: "sync",
                status: code,
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Push one record on its own worker thread, reporting through callbacks.
    ///
    /// The returned handle owns the thread; joining it guarantees the
    /// callback has run.
    pub fn push_detached<S, F>(
        &self,
        record: ParkingRecord,
        on_success: S,
        on_failure: F,
    ) -> thread::JoinHandle<()>
    where
        S: FnOnce() + Send + 'static,
        F: FnOnce(Error) + Send + 'static,
    {
        let client = self.clone();
        thread::spawn(move || match client.push(&record) {
            Ok(()) => on_success(),
            Err(e) => {
                warn!("Push failed: {}", e);
                on_failure(e);
            }
        })
    }

    /// Push every given record, one worker thread per record, and collect
    /// the outcomes.
    ///
    /// All pushes are fired concurrently with no cap. The caller marks the
    /// successful ids as synced in the local store.
    #[must_use]
    pub fn push_all(&self, records: Vec<ParkingRecord>) -> Vec<PushOutcome> {
        let (tx, rx) = mpsc::channel();
        let mut handles = Vec::with_capacity(records.len());

        for record in records {
            let client = self.clone();
            let tx = tx.clone();
            handles.push(thread::spawn(move || {
                let outcome = PushOutcome {
                    id: record.id,
                    result: client.push(&record),
                };
                // Send only fails if the collecting side is already gone.
                let _ = tx.send(outcome);
            }));
        }
        drop(tx);

        let outcomes: Vec<PushOutcome> = rx.iter().collect();
        for handle in handles {
            let _ = handle.join();
        }
        outcomes
    }
}

/// Key used for documents whose record has no local id yet.
fn generated_key() -> String {
    format!("u-{}", Utc::now().timestamp_millis())
}
