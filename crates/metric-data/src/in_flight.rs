//! Coalescing of identical fetches.
//!
//! The first caller for a fingerprint spawns the fetch; later callers
//! attach to its result channel. Every caller waits on its own token, so a
//! cancelled caller detaches without disturbing the others. The fetch
//! itself is cancelled when its last caller detaches or on `cancel`.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::{debug, warn};

use metric_core::errors::{DataError, DataResult};
use metric_core::models::AnswerRow;
use metric_core::traits::{AnswerSource, Cancellable, CancellationToken, FetchRequest};

use crate::fingerprint::FetchFingerprint;

/// Rows of one completed fetch, shared by every caller attached to it.
pub type FetchedRows = Arc<Vec<AnswerRow>>;

type FetchOutcome = Option<DataResult<FetchedRows>>;
type FetchMap = DashMap<FetchFingerprint, Arc<InFlightFetch>>;

#[derive(Debug)]
struct InFlightFetch {
    token: CancellationToken,
    outcome: watch::Receiver<FetchOutcome>,
    waiters: AtomicUsize,
}

/// Running fetches by fingerprint.
#[derive(Debug, Default)]
pub struct InFlightTable {
    fetches: Arc<FetchMap>,
    started: AtomicU64,
    coalesced: AtomicU64,
}

impl InFlightTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `request` from `source`, joining an identical fetch if one is
    /// already running.
    pub async fn fetch(
        &self,
        source: Arc<dyn AnswerSource>,
        request: FetchRequest,
        token: &CancellationToken,
    ) -> DataResult<FetchedRows> {
        if token.is_cancelled() {
            return Err(DataError::Cancelled);
        }
        let fingerprint = FetchFingerprint::of(&request);
        let attachment = self.attach(fingerprint, source, request);
        let receiver = attachment.fetch.outcome.clone();

        let result = tokio::select! {
            _ = token.cancelled() => {
                debug!(%fingerprint, "caller cancelled while waiting for fetch");
                Err(DataError::Cancelled)
            }
            outcome = wait_for_outcome(receiver) => outcome.unwrap_or_else(|| {
                Err(DataError::FetchAbandoned { fingerprint: fingerprint.to_string() })
            }),
        };
        drop(attachment);
        result
    }

    /// Cancel the running fetch for `fingerprint`. Every attached caller
    /// observes `DataError::Cancelled`. Returns false when nothing is running.
    pub fn cancel(&self, fingerprint: &FetchFingerprint) -> bool {
        match self.fetches.get(fingerprint) {
            Some(fetch) => {
                fetch.token.cancel();
                true
            }
            None => false,
        }
    }

    /// Fingerprints of the fetches currently running.
    pub fn running(&self) -> Vec<FetchFingerprint> {
        self.fetches.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.fetches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetches.is_empty()
    }

    /// Fetches spawned since creation.
    pub fn started_count(&self) -> u64 {
        self.started.load(Ordering::Relaxed)
    }

    /// Callers that joined a fetch someone else started.
    pub fn coalesced_count(&self) -> u64 {
        self.coalesced.load(Ordering::Relaxed)
    }

    fn attach(
        &self,
        fingerprint: FetchFingerprint,
        source: Arc<dyn AnswerSource>,
        request: FetchRequest,
    ) -> Attachment {
        // The waiter count changes under the shard lock so an attach never
        // races with the last detach of a fetch that is being abandoned.
        let fetch = match self.fetches.entry(fingerprint) {
            Entry::Occupied(entry) => {
                let fetch = Arc::clone(entry.get());
                fetch.waiters.fetch_add(1, Ordering::SeqCst);
                self.coalesced.fetch_add(1, Ordering::Relaxed);
                debug!(%fingerprint, "joined in-flight fetch");
                fetch
            }
            Entry::Vacant(entry) => {
                let (sender, receiver) = watch::channel(None);
                let fetch = Arc::new(InFlightFetch {
                    token: CancellationToken::new(),
                    outcome: receiver,
                    waiters: AtomicUsize::new(1),
                });
                entry.insert(Arc::clone(&fetch));
                self.started.fetch_add(1, Ordering::Relaxed);
                spawn_fetch(
                    Arc::clone(&self.fetches),
                    fingerprint,
                    Arc::clone(&fetch),
                    sender,
                    source,
                    request,
                );
                fetch
            }
        };
        Attachment {
            fetches: Arc::clone(&self.fetches),
            fingerprint,
            fetch,
        }
    }
}

fn spawn_fetch(
    fetches: Arc<FetchMap>,
    fingerprint: FetchFingerprint,
    fetch: Arc<InFlightFetch>,
    sender: watch::Sender<FetchOutcome>,
    source: Arc<dyn AnswerSource>,
    request: FetchRequest,
) {
    debug!(
        %fingerprint,
        subset = %request.subset,
        fields = request.fields.len(),
        "starting fetch"
    );
    tokio::spawn(async move {
        let token = fetch.token.clone();
        let result = tokio::select! {
            _ = token.cancelled() => Err(DataError::Cancelled),
            rows = source.load_answers(&request, &token) => rows.map(Arc::new),
        };
        match &result {
            Ok(rows) => debug!(%fingerprint, rows = rows.len(), "fetch finished"),
            Err(DataError::Cancelled) => debug!(%fingerprint, "fetch cancelled"),
            Err(error) => warn!(%fingerprint, %error, "fetch failed"),
        }
        // Remove before publishing so no new caller attaches to a finished
        // fetch, whatever its outcome.
        fetches.remove_if(&fingerprint, |_, current| Arc::ptr_eq(current, &fetch));
        sender.send_replace(Some(result));
    });
}

async fn wait_for_outcome(mut outcome: watch::Receiver<FetchOutcome>) -> FetchOutcome {
    match outcome.wait_for(Option::is_some).await {
        Ok(value) => value.clone(),
        Err(_) => None,
    }
}

/// One caller's hold on a fetch. Dropping it detaches the caller.
struct Attachment {
    fetches: Arc<FetchMap>,
    fingerprint: FetchFingerprint,
    fetch: Arc<InFlightFetch>,
}

impl Drop for Attachment {
    fn drop(&mut self) {
        let fetch = &self.fetch;
        let mut counted = false;
        let abandoned = self
            .fetches
            .remove_if(&self.fingerprint, |_, current| {
                if !Arc::ptr_eq(current, fetch) {
                    return false;
                }
                counted = true;
                fetch.waiters.fetch_sub(1, Ordering::SeqCst) == 1
            })
            .is_some();
        if !counted {
            fetch.waiters.fetch_sub(1, Ordering::SeqCst);
        }
        if abandoned {
            debug!(fingerprint = %self.fingerprint, "last caller detached, cancelling fetch");
            fetch.token.cancel();
        }
    }
}
