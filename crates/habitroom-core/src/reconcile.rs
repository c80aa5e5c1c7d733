//! Realtime-driven collection snapshots.
//!
//! Each [`CollectionFeed`] owns one background task. The task fetches the
//! whole collection once, then waits for [`ChangeEvent`]s. A burst of events
//! is coalesced into a single refetch, and since only the task fetches there
//! is never more than one request in flight per collection, so responses
//! cannot be applied out of order.
//!
//! Every feed is bound to a [`ScreenScope`]. Cancelling the scope stops the
//! task and drops whatever fetch is in flight; nothing fetched after
//! cancellation is published.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::backend::{ChangeEvent, ChangeKind};
use crate::error::CoreError;

/// Cancellation token for everything started on behalf of one screen.
#[derive(Debug, Clone)]
pub struct ScreenScope {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl ScreenScope {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the scope is cancelled.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // The sender lives as long as any clone of the scope, including self.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for ScreenScope {
    fn default() -> Self {
        Self::new()
    }
}

/// Which change kinds cause a refetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefetchPolicy {
    pub on_create: bool,
    pub on_update: bool,
    pub on_delete: bool,
}

impl RefetchPolicy {
    pub fn all() -> Self {
        Self {
            on_create: true,
            on_update: true,
            on_delete: true,
        }
    }

    pub fn only(kinds: &[ChangeKind]) -> Self {
        Self {
            on_create: kinds.contains(&ChangeKind::Create),
            on_update: kinds.contains(&ChangeKind::Update),
            on_delete: kinds.contains(&ChangeKind::Delete),
        }
    }

    pub fn triggers(&self, kind: ChangeKind) -> bool {
        match kind {
            ChangeKind::Create => self.on_create,
            ChangeKind::Update => self.on_update,
            ChangeKind::Delete => self.on_delete,
        }
    }
}

impl Default for RefetchPolicy {
    fn default() -> Self {
        Self::all()
    }
}

/// A versioned copy of a collection. Version 0 means nothing fetched yet;
/// each successful fetch bumps it by one.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub version: u64,
    pub items: Vec<T>,
}

impl<T> Snapshot<T> {
    pub fn new(version: u64, items: Vec<T>) -> Self {
        Self { version, items }
    }

    pub fn is_loaded(&self) -> bool {
        self.version > 0
    }
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            version: 0,
            items: Vec::new(),
        }
    }
}

/// Live snapshot of one collection, kept fresh by change events.
pub struct CollectionFeed<T> {
    snapshots: watch::Receiver<Snapshot<T>>,
    task: JoinHandle<()>,
}

impl<T> CollectionFeed<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start the feed task.
    ///
    /// `fetch` loads the whole collection. `events` is usually fed by a
    /// realtime subscription; the task ends when it closes or `scope` is
    /// cancelled.
    pub fn spawn<F, Fut>(
        name: &'static str,
        fetch: F,
        events: mpsc::Receiver<ChangeEvent>,
        policy: RefetchPolicy,
        debounce: Duration,
        scope: ScreenScope,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>, CoreError>> + Send + 'static,
    {
        let (tx, snapshots) = watch::channel(Snapshot::default());
        let task = tokio::spawn(run_feed(name, fetch, events, policy, debounce, scope, tx));
        Self { snapshots, task }
    }

    /// Receiver that is notified on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot<T>> {
        self.snapshots.clone()
    }

    pub fn current(&self) -> Snapshot<T> {
        self.snapshots.borrow().clone()
    }

    /// Whether the feed task has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the feed task to stop.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "feed task ended abnormally");
        }
    }
}

async fn run_feed<T, F, Fut>(
    name: &'static str,
    fetch: F,
    mut events: mpsc::Receiver<ChangeEvent>,
    policy: RefetchPolicy,
    debounce: Duration,
    scope: ScreenScope,
    tx: watch::Sender<Snapshot<T>>,
) where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Vec<T>, CoreError>>,
{
    let mut version = 0u64;

    if !refetch(name, &fetch, &scope, &tx, &mut version).await {
        return;
    }

    loop {
        let first = tokio::select! {
            biased;
            _ = scope.cancelled() => break,
            event = events.recv() => event,
        };
        let Some(first) = first else {
            break;
        };

        let mut coalesced = 1usize;
        let mut wanted = policy.triggers(first.kind);
        let window = tokio::time::sleep(debounce);
        tokio::pin!(window);

        let mut closed = false;
        while !closed {
            tokio::select! {
                biased;
                _ = scope.cancelled() => return,
                _ = &mut window => break,
                event = events.recv() => match event {
                    Some(event) => {
                        coalesced += 1;
                        wanted |= policy.triggers(event.kind);
                    }
                    None => closed = true,
                },
            }
        }

        if wanted {
            tracing::debug!(feed = name, events = coalesced, "refetching");
            if !refetch(name, &fetch, &scope, &tx, &mut version).await {
                return;
            }
        }
        if closed {
            break;
        }
    }

    tracing::debug!(feed = name, "feed stopped");
}

/// One fetch. Returns false when the scope was cancelled, in which case
/// nothing is published.
async fn refetch<T, F, Fut>(
    name: &'static str,
    fetch: &F,
    scope: &ScreenScope,
    tx: &watch::Sender<Snapshot<T>>,
    version: &mut u64,
) -> bool
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Vec<T>, CoreError>>,
{
    let result = tokio::select! {
        biased;
        _ = scope.cancelled() => {
            tracing::debug!(feed = name, "dropping in-flight fetch");
            return false;
        }
        result = fetch() => result,
    };

    if scope.is_cancelled() {
        tracing::debug!(feed = name, "discarding response after cancellation");
        return false;
    }

    match result {
        Ok(items) => {
            *version += 1;
            tx.send_replace(Snapshot::new(*version, items));
        }
        Err(e) => {
            tracing::warn!(feed = name, error = %e, "fetch failed, keeping previous snapshot")
        }
    }
    true
}
