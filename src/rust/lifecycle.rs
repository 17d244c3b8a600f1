use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::catalog::ModelDescriptor;
use crate::engine::{
    ClassificationEngine, ClassifierHandle, ClassifierOptions, EngineError, RunMode,
};

/// The IMAGE and VIDEO classifiers built from one model
pub struct ClassifierPair {
    pub image: Box<dyn ClassifierHandle>,
    pub video: Box<dyn ClassifierHandle>,
}

impl ClassifierPair {
    pub fn close(&mut self) {
        self.image.close();
        self.video.close();
    }
}

impl std::fmt::Debug for ClassifierPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierPair")
            .field("image_closed", &self.image.is_closed())
            .field("video_closed", &self.video.is_closed())
            .finish()
    }
}

/// Ticket identifying one model load request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub generation: u64,
}

/// Outcome of handing a finished load back to the lifecycle manager
#[derive(Debug, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The pair is now the active pair
    Published,
    /// A newer request was started meanwhile; the pair was closed
    Stale,
}

/// Shared with load tasks: the latest load generation and the lock that
/// serializes pair construction.
#[derive(Debug, Clone, Default)]
pub struct LoadGate {
    generation: Arc<AtomicU64>,
    build_lock: Arc<Mutex<()>>,
}

/// Exclusive right to build a pair. Held from the start of a build until its
/// result has been committed or closed, so no other build overlaps it.
#[derive(Debug)]
pub struct LoadPermit(OwnedMutexGuard<()>);

impl LoadGate {
    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket.generation
    }

    pub async fn acquire(&self) -> LoadPermit {
        LoadPermit(Arc::clone(&self.build_lock).lock_owned().await)
    }

    /// Like [`acquire`](Self::acquire), but fails instead of waiting
    pub fn try_acquire(&self) -> Option<LoadPermit> {
        Arc::clone(&self.build_lock).try_lock_owned().ok().map(LoadPermit)
    }

    fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn advance(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Builds both handles for a descriptor. If the VIDEO handle fails after the
/// IMAGE handle was built, the IMAGE handle is closed before returning.
pub async fn build_pair(
    engine: &dyn ClassificationEngine,
    descriptor: &ModelDescriptor,
    options: ClassifierOptions,
) -> Result<ClassifierPair, EngineError> {
    build_pair_while(engine, descriptor, options, || true).await
}

/// Builds the pair for `ticket` once no other build is running.
///
/// Gives up with [`EngineError::Superseded`] as soon as a newer load has
/// started, before each handle is created. The returned permit must be kept
/// until the result has been handed to [`ClassifierLifecycle`].
pub async fn build_current_pair(
    engine: &dyn ClassificationEngine,
    descriptor: &ModelDescriptor,
    options: ClassifierOptions,
    ticket: LoadTicket,
    gate: &LoadGate,
) -> (Result<ClassifierPair, EngineError>, LoadPermit) {
    let permit = gate.acquire().await;
    let result = build_pair_while(engine, descriptor, options, || gate.is_current(ticket)).await;
    (result, permit)
}

async fn build_pair_while(
    engine: &dyn ClassificationEngine,
    descriptor: &ModelDescriptor,
    options: ClassifierOptions,
    wanted: impl Fn() -> bool,
) -> Result<ClassifierPair, EngineError> {
    if !wanted() {
        debug!("Skipping superseded load of '{}'", descriptor.name);
        return Err(EngineError::Superseded);
    }
    let mut image = engine
        .create_classifier(descriptor, RunMode::Image, options.clone())
        .await?;
    if !wanted() {
        image.close();
        return Err(EngineError::Superseded);
    }
    match engine.create_classifier(descriptor, RunMode::Video, options).await {
        Ok(video) => Ok(ClassifierPair { image, video }),
        Err(e) => {
            image.close();
            Err(e)
        }
    }
}

/// Owns the active classifier pair.
///
/// Every load request bumps the generation and disposes the current pair
/// first, so at most one pair is ever live. Results of superseded requests
/// are closed on arrival instead of being published.
#[derive(Debug, Default)]
pub struct ClassifierLifecycle {
    active: Option<ClassifierPair>,
    active_descriptor: Option<ModelDescriptor>,
    gate: LoadGate,
    loading: bool,
}

impl ClassifierLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disposes the current pair and returns the ticket for a new load
    pub fn begin_load(&mut self) -> LoadTicket {
        self.dispose();
        let generation = self.gate.advance();
        self.loading = true;
        info!("Starting model load generation {}", generation);
        LoadTicket { generation }
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.gate.is_current(ticket)
    }

    /// Handle for load tasks to check their ticket and serialize builds
    pub fn gate(&self) -> LoadGate {
        self.gate.clone()
    }

    /// Publishes a finished pair if its ticket is still the latest
    pub fn commit(
        &mut self,
        ticket: LoadTicket,
        descriptor: ModelDescriptor,
        mut pair: ClassifierPair,
    ) -> CommitOutcome {
        if !self.is_current(ticket) {
            warn!(
                "Discarding stale model '{}' (generation {}, current {})",
                descriptor.name,
                ticket.generation,
                self.gate.current()
            );
            pair.close();
            return CommitOutcome::Stale;
        }
        // Never two live pairs
        self.dispose();
        info!("Model '{}' active (generation {})", descriptor.name, ticket.generation);
        self.active = Some(pair);
        self.active_descriptor = Some(descriptor);
        self.loading = false;
        CommitOutcome::Published
    }

    /// Records a failed load. Returns false if the failure belongs to a
    /// superseded request and should be ignored.
    pub fn fail(&mut self, ticket: LoadTicket) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.loading = false;
        true
    }

    /// Closes and drops the active pair, if any
    pub fn dispose(&mut self) {
        if let Some(mut pair) = self.active.take() {
            info!("Disposing classifier pair");
            pair.close();
        }
        self.active_descriptor = None;
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn generation(&self) -> u64 {
        self.gate.current()
    }

    pub fn active_descriptor(&self) -> Option<&ModelDescriptor> {
        self.active_descriptor.as_ref()
    }

    pub fn image_handle(&self) -> Option<&dyn ClassifierHandle> {
        self.active.as_ref().map(|pair| &*pair.image)
    }

    pub fn video_handle(&self) -> Option<&dyn ClassifierHandle> {
        self.active.as_ref().map(|pair| &*pair.video)
    }

    pub fn video_handle_mut(&mut self) -> Option<&mut dyn ClassifierHandle> {
        match self.active.as_mut() {
            Some(pair) => Some(&mut *pair.video),
            None => None,
        }
    }
}
