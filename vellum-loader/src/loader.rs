use std::sync::Arc;

use crossbeam_channel::Sender;
use vellum_base::hashing::HashMap;
use vellum_base::{ContentId, LibraryRecord, ResourceType};

use crate::loading_process::LoadingProcessId;

/// One item's resolved identity and location, handed to a loader factory.
#[derive(Clone, Debug)]
pub struct LoadRequest {
    pub content_id: ContentId,
    /// Final URL: base-URL prefixed and cache-breaker suffixed as the
    /// process's configuration demands.
    pub url: String,
}

/// Outcome of one dispatched item, delivered back to the manager through its
/// result queue.
#[derive(Debug)]
pub(crate) enum ItemOutcome {
    Loaded(LibraryRecord),
    Failed,
    TimedOut,
    /// The loader dropped its op without reporting anything.
    Dropped,
}

#[derive(Debug)]
pub(crate) struct ItemLoadResult {
    pub process_id: LoadingProcessId,
    pub content_id: ContentId,
    pub library_file_path: String,
    pub outcome: ItemOutcome,
}

/// Exactly-once outcome channel for one dispatched item.
///
/// A well-behaved loader eventually calls exactly one of [`complete`],
/// [`error`] or [`timed_out`]. Dropping the op without reporting is surfaced
/// to the manager as a failure rather than hanging the process forever.
///
/// [`complete`]: LoadOp::complete
/// [`error`]: LoadOp::error
/// [`timed_out`]: LoadOp::timed_out
pub struct LoadOp {
    sender: Option<Sender<ItemLoadResult>>,
    process_id: LoadingProcessId,
    content_id: ContentId,
    library_file_path: String,
}

impl LoadOp {
    pub(crate) fn new(
        sender: Sender<ItemLoadResult>,
        process_id: LoadingProcessId,
        content_id: ContentId,
        library_file_path: String,
    ) -> Self {
        LoadOp {
            sender: Some(sender),
            process_id,
            content_id,
            library_file_path,
        }
    }

    pub fn content_id(&self) -> &ContentId {
        &self.content_id
    }

    /// Signals that the item loaded successfully.
    pub fn complete(
        mut self,
        record: LibraryRecord,
    ) {
        self.send(ItemOutcome::Loaded(record));
    }

    /// Signals that the item failed to load. Fatal for the whole enclosing
    /// process.
    pub fn error(mut self) {
        self.send(ItemOutcome::Failed);
    }

    /// Signals that the item timed out. Handled identically to an error.
    pub fn timed_out(mut self) {
        self.send(ItemOutcome::TimedOut);
    }

    fn send(
        &mut self,
        outcome: ItemOutcome,
    ) {
        if let Some(sender) = self.sender.take() {
            // the receiving manager may already be gone during teardown
            let _ = sender.send(ItemLoadResult {
                process_id: self.process_id,
                content_id: self.content_id.clone(),
                library_file_path: self.library_file_path.clone(),
                outcome,
            });
        }
    }
}

impl Drop for LoadOp {
    fn drop(&mut self) {
        if self.sender.is_some() {
            log::error!(
                "load op for {:?} dropped without reporting an outcome",
                self.content_id
            );
            self.send(ItemOutcome::Dropped);
        }
    }
}

/// Starts one asynchronous load. Fire-and-forget: after `start` the only
/// further interaction is the op reporting its outcome.
pub trait ResourceLoader: Send {
    fn start(self: Box<Self>);
}

/// Constructs a loader for one (request, op) pair. Returning `None` means
/// nothing constructible exists for this request, which aborts the enclosing
/// `load` call.
pub trait LoaderFactory: Send + Sync {
    fn create_loader(
        &self,
        request: LoadRequest,
        op: LoadOp,
    ) -> Option<Box<dyn ResourceLoader>>;
}

/// Closed mapping from resource type to loader factory. Registration is
/// keyed by [`ResourceType`], so extension inference can only ever resolve
/// to a type the registry was built against.
#[derive(Default, Clone)]
pub struct LoaderRegistry {
    factories: HashMap<ResourceType, Arc<dyn LoaderFactory>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn register(
        &mut self,
        resource_type: ResourceType,
        factory: Arc<dyn LoaderFactory>,
    ) {
        self.factories.insert(resource_type, factory);
    }

    pub fn get(
        &self,
        resource_type: ResourceType,
    ) -> Option<&Arc<dyn LoaderFactory>> {
        self.factories.get(&resource_type)
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}
