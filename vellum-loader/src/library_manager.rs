use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;
use vellum_base::hashing::HashMap;
use vellum_base::{
    url_with_cache_breaker, ContentId, LibraryRecord, ResourceType, ResourceTypeSelection,
};

use crate::cache::LibraryCache;
use crate::events::{EventPublisher, LibraryEvent};
use crate::loader::{ItemLoadResult, ItemOutcome, LoadOp, LoadRequest, LoaderFactory, LoaderRegistry};
use crate::loading_process::{
    Continuation, LoadConfig, LoadingProcess, LoadingProcessId, OnLoadingCompleted,
};

/// Errors surfaced by [`LibraryManager::load`] and
/// [`LibraryManager::update`].
///
/// Configuration errors (`NotInitialized`, `EmptyRequest`, `UnresolvedType`)
/// surface before any async work starts and leave no process registered.
/// Dispatch errors (`UnregisteredType`, `LoaderConstruction`) abort just the
/// offending `load` call. Item failures are fatal for their whole process:
/// no partial results, no retry.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("library manager is not initialized with any loader factories")]
    NotInitialized,

    #[error("no library file paths provided")]
    EmptyRequest,

    #[error("unable to derive a resource type for library file {library_file_path:?}")]
    UnresolvedType { library_file_path: String },

    #[error(
        "no loader factory registered for resource type {resource_type:?} (library file {library_file_path:?})"
    )]
    UnregisteredType {
        resource_type: ResourceType,
        library_file_path: String,
    },

    #[error("could not create a loader for library file {library_file_path:?}")]
    LoaderConstruction { library_file_path: String },

    #[error(
        "loading library file {library_file_path:?} ({content_id}) from loading process {process_id:?} failed"
    )]
    ItemFailed {
        process_id: LoadingProcessId,
        content_id: ContentId,
        library_file_path: String,
    },

    #[error(
        "loading library file {library_file_path:?} ({content_id}) from loading process {process_id:?} timed out"
    )]
    ItemTimedOut {
        process_id: LoadingProcessId,
        content_id: ContentId,
        library_file_path: String,
    },

    #[error(
        "loader for library file {library_file_path:?} ({content_id}) from loading process {process_id:?} dropped its op without reporting"
    )]
    ItemDropped {
        process_id: LoadingProcessId,
        content_id: ContentId,
        library_file_path: String,
    },
}

/// Construction-time settings for the library manager.
#[derive(Clone, Debug, Default)]
pub struct LibrarySettings {
    /// Base URL prefixed onto every library file path.
    pub library_url: Option<String>,
    /// Append a cache-busting token to every resolved URL. Usually tied to
    /// running outside of deployed mode.
    pub invalidate_cache: bool,
}

/// What `load` decided to do with one requested item, resolved fully before
/// any state is mutated so planning errors leave nothing behind.
enum PlannedItem {
    CacheHit {
        content_id: ContentId,
        record: LibraryRecord,
    },
    Dispatch {
        content_id: ContentId,
        library_file_path: String,
        factory: Arc<dyn LoaderFactory>,
        url: String,
    },
}

/// A process that just reached `num_completed == total`, pulled out of the
/// in-flight table. Callbacks and events still have to run, in order.
struct FinishedProcess {
    id: LoadingProcessId,
    name: Option<String>,
    records: HashMap<ContentId, LibraryRecord>,
    on_loading_completed: Option<OnLoadingCompleted>,
    next: Option<Continuation>,
}

/// The load orchestrator. Owns the two-tier cache, the loader registry and
/// the table of in-flight loading processes; drives per-item dispatch, the
/// progress/completion arithmetic and phase chaining.
///
/// All cache and process mutation happens on the thread calling [`load`] and
/// [`update`]; loaders run wherever they like and marshal their results back
/// through an internal queue.
///
/// [`load`]: LibraryManager::load
/// [`update`]: LibraryManager::update
pub struct LibraryManager {
    settings: LibrarySettings,
    cache: LibraryCache,
    loader_factories: Option<LoaderRegistry>,
    loading_processes: HashMap<LoadingProcessId, LoadingProcess>,
    next_loading_process_id: u64,
    publisher: EventPublisher,
    results_tx: Sender<ItemLoadResult>,
    results_rx: Receiver<ItemLoadResult>,
}

impl LibraryManager {
    pub fn new(settings: LibrarySettings) -> Self {
        let (results_tx, results_rx) = crossbeam_channel::unbounded();

        LibraryManager {
            settings,
            cache: LibraryCache::new(),
            loader_factories: None,
            loading_processes: HashMap::default(),
            next_loading_process_id: 0,
            publisher: EventPublisher::new(),
            results_tx,
            results_rx,
        }
    }

    /// Binds the loader factories. Must happen before the first `load` call;
    /// the factories carry the live IO contexts the loaders run against.
    pub fn init_loaders(
        &mut self,
        registry: LoaderRegistry,
    ) {
        self.loader_factories = Some(registry);
    }

    pub fn subscribe_events(&mut self) -> Receiver<LibraryEvent> {
        self.publisher.subscribe()
    }

    /// Requests a batch load of `requested` (content id -> library file
    /// path) and returns the process id without waiting for any item.
    ///
    /// Items already present in the process's cache tier complete
    /// synchronously inside this call (unless `omit_cache` is set); all
    /// others are dispatched to their loaders and complete during a later
    /// [`update`](LibraryManager::update). When the last item completes the
    /// process fires its completion callback, its batch-completed event and
    /// finally its continuation.
    pub fn load(
        &mut self,
        requested: HashMap<ContentId, String>,
        config: LoadConfig,
        next: Option<Continuation>,
    ) -> Result<LoadingProcessId, LoadError> {
        let registry = match &self.loader_factories {
            Some(registry) if !registry.is_empty() => registry,
            _ => return Err(LoadError::NotInitialized),
        };

        if requested.is_empty() {
            return Err(LoadError::EmptyRequest);
        }

        let is_meta_data_load = config.is_meta_data_load;

        // Resolve every item before touching any state, so a planning error
        // leaves no process registered and no loader started.
        let mut plan = Vec::with_capacity(requested.len());
        for (content_id, library_file_path) in &requested {
            if !config.omit_cache {
                if let Some(record) = self.cache.tier(is_meta_data_load).get(content_id) {
                    plan.push(PlannedItem::CacheHit {
                        content_id: content_id.clone(),
                        record: record.clone(),
                    });
                    continue;
                }
            }

            let resource_type = match config.resource_type {
                ResourceTypeSelection::Explicit(resource_type) => resource_type,
                ResourceTypeSelection::Auto => {
                    ResourceType::from_library_file_path(library_file_path).ok_or_else(|| {
                        LoadError::UnresolvedType {
                            library_file_path: library_file_path.clone(),
                        }
                    })?
                }
            };

            let factory =
                registry
                    .get(resource_type)
                    .cloned()
                    .ok_or_else(|| LoadError::UnregisteredType {
                        resource_type,
                        library_file_path: library_file_path.clone(),
                    })?;

            plan.push(PlannedItem::Dispatch {
                content_id: content_id.clone(),
                library_file_path: library_file_path.clone(),
                factory,
                url: self.resolve_url(library_file_path),
            });
        }

        let process_id = self.allocate_loading_process_id();
        log::debug!(
            "loading process {:?} starts with {} items",
            process_id,
            requested.len()
        );

        self.loading_processes.insert(
            process_id,
            LoadingProcess {
                id: process_id,
                requested,
                num_completed: 0,
                name: config.name,
                is_meta_data_load,
                on_loading_completed: config.on_loading_completed,
                next,
            },
        );

        for item in plan {
            match item {
                PlannedItem::CacheHit { content_id, record } => {
                    log::trace!("cache hit for {:?}", content_id);
                    if let Some(finished) = self.complete_item(process_id, content_id, record) {
                        self.finish_process(finished);
                    }
                }
                PlannedItem::Dispatch {
                    content_id,
                    library_file_path,
                    factory,
                    url,
                } => {
                    log::trace!("dispatching {:?} from {:?}", content_id, url);
                    let op = LoadOp::new(
                        self.results_tx.clone(),
                        process_id,
                        content_id.clone(),
                        library_file_path.clone(),
                    );
                    let request = LoadRequest { content_id, url };

                    match factory.create_loader(request, op) {
                        Some(loader) => loader.start(),
                        None => {
                            // Aborts just this call. Results from loaders
                            // that already started race in later and are
                            // dropped by the table lookup in update().
                            self.loading_processes.remove(&process_id);
                            return Err(LoadError::LoaderConstruction { library_file_path });
                        }
                    }
                }
            }
        }

        Ok(process_id)
    }

    /// Drains completed loader results and applies them on the calling
    /// thread. Returns the first item failure observed; the queue is drained
    /// fully either way so unrelated processes keep making progress.
    #[profiling::function]
    pub fn update(&mut self) -> Result<(), LoadError> {
        let mut first_failure = None;

        while let Ok(result) = self.results_rx.try_recv() {
            match result.outcome {
                ItemOutcome::Loaded(record) => {
                    if let Some(finished) =
                        self.complete_item(result.process_id, result.content_id, record)
                    {
                        self.finish_process(finished);
                    }
                }
                ItemOutcome::Failed => {
                    self.fail_process(
                        LoadError::ItemFailed {
                            process_id: result.process_id,
                            content_id: result.content_id,
                            library_file_path: result.library_file_path,
                        },
                        &mut first_failure,
                    );
                }
                ItemOutcome::TimedOut => {
                    self.fail_process(
                        LoadError::ItemTimedOut {
                            process_id: result.process_id,
                            content_id: result.content_id,
                            library_file_path: result.library_file_path,
                        },
                        &mut first_failure,
                    );
                }
                ItemOutcome::Dropped => {
                    self.fail_process(
                        LoadError::ItemDropped {
                            process_id: result.process_id,
                            content_id: result.content_id,
                            library_file_path: result.library_file_path,
                        },
                        &mut first_failure,
                    );
                }
            }
        }

        match first_failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    //
    // Cache accessors
    //

    pub fn get(
        &self,
        content_id: &ContentId,
    ) -> Option<&LibraryRecord> {
        self.cache.get(content_id)
    }

    pub fn get_meta_data(
        &self,
        content_id: &ContentId,
    ) -> Option<&LibraryRecord> {
        self.cache.get_meta_data(content_id)
    }

    pub fn get_resource(
        &self,
        content_id: &ContentId,
    ) -> Option<&LibraryRecord> {
        self.cache.get_resource(content_id)
    }

    pub fn meta_data_records_by_type(
        &self,
        declared_type: &str,
    ) -> HashMap<ContentId, LibraryRecord> {
        self.cache.meta_data_records_by_type(declared_type)
    }

    pub fn add_to_cache(
        &mut self,
        content: HashMap<String, LibraryRecord>,
    ) {
        self.cache.add_to_cache(content);
    }

    pub fn is_available(
        &self,
        content_ids: &[ContentId],
    ) -> bool {
        self.cache.is_available(content_ids)
    }

    pub fn free(&mut self) {
        self.cache.free();
    }

    #[cfg(test)]
    pub(crate) fn in_flight_process_count(&self) -> usize {
        self.loading_processes.len()
    }

    //
    // Completion path
    //

    /// One item finished successfully. Stores the record, advances the
    /// process, publishes progress, and hands back the process if this was
    /// its last outstanding item.
    fn complete_item(
        &mut self,
        process_id: LoadingProcessId,
        content_id: ContentId,
        record: LibraryRecord,
    ) -> Option<FinishedProcess> {
        let Some(process) = self.loading_processes.get_mut(&process_id) else {
            // the process failed or was aborted after this item started
            log::trace!(
                "dropping late result for unknown loading process {:?}",
                process_id
            );
            return None;
        };

        self.cache
            .tier_mut(process.is_meta_data_load)
            .insert(content_id, record);

        process.num_completed += 1;

        let total = process.requested.len();
        let fraction = process.num_completed as f32 / total as f32;

        if let Some(name) = &process.name {
            self.publisher.publish(LibraryEvent::ResourceProgress {
                name: name.clone(),
                fraction,
                num_completed: process.num_completed,
                total,
            });
        }

        if process.num_completed < total {
            return None;
        }

        // The process never outlives its own completion.
        let process = self.loading_processes.remove(&process_id)?;

        if process.is_meta_data_load {
            self.cache.attach_namespace_and_name(process.requested.keys());
        }

        let records = self
            .cache
            .collect(process.is_meta_data_load, process.requested.keys());

        Some(FinishedProcess {
            id: process.id,
            name: process.name,
            records,
            on_loading_completed: process.on_loading_completed,
            next: process.next,
        })
    }

    /// Runs a finished process's completion side effects in order: direct
    /// callback, batch-completed event, continuation.
    fn finish_process(
        &mut self,
        finished: FinishedProcess,
    ) {
        log::debug!("loading process {:?} completed", finished.id);

        if let Some(on_loading_completed) = finished.on_loading_completed {
            on_loading_completed(finished.records.clone());
        }

        if let Some(name) = finished.name {
            self.publisher.publish(LibraryEvent::ResourceLoadingCompleted {
                name,
                records: finished.records,
            });
        }

        if let Some(next) = finished.next {
            // Chains e.g. a metadata batch into a resource batch; the
            // continuation observes every cache write this process made.
            next(self);
        }
    }

    /// Fail-fast: one failing item abandons the whole process. Its callbacks
    /// and continuation never run.
    fn fail_process(
        &mut self,
        error: LoadError,
        first_failure: &mut Option<LoadError>,
    ) {
        let process_id = match &error {
            LoadError::ItemFailed { process_id, .. }
            | LoadError::ItemTimedOut { process_id, .. }
            | LoadError::ItemDropped { process_id, .. } => *process_id,
            _ => unreachable!("fail_process is only fed item failures"),
        };

        if self.loading_processes.remove(&process_id).is_none() {
            log::trace!(
                "dropping late result for unknown loading process {:?}",
                process_id
            );
            return;
        }

        log::error!("{}", error);

        if first_failure.is_none() {
            *first_failure = Some(error);
        }
    }

    fn resolve_url(
        &self,
        library_file_path: &str,
    ) -> String {
        let url = match &self.settings.library_url {
            Some(library_url) => format!("{}/{}", library_url, library_file_path),
            None => library_file_path.to_string(),
        };

        if self.settings.invalidate_cache {
            url_with_cache_breaker(&url)
        } else {
            url
        }
    }

    fn allocate_loading_process_id(&mut self) -> LoadingProcessId {
        let process_id = LoadingProcessId(self.next_loading_process_id);
        self.next_loading_process_id += 1;
        process_id
    }
}
