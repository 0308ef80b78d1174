use vellum_base::hashing::HashMap;
use vellum_base::{ContentId, LibraryRecord, ResourceTypeSelection};

use crate::library_manager::LibraryManager;

/// Id of one in-flight loading process, allocated by the library manager.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadingProcessId(pub u64);

/// Invoked once with the subset of the cache corresponding to the process's
/// requested ids.
pub type OnLoadingCompleted = Box<dyn FnOnce(HashMap<ContentId, LibraryRecord>) + Send>;

/// Invoked strictly after a process's completion handling finishes. Receives
/// the manager so a chained `load` call can be issued; it observes every
/// cache write the completed process made.
pub type Continuation = Box<dyn FnOnce(&mut LibraryManager) + Send>;

/// Per-call configuration surface of [`LibraryManager::load`].
pub struct LoadConfig {
    /// Event topic. Progress and batch-completed events are published only
    /// for named processes.
    pub name: Option<String>,
    /// Explicit resource type, or inference from each file path's extension.
    pub resource_type: ResourceTypeSelection,
    /// Bypass cache lookups (never cache writes) for this call.
    pub omit_cache: bool,
    /// Selects the metadata tier (default) or the resource tier.
    pub is_meta_data_load: bool,
    pub on_loading_completed: Option<OnLoadingCompleted>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        LoadConfig {
            name: None,
            resource_type: ResourceTypeSelection::Auto,
            omit_cache: false,
            is_meta_data_load: true,
            on_loading_completed: None,
        }
    }
}

/// Tracking record for one in-flight batch request. Lives in the manager's
/// in-flight table exactly while `num_completed < requested.len()`.
pub(crate) struct LoadingProcess {
    pub id: LoadingProcessId,
    pub requested: HashMap<ContentId, String>,
    pub num_completed: usize,
    pub name: Option<String>,
    pub is_meta_data_load: bool,
    pub on_loading_completed: Option<OnLoadingCompleted>,
    pub next: Option<Continuation>,
}
