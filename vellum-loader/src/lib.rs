pub mod cache;
mod disk_io;
pub mod events;
mod library_manager;
mod loader;
mod loading_process;

pub use crate::cache::LibraryCache;
pub use crate::disk_io::{default_loader_registry, DiskLoaderIO};
pub use crate::events::{EventPublisher, LibraryEvent};
pub use crate::library_manager::{LibraryManager, LibrarySettings, LoadError};
pub use crate::loader::{LoadOp, LoadRequest, LoaderFactory, LoaderRegistry, ResourceLoader};
pub use crate::loading_process::{Continuation, LoadConfig, LoadingProcessId, OnLoadingCompleted};
