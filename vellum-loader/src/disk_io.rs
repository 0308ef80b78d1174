use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use vellum_base::{LibraryRecord, ResourceType};

use crate::loader::{LoadOp, LoadRequest, LoaderFactory, LoaderRegistry, ResourceLoader};

/// How a worker turns file bytes into a record payload.
#[derive(Copy, Clone, Debug)]
enum DecodeKind {
    Json,
    Text,
    Bytes,
}

impl DecodeKind {
    fn for_resource_type(resource_type: ResourceType) -> DecodeKind {
        match resource_type {
            ResourceType::Json => DecodeKind::Json,
            ResourceType::Script => DecodeKind::Text,
            ResourceType::Jpeg
            | ResourceType::Png
            | ResourceType::Mp3
            | ResourceType::Wav
            | ResourceType::Ogg => DecodeKind::Bytes,
        }
    }
}

struct DiskIORequest {
    url: String,
    decode: DecodeKind,
    op: LoadOp,
}

fn handle_request(
    root_path: &Path,
    request: DiskIORequest,
) {
    profiling::scope!("DiskIORequest");

    // cache breaker suffixes only matter to http caches
    let relative = match request.url.split_once('?') {
        Some((path, _)) => path,
        None => request.url.as_str(),
    };
    let path = root_path.join(relative);
    log::trace!("start read {:?}", path);

    let data = match std::fs::read(&path) {
        Ok(data) => data,
        Err(error) => {
            // TODO: pass the io/decode failure detail through LoadOp::error
            // once a caller needs more than the failing path
            log::debug!("read failed for {:?}: {}", path, error);
            request.op.error();
            return;
        }
    };

    match request.decode {
        DecodeKind::Json => match serde_json::from_slice(&data) {
            Ok(value) => request.op.complete(LibraryRecord::json(value)),
            Err(error) => {
                log::debug!("json decode failed for {:?}: {}", path, error);
                request.op.error();
            }
        },
        DecodeKind::Text => match String::from_utf8(data) {
            Ok(text) => request.op.complete(LibraryRecord::text(text)),
            Err(error) => {
                log::debug!("utf-8 decode failed for {:?}: {}", path, error);
                request.op.error();
            }
        },
        DecodeKind::Bytes => request.op.complete(LibraryRecord::bytes(data)),
    }
}

// Thread that takes jobs out of the request channel and ends when the finish
// channel is signalled
struct DiskIOWorkerThread {
    finish_tx: Sender<()>,
    join_handle: JoinHandle<()>,
}

impl DiskIOWorkerThread {
    fn new(
        root_path: Arc<PathBuf>,
        request_rx: Receiver<DiskIORequest>,
        thread_index: usize,
    ) -> Self {
        let (finish_tx, finish_rx) = crossbeam_channel::bounded(1);
        let join_handle = std::thread::Builder::new()
            .name("IO Thread".into())
            .spawn(move || {
                profiling::register_thread!(&format!("DiskIOWorkerThread {}", thread_index));
                loop {
                    crossbeam_channel::select! {
                        recv(request_rx) -> msg => {
                            match msg {
                                Ok(request) => handle_request(&root_path, request),
                                // every sender is gone, nothing left to do
                                Err(_) => return,
                            }
                        },
                        recv(finish_rx) -> _msg => {
                            return;
                        }
                    }
                }
            })
            .unwrap();

        DiskIOWorkerThread {
            finish_tx,
            join_handle,
        }
    }
}

/// Loads library files from disk relative to a root path, on a small pool of
/// worker threads. Pending requests whose workers are shut down report as
/// dropped ops; keep the pool alive while loads are in flight.
pub struct DiskLoaderIO {
    worker_threads: Vec<DiskIOWorkerThread>,
    request_tx: Sender<DiskIORequest>,
}

impl DiskLoaderIO {
    pub fn new(
        root_path: PathBuf,
        worker_count: usize,
    ) -> Self {
        let (request_tx, request_rx) = crossbeam_channel::unbounded();
        let root_path = Arc::new(root_path);

        let mut worker_threads = Vec::with_capacity(worker_count);
        for thread_index in 0..worker_count {
            worker_threads.push(DiskIOWorkerThread::new(
                root_path.clone(),
                request_rx.clone(),
                thread_index,
            ));
        }

        DiskLoaderIO {
            worker_threads,
            request_tx,
        }
    }
}

impl Drop for DiskLoaderIO {
    fn drop(&mut self) {
        for worker_thread in &self.worker_threads {
            let _ = worker_thread.finish_tx.send(());
        }

        for worker_thread in self.worker_threads.drain(..) {
            let _ = worker_thread.join_handle.join();
        }
    }
}

struct DiskLoaderFactory {
    request_tx: Sender<DiskIORequest>,
    decode: DecodeKind,
}

impl LoaderFactory for DiskLoaderFactory {
    fn create_loader(
        &self,
        request: LoadRequest,
        op: LoadOp,
    ) -> Option<Box<dyn ResourceLoader>> {
        Some(Box::new(DiskResourceLoader {
            request_tx: self.request_tx.clone(),
            request: DiskIORequest {
                url: request.url,
                decode: self.decode,
                op,
            },
        }))
    }
}

struct DiskResourceLoader {
    request_tx: Sender<DiskIORequest>,
    request: DiskIORequest,
}

impl ResourceLoader for DiskResourceLoader {
    fn start(self: Box<Self>) {
        let DiskResourceLoader {
            request_tx,
            request,
        } = *self;

        // a torn-down pool drops the request, which surfaces the op as
        // dropped rather than hanging the process
        let _ = request_tx.send(request);
    }
}

/// Binds every resource type to the disk pool: structured data decodes as
/// JSON, scripts as text, image and sound payloads stay raw bytes for
/// downstream decode.
pub fn default_loader_registry(io: &DiskLoaderIO) -> LoaderRegistry {
    let mut registry = LoaderRegistry::new();

    for resource_type in ResourceType::ALL {
        registry.register(
            resource_type,
            Arc::new(DiskLoaderFactory {
                request_tx: io.request_tx.clone(),
                decode: DecodeKind::for_resource_type(resource_type),
            }),
        );
    }

    registry
}
