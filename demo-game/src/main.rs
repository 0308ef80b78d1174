use std::path::PathBuf;
use std::time::{Duration, Instant};

use vellum_base::hashing::HashMap;
use vellum_base::ContentId;
use vellum_loader::{
    default_loader_registry, DiskLoaderIO, LibraryEvent, LibraryManager, LibrarySettings,
    LoadConfig,
};

pub fn library_root_path() -> PathBuf {
    PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/data"))
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Debug)
        .init();

    let io = DiskLoaderIO::new(library_root_path(), 4);

    let mut manager = LibraryManager::new(LibrarySettings::default());
    manager.init_loaders(default_loader_registry(&io));
    let events = manager.subscribe_events();

    let mut requested = HashMap::default();
    requested.insert(
        ContentId::new("demo.assets.logo"),
        "demo/assets/logo.json".to_string(),
    );
    requested.insert(
        ContentId::new("demo.assets.theme"),
        "demo/assets/theme.json".to_string(),
    );
    let requested_ids: Vec<_> = requested.keys().cloned().collect();

    // Load the metadata batch, then chain a resource batch for every file
    // the metadata declares.
    manager
        .load(
            requested,
            LoadConfig {
                name: Some("metadata".to_string()),
                ..Default::default()
            },
            Some(Box::new(move |manager: &mut LibraryManager| {
                let mut resources = HashMap::default();
                for content_id in &requested_ids {
                    let file = manager
                        .get_meta_data(content_id)
                        .and_then(|record| record.resource_file())
                        .map(|file| file.to_string());

                    if let Some(file) = file {
                        resources.insert(content_id.clone(), file);
                    }
                }

                if resources.is_empty() {
                    return;
                }

                manager
                    .load(
                        resources,
                        LoadConfig {
                            name: Some("resources".to_string()),
                            is_meta_data_load: false,
                            ..Default::default()
                        },
                        None,
                    )
                    .expect("resource batch");
            })),
        )
        .expect("metadata batch");

    let deadline = Instant::now() + Duration::from_secs(10);
    'pump: loop {
        if let Err(error) = manager.update() {
            log::error!("loading failed: {}", error);
            std::process::exit(1);
        }

        for event in events.try_iter() {
            match event {
                LibraryEvent::ResourceProgress {
                    name,
                    fraction,
                    num_completed,
                    total,
                } => {
                    println!(
                        "[{}] {:.0}% ({}/{})",
                        name,
                        fraction * 100.0,
                        num_completed,
                        total
                    );
                }
                LibraryEvent::ResourceLoadingCompleted { name, records } => {
                    println!("[{}] completed with {} records", name, records.len());
                    if name == "resources" {
                        break 'pump;
                    }
                }
            }
        }

        if Instant::now() > deadline {
            log::error!("timed out waiting for the library to load");
            std::process::exit(1);
        }

        std::thread::sleep(Duration::from_millis(5));
    }

    let loaded: Vec<_> = ["demo.assets.logo", "demo.assets.theme"]
        .into_iter()
        .map(ContentId::new)
        .collect();
    println!("all available: {}", manager.is_available(&loaded));
}
