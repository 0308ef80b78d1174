use vellum_base::hashing::HashMap;
use vellum_base::{ContentId, LibraryRecord, ResourceType};

/// Two-tier keyed store backing the library manager.
///
/// The metadata tier holds descriptive records, the resource tier the
/// heavyweight payloads those records reference. The tiers are disjoint;
/// which one a loading process reads and writes is selected by its
/// `is_meta_data_load` flag.
#[derive(Default)]
pub struct LibraryCache {
    meta_data: HashMap<ContentId, LibraryRecord>,
    resource: HashMap<ContentId, LibraryRecord>,
}

impl LibraryCache {
    pub fn new() -> Self {
        Default::default()
    }

    /// Looks an id up in the metadata tier first, then the resource tier.
    pub fn get(
        &self,
        content_id: &ContentId,
    ) -> Option<&LibraryRecord> {
        self.meta_data
            .get(content_id)
            .or_else(|| self.resource.get(content_id))
    }

    pub fn get_meta_data(
        &self,
        content_id: &ContentId,
    ) -> Option<&LibraryRecord> {
        self.meta_data.get(content_id)
    }

    pub fn get_resource(
        &self,
        content_id: &ContentId,
    ) -> Option<&LibraryRecord> {
        self.resource.get(content_id)
    }

    /// All metadata records whose declared type matches.
    pub fn meta_data_records_by_type(
        &self,
        declared_type: &str,
    ) -> HashMap<ContentId, LibraryRecord> {
        self.meta_data
            .iter()
            .filter(|(_, record)| record.declared_type() == Some(declared_type))
            .map(|(content_id, record)| (content_id.clone(), record.clone()))
            .collect()
    }

    /// Bulk-merges externally supplied records into the metadata tier, used
    /// for out-of-band injection such as hot updates. Keys are library file
    /// paths; they are converted to content ids, except script files which
    /// keep their full path as key.
    pub fn add_to_cache(
        &mut self,
        content: HashMap<String, LibraryRecord>,
    ) {
        for (library_file_path, record) in content {
            let is_script = ResourceType::from_library_file_path(&library_file_path)
                == Some(ResourceType::Script);

            let content_id = if is_script {
                ContentId::new(library_file_path)
            } else {
                ContentId::from_library_file_path(&library_file_path)
            };

            self.meta_data.insert(content_id, record);
        }

        for (content_id, record) in self.meta_data.iter_mut() {
            record.attach_namespace_and_name(content_id);
        }
    }

    /// Whether every id has a metadata entry and, where that entry declares
    /// an associated resource file, a resource-tier entry too.
    pub fn is_available(
        &self,
        content_ids: &[ContentId],
    ) -> bool {
        content_ids.iter().all(|content_id| {
            match self.meta_data.get(content_id) {
                Some(record) => {
                    record.resource_file().is_none() || self.resource.contains_key(content_id)
                }
                None => false,
            }
        })
    }

    /// Releases the heavyweight payloads while keeping identity/shape
    /// information. Clears the resource tier only.
    pub fn free(&mut self) {
        self.resource.clear();
    }

    pub(crate) fn tier(
        &self,
        is_meta_data_load: bool,
    ) -> &HashMap<ContentId, LibraryRecord> {
        if is_meta_data_load {
            &self.meta_data
        } else {
            &self.resource
        }
    }

    pub(crate) fn tier_mut(
        &mut self,
        is_meta_data_load: bool,
    ) -> &mut HashMap<ContentId, LibraryRecord> {
        if is_meta_data_load {
            &mut self.meta_data
        } else {
            &mut self.resource
        }
    }

    /// Metadata post-processing for a completed batch.
    pub(crate) fn attach_namespace_and_name<'a>(
        &mut self,
        content_ids: impl Iterator<Item = &'a ContentId>,
    ) {
        for content_id in content_ids {
            if let Some(record) = self.meta_data.get_mut(content_id) {
                record.attach_namespace_and_name(content_id);
            }
        }
    }

    /// The tier restricted to exactly the given ids.
    pub(crate) fn collect<'a>(
        &self,
        is_meta_data_load: bool,
        content_ids: impl Iterator<Item = &'a ContentId>,
    ) -> HashMap<ContentId, LibraryRecord> {
        let tier = self.tier(is_meta_data_load);

        content_ids
            .filter_map(|content_id| {
                tier.get(content_id)
                    .map(|record| (content_id.clone(), record.clone()))
            })
            .collect()
    }
}
