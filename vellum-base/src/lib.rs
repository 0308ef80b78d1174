pub mod hashing;

mod content_id;
mod record;
mod resource_type;

pub use content_id::url_with_cache_breaker;
pub use content_id::ContentId;
pub use record::LibraryRecord;
pub use record::RecordPayload;
pub use resource_type::ResourceType;
pub use resource_type::ResourceTypeSelection;
