use std::sync::Arc;

use crate::ContentId;

/// Decoded payload of one loaded library file.
#[derive(Clone, Debug)]
pub enum RecordPayload {
    /// Structured metadata decoded from JSON.
    Json(serde_json::Value),
    /// UTF-8 text, e.g. script source.
    Text(Arc<str>),
    /// Raw bytes for payloads whose decode happens downstream (images,
    /// sounds).
    Bytes(Arc<[u8]>),
}

/// One cached entry of the content library.
///
/// The payload is cheap to clone; the namespace/name presentation fields are
/// attached when a metadata load completes, not at decode time.
#[derive(Clone, Debug)]
pub struct LibraryRecord {
    pub payload: RecordPayload,
    pub namespace: Option<Arc<str>>,
    pub name: Option<Arc<str>>,
}

impl LibraryRecord {
    pub fn new(payload: RecordPayload) -> Self {
        LibraryRecord {
            payload,
            namespace: None,
            name: None,
        }
    }

    pub fn json(value: serde_json::Value) -> Self {
        LibraryRecord::new(RecordPayload::Json(value))
    }

    pub fn text(text: impl Into<Arc<str>>) -> Self {
        LibraryRecord::new(RecordPayload::Text(text.into()))
    }

    pub fn bytes(bytes: impl Into<Arc<[u8]>>) -> Self {
        LibraryRecord::new(RecordPayload::Bytes(bytes.into()))
    }

    /// The record's declared type, read from the `"type"` field of a JSON
    /// payload. Non-JSON payloads declare nothing.
    pub fn declared_type(&self) -> Option<&str> {
        self.json_str_field("type")
    }

    /// The library file backing this record's heavyweight resource, if it
    /// declares one.
    pub fn resource_file(&self) -> Option<&str> {
        self.json_str_field("file")
    }

    pub fn attach_namespace_and_name(
        &mut self,
        content_id: &ContentId,
    ) {
        self.namespace = Some(content_id.namespace().into());
        self.name = Some(content_id.name().into());
    }

    fn json_str_field(
        &self,
        field: &str,
    ) -> Option<&str> {
        match &self.payload {
            RecordPayload::Json(value) => value.get(field).and_then(|value| value.as_str()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn check_declared_fields() {
        let record = LibraryRecord::json(serde_json::json!({
            "type": "appearance",
            "file": "demo/assets/logo.png"
        }));

        assert_eq!(record.declared_type(), Some("appearance"));
        assert_eq!(record.resource_file(), Some("demo/assets/logo.png"));

        let record = LibraryRecord::bytes(vec![1u8, 2, 3]);
        assert_eq!(record.declared_type(), None);
        assert_eq!(record.resource_file(), None);
    }

    #[test]
    fn check_namespace_and_name_attachment() {
        let mut record = LibraryRecord::json(serde_json::json!({ "type": "appearance" }));
        record.attach_namespace_and_name(&ContentId::new("demo.assets.logo"));

        assert_eq!(record.namespace.as_deref(), Some("demo.assets"));
        assert_eq!(record.name.as_deref(), Some("logo"));
    }
}
