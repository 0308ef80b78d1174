use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Stable key naming one loadable artifact across both cache tiers.
///
/// Ids are dot-separated, e.g. `"demo.assets.logo"`. The last segment is the
/// name, everything before it the namespace. Library file paths map onto ids
/// by dropping the extension and turning slashes into dots.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(Arc<str>);

impl ContentId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        ContentId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything before the last segment. Empty for single-segment ids.
    pub fn namespace(&self) -> &str {
        match self.0.rsplit_once('.') {
            Some((namespace, _)) => namespace,
            None => "",
        }
    }

    /// The last segment of the id.
    pub fn name(&self) -> &str {
        match self.0.rsplit_once('.') {
            Some((_, name)) => name,
            None => &self.0,
        }
    }

    /// Derives the id for a library file path, `"a/b/c.json"` -> `"a.b.c"`.
    pub fn from_library_file_path(library_file_path: &str) -> Self {
        let without_extension = match library_file_path.rsplit_once('.') {
            Some((stem, _)) => stem,
            None => library_file_path,
        };

        ContentId::new(without_extension.replace('/', "."))
    }

    /// The library file path an id resolves to for a given extension,
    /// `"a.b.c"` + `"json"` -> `"a/b/c.json"`.
    pub fn to_library_file_path(
        &self,
        extension: &str,
    ) -> String {
        format!("{}.{}", self.0.replace('.', "/"), extension)
    }
}

impl fmt::Display for ContentId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for ContentId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "ContentId({:?})", &*self.0)
    }
}

impl From<&str> for ContentId {
    fn from(id: &str) -> Self {
        ContentId::new(id)
    }
}

impl serde::Serialize for ContentId {
    fn serialize<S: serde::Serializer>(
        &self,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for ContentId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = <String as serde::Deserialize>::deserialize(deserializer)?;
        Ok(ContentId::new(id))
    }
}

/// Appends a cache-busting token to a URL so intermediate http caches are
/// skipped. Only useful for URLs that actually cross an http cache.
pub fn url_with_cache_breaker(url: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or(0);

    let separator = if url.contains('?') { '&' } else { '?' };

    format!("{}{}cb={}", url, separator, millis)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn check_id_from_library_file_path() {
        let id = ContentId::from_library_file_path("demo/assets/logo.json");
        assert_eq!(id.as_str(), "demo.assets.logo");
        assert_eq!(id.namespace(), "demo.assets");
        assert_eq!(id.name(), "logo");
    }

    #[test]
    fn check_single_segment_id() {
        let id = ContentId::new("logo");
        assert_eq!(id.namespace(), "");
        assert_eq!(id.name(), "logo");
    }

    #[test]
    fn check_library_file_path_round_trip() {
        let id = ContentId::new("demo.assets.logo");
        let path = id.to_library_file_path("png");
        assert_eq!(path, "demo/assets/logo.png");
        assert_eq!(ContentId::from_library_file_path(&path), id);
    }

    #[test]
    fn check_cache_breaker_separator() {
        assert!(url_with_cache_breaker("a/b.json").contains("a/b.json?cb="));
        assert!(url_with_cache_breaker("a/b.json?v=2").contains("a/b.json?v=2&cb="));
    }
}
