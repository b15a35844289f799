use std::collections::BTreeMap;
use std::sync::Arc;

use crate::format::Format;

/// The set of formats known to identification, keyed by normalized name.
///
/// Iteration follows key order, which makes "first match wins" reproducible.
#[derive(Clone)]
pub struct Registry {
    formats: BTreeMap<String, Arc<dyn Format>>,
}

fn key(name: &str) -> String {
    name.to_lowercase().trim_start_matches('.').to_string()
}

impl Registry {
    /// An empty registry. See [`Registry::default`] for one populated with built-in formats.
    pub fn new() -> Self {
        Registry {
            formats: BTreeMap::new(),
        }
    }

    /// Adds a format.
    ///
    /// # Panics
    ///
    /// If a format with the same normalized name is already registered.
    pub fn register(&mut self, format: impl Format + 'static) -> &mut Self {
        self.register_arc(Arc::new(format))
    }

    /// Like [`register`](Self::register), for an already shared format.
    pub fn register_arc(&mut self, format: Arc<dyn Format>) -> &mut Self {
        let key = key(&format.name());
        if self.formats.contains_key(&key) {
            panic!("format {:?} is already registered", key);
        }

        tracing::debug!(format = %key, "registered format");
        self.formats.insert(key, format);
        self
    }

    /// Looks up a format by name, with or without the leading dot.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Format>> {
        self.formats.get(&key(name)).cloned()
    }

    /// Snapshot of every registered format, in key order.
    pub fn all(&self) -> Vec<Arc<dyn Format>> {
        self.formats.values().cloned().collect()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Arc<dyn Format>> {
        self.formats.values()
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

impl Default for Registry {
    /// Every format compiled into this build, with default options.
    fn default() -> Self {
        use crate::archive::*;
        use crate::compression::*;

        let mut registry = Registry::new();
        registry.register(Gz::default());
        registry.register(Zlib::default());
        registry.register(Tar::default());
        registry.register(Rar);

        #[cfg(feature = "brotli")]
        registry.register(Brotli::default());
        #[cfg(feature = "bzip2")]
        registry.register(Bz2::default());
        #[cfg(feature = "lz4")]
        registry.register(Lz4::default());
        #[cfg(feature = "snappy")]
        registry.register(Sz::default());
        #[cfg(feature = "xz")]
        registry.register(Xz::default());
        #[cfg(feature = "zstd")]
        registry.register(Zstd::default());
        #[cfg(feature = "zip")]
        registry.register(Zip::default());
        #[cfg(feature = "sevenz")]
        registry.register(SevenZip::default());

        registry
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.formats.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::compression::Gz;

    #[test]
    fn keys_are_normalized() {
        let mut registry = Registry::new();
        registry.register(Gz::default());

        assert!(registry.get(".gz").is_some());
        assert!(registry.get("GZ").is_some());
        assert!(registry.get(".zip").is_none());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_registration_panics() {
        let mut registry = Registry::new();
        registry.register(Gz::default());
        registry.register(Gz { level: 1 });
    }

    #[test]
    fn defaults_iterate_in_key_order() {
        let registry = Registry::default();
        let names = registry
            .all()
            .iter()
            .map(|f| f.name().into_owned())
            .collect::<Vec<_>>();

        let mut sorted = names.clone();
        sorted.sort_by_key(|n| key(n));
        assert_eq!(names, sorted);
        assert!(names.contains(&".tar".to_string()));
        assert!(names.contains(&".gz".to_string()));
    }
}
