use std::{fmt, ops};

use ahash::{HashMap, HashMapExt};

use crate::{SingerRef, TypeKey};

/// Strategy that turns lyrics into phonemes for a particular singer.
///
/// Each track owns exactly one instance, and tells it whenever the track's singer changes.
pub trait Phonemizer: Send + fmt::Debug {
    /// Key of the factory that created this phonemizer. Saved into projects.
    fn type_key(&self) -> &TypeKey;
    /// Short label for display.
    fn tag(&self) -> &str;

    fn set_singer(&mut self, singer: Option<&SingerRef>);
    fn singer(&self) -> Option<&SingerRef>;
}

pub struct PhonemizerConstructor(
    pub Box<dyn Send + Sync + Fn() -> anyhow::Result<Box<dyn Phonemizer>>>,
);
impl ops::Deref for PhonemizerConstructor {
    type Target = dyn Send + Sync + Fn() -> anyhow::Result<Box<dyn Phonemizer>>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
impl fmt::Debug for PhonemizerConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhonemizerConstructor {{ <{:?}> }}", self as *const _)
    }
}

#[derive(Debug)]
pub struct PhonemizerFactory {
    pub key: TypeKey,
    pub name: Box<str>,
    pub tag: Box<str>,
    constructor: PhonemizerConstructor,
}

impl PhonemizerFactory {
    pub fn new(
        key: TypeKey,
        name: &str,
        tag: &str,
        constructor: impl 'static + Send + Sync + Fn() -> anyhow::Result<Box<dyn Phonemizer>>,
    ) -> Self {
        Self {
            key,
            name: name.into(),
            tag: tag.into(),
            constructor: PhonemizerConstructor(Box::new(constructor)),
        }
    }

    pub fn create(&self) -> anyhow::Result<Box<dyn Phonemizer>> {
        let phonemizer = (self.constructor)()?;
        debug_assert_eq!(
            phonemizer.type_key(),
            &self.key,
            "phonemizer factory created a phonemizer of a different type"
        );
        Ok(phonemizer)
    }
}

/// Lookup of phonemizer factories by type key.
pub trait PhonemizerRegistry {
    fn by_type_key(&self, key: &str) -> Option<&PhonemizerFactory>;
    /// The fallback phonemizer. Can't fail.
    fn create_default(&self) -> Box<dyn Phonemizer>;
}

/// Passes lyrics through unchanged. Used whenever nothing better is available.
#[derive(Debug)]
pub struct DefaultPhonemizer {
    key: TypeKey,
    singer: Option<SingerRef>,
}

impl DefaultPhonemizer {
    pub const KEY: &'static str = "Chorale.DefaultPhonemizer";
    pub const TAG: &'static str = "DEFAULT";

    pub fn new() -> Self {
        Self {
            key: TypeKey::from_static(Self::KEY),
            singer: None,
        }
    }
}

impl Default for DefaultPhonemizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Phonemizer for DefaultPhonemizer {
    fn type_key(&self) -> &TypeKey {
        &self.key
    }
    fn tag(&self) -> &str {
        Self::TAG
    }
    fn set_singer(&mut self, singer: Option<&SingerRef>) {
        self.singer = singer.cloned();
    }
    fn singer(&self) -> Option<&SingerRef> {
        self.singer.as_ref()
    }
}

/// Registry of every phonemizer the application knows about. Always contains [`DefaultPhonemizer`].
///
/// Shared by all tracks and read-only once set up.
#[derive(Debug)]
pub struct PhonemizerTable {
    entries: HashMap<TypeKey, PhonemizerFactory>,
}

impl PhonemizerTable {
    pub fn new() -> Self {
        let mut this = Self {
            entries: HashMap::new(),
        };
        this.register(PhonemizerFactory::new(
            TypeKey::from_static(DefaultPhonemizer::KEY),
            "Default",
            DefaultPhonemizer::TAG,
            || Ok(Box::new(DefaultPhonemizer::new())),
        ));
        this
    }

    pub fn register(&mut self, factory: PhonemizerFactory) {
        let key = factory.key.clone();
        if self.entries.insert(key.clone(), factory).is_some() {
            panic!("phonemizer key collision for {key}");
        }
    }

    /// Sorted by name for consistent display.
    pub fn factories(&self) -> Vec<&PhonemizerFactory> {
        let mut factories: Vec<_> = self.entries.values().collect();
        factories.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.key.cmp(&b.key)));
        factories
    }
}

impl Default for PhonemizerTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PhonemizerRegistry for PhonemizerTable {
    fn by_type_key(&self, key: &str) -> Option<&PhonemizerFactory> {
        self.entries.get(key)
    }
    fn create_default(&self) -> Box<dyn Phonemizer> {
        Box::new(DefaultPhonemizer::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Kana {
        key: TypeKey,
        singer: Option<SingerRef>,
    }
    impl Phonemizer for Kana {
        fn type_key(&self) -> &TypeKey {
            &self.key
        }
        fn tag(&self) -> &str {
            "JA"
        }
        fn set_singer(&mut self, singer: Option<&SingerRef>) {
            self.singer = singer.cloned();
        }
        fn singer(&self) -> Option<&SingerRef> {
            self.singer.as_ref()
        }
    }

    #[test]
    fn test_lookup() {
        let mut table = PhonemizerTable::new();
        table.register(PhonemizerFactory::new(
            TypeKey::from_static("Ja.KanaPhonemizer"),
            "Japanese",
            "JA",
            || {
                Ok(Box::new(Kana {
                    key: TypeKey::from_static("Ja.KanaPhonemizer"),
                    singer: None,
                }))
            },
        ));

        let factory = table.by_type_key("Ja.KanaPhonemizer").unwrap();
        assert_eq!(factory.create().unwrap().tag(), "JA");
        assert!(table.by_type_key("Unknown.Type").is_none());
        assert!(table.by_type_key(DefaultPhonemizer::KEY).is_some());

        let names: Vec<&str> = table.factories().iter().map(|f| &*f.name).collect();
        assert_eq!(names, ["Default", "Japanese"]);
    }

    #[test]
    #[should_panic(expected = "collision")]
    fn test_duplicate_key() {
        let mut table = PhonemizerTable::new();
        table.register(PhonemizerFactory::new(
            TypeKey::from_static(DefaultPhonemizer::KEY),
            "Default again",
            "DEFAULT",
            || Ok(Box::new(DefaultPhonemizer::new())),
        ));
    }

    #[test]
    fn test_default() {
        let table = PhonemizerTable::new();
        let phonemizer = table.create_default();
        assert_eq!(phonemizer.type_key().as_str(), DefaultPhonemizer::KEY);
        assert!(phonemizer.singer().is_none());
    }
}
