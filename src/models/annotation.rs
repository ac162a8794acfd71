use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// A typed annotation identifier.
pub trait AnnotationKey: 'static {
    type Value: Clone + fmt::Debug + Send + Sync + 'static;

    /// Stable name used in debug output and reports
    const NAME: &'static str;
}

/// Object-safe view over a stored annotation value.
trait AnnotationValue: Send + Sync {
    fn clone_boxed(&self) -> Box<dyn AnnotationValue>;
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
    fn fmt_debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<T: Clone + fmt::Debug + Send + Sync + 'static> AnnotationValue for T {
    fn clone_boxed(&self) -> Box<dyn AnnotationValue> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn fmt_debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

struct Entry {
    name: &'static str,
    value: Box<dyn AnnotationValue>,
}

impl Clone for Entry {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            value: self.value.as_ref().clone_boxed(),
        }
    }
}

/// Heterogeneous key/value record.
#[derive(Clone, Default)]
pub struct AnnotationMap {
    entries: HashMap<TypeId, Entry>,
}

impl AnnotationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<K: AnnotationKey>(&self) -> Option<&K::Value> {
        self.entries
            .get(&TypeId::of::<K>())
            .and_then(|entry| entry.value.as_ref().as_any().downcast_ref::<K::Value>())
    }

    /// Store a value, returning the previous one if the key was already set
    pub fn set<K: AnnotationKey>(&mut self, value: K::Value) -> Option<K::Value> {
        let previous = self.entries.insert(
            TypeId::of::<K>(),
            Entry {
                name: K::NAME,
                value: Box::new(value),
            },
        );
        previous.and_then(Self::unbox::<K>)
    }

    pub fn contains<K: AnnotationKey>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<K>())
    }

    pub fn remove<K: AnnotationKey>(&mut self) -> Option<K::Value> {
        self.entries
            .remove(&TypeId::of::<K>())
            .and_then(Self::unbox::<K>)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the keys currently set, sorted
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.entries.values().map(|e| e.name).collect();
        names.sort_unstable();
        names
    }

    fn unbox<K: AnnotationKey>(entry: Entry) -> Option<K::Value> {
        entry
            .value
            .into_any()
            .downcast::<K::Value>()
            .ok()
            .map(|value| *value)
    }
}

impl fmt::Debug for AnnotationMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct DebugValue<'a>(&'a dyn AnnotationValue);
        impl fmt::Debug for DebugValue<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt_debug(f)
            }
        }

        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.name);
        f.debug_map()
            .entries(entries.iter().map(|e| (e.name, DebugValue(e.value.as_ref()))))
            .finish()
    }
}

/// Utterance index of a token
pub struct UtteranceAnnotation;
impl AnnotationKey for UtteranceAnnotation {
    type Value = usize;
    const NAME: &'static str = "Utterance";
}

/// Speaker label of a token: a mention id, a raw name or a `PER<n>` placeholder
pub struct SpeakerAnnotation;
impl AnnotationKey for SpeakerAnnotation {
    type Value = String;
    const NAME: &'static str = "Speaker";
}

/// 1-based paragraph index of a token
pub struct ParagraphAnnotation;
impl AnnotationKey for ParagraphAnnotation {
    type Value = usize;
    const NAME: &'static str = "Paragraph";
}

/// Index into the document's entity mentions for a token covered by one
pub struct EntityMentionIndexAnnotation;
impl AnnotationKey for EntityMentionIndexAnnotation {
    type Value = usize;
    const NAME: &'static str = "EntityMentionIndex";
}

/// Document flag: speaker and utterance annotations were supplied upstream and must be kept
pub struct UseMarkedDiscourseAnnotation;
impl AnnotationKey for UseMarkedDiscourseAnnotation {
    type Value = bool;
    const NAME: &'static str = "UseMarkedDiscourse";
}

pub struct DocIdAnnotation;
impl AnnotationKey for DocIdAnnotation {
    type Value = String;
    const NAME: &'static str = "DocId";
}
