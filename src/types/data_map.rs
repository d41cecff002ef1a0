use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// Application data shared by every handler and middleware of an engine, one value per type.
///
/// Filled through [`EngineBuilder::data`](../struct.EngineBuilder.html#method.data) and read with
/// [`Context::data`](../struct.Context.html#method.data).
#[derive(Default)]
pub struct DataMap {
    inner: HashMap<TypeId, Box<dyn Any + Send + Sync + 'static>>,
}

impl DataMap {
    pub fn new() -> DataMap {
        DataMap::default()
    }

    /// Stores `val`, replacing any earlier value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, val: T) {
        self.inner.insert(TypeId::of::<T>(), Box::new(val));
    }

    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.inner
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref::<T>())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl fmt::Debug for DataMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataMap {{ len: {} }}", self.inner.len())
    }
}
