use super::{BIND_BY_NAME, PropertyType, ReflectSetter, RuntimeType};
use crate::command::DbCommand;
use crate::core::Value;
use lazy_static::lazy_static;
use log::{debug, trace, warn};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

lazy_static! {
    static ref BIND_BY_NAME_CACHE: Arc<CapabilityCache> = Arc::new(CapabilityCache::new(BIND_BY_NAME));
}

/// Applies a boolean to one property of one concrete type
#[derive(Clone)]
pub struct BoolAccessor {
    property: &'static str,
    type_name: &'static str,
    apply: Arc<dyn Fn(&mut dyn Any, bool) + Send + Sync>,
}

impl BoolAccessor {
    fn bind(property: &'static str, type_name: &'static str, setter: ReflectSetter) -> Self {
        let apply = move |target: &mut dyn Any, value: bool| {
            if let Err(e) = setter(target, Value::Boolean(value)) {
                warn!("Setting {} on {} failed: {}", property, type_name, e);
            }
        };

        Self {
            property,
            type_name,
            apply: Arc::new(apply),
        }
    }

    /// Set the property on `command`. Failures are logged, never returned.
    pub fn apply(&self, command: &mut dyn DbCommand, value: bool) {
        (self.apply)(command.as_any_mut(), value);
    }

    pub fn property(&self) -> &'static str {
        self.property
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Whether both handles refer to the same published accessor
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Arc::ptr_eq(&a.apply, &b.apply)
    }
}

impl fmt::Debug for BoolAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoolAccessor")
            .field("property", &self.property)
            .field("type_name", &self.type_name)
            .finish()
    }
}

/// Per-type cache of accessors for one boolean capability.
///
/// Entries are created on first lookup of a type and never evicted. A type
/// without a matching property is cached as `None` so it is not inspected
/// again. Discovery runs without any lock held; only the publish step takes
/// the write lock, and the first published entry for a type wins.
pub struct CapabilityCache {
    capability: &'static str,
    entries: RwLock<HashMap<TypeId, Option<BoolAccessor>>>,
    discoveries: AtomicUsize,
}

impl CapabilityCache {
    pub fn new(capability: &'static str) -> Self {
        Self {
            capability,
            entries: RwLock::new(HashMap::new()),
            discoveries: AtomicUsize::new(0),
        }
    }

    /// The process-wide cache for the `BindByName` capability
    pub fn bind_by_name() -> &'static Arc<CapabilityCache> {
        &BIND_BY_NAME_CACHE
    }

    pub fn capability(&self) -> &'static str {
        self.capability
    }

    /// Cached accessor for `runtime_type`, discovering it on first sight.
    /// A missing type resolves to no accessor.
    pub fn lookup(&self, runtime_type: Option<&RuntimeType>) -> Option<BoolAccessor> {
        let runtime_type = runtime_type?;

        if let Some(entry) = self.read_entries().get(&runtime_type.id) {
            return entry.clone();
        }

        let candidate = self.discover(Some(runtime_type));
        self.publish(runtime_type, candidate)
    }

    /// Accessor for the concrete type of `command`
    pub fn lookup_for(&self, command: &dyn DbCommand) -> Option<BoolAccessor> {
        self.lookup(Some(&RuntimeType::of(command)))
    }

    /// Inspect `runtime_type` for a public, instance, non-indexed, writable
    /// boolean property named after this cache's capability. Bypasses the cache.
    pub fn discover(&self, runtime_type: Option<&RuntimeType>) -> Option<BoolAccessor> {
        let runtime_type = runtime_type?;
        self.discoveries.fetch_add(1, Ordering::Relaxed);

        let accessor = runtime_type
            .property(self.capability)
            .filter(|p| p.value_type == PropertyType::Boolean && p.index_parameters == 0)
            .and_then(|p| p.setter)
            .map(|setter| BoolAccessor::bind(self.capability, runtime_type.name, setter));

        debug!(
            "Discovered {} on {}: {}",
            self.capability,
            runtime_type.name,
            if accessor.is_some() { "present" } else { "absent" }
        );

        accessor
    }

    /// Number of distinct types resolved so far
    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.read_entries().contains_key(&type_id)
    }

    /// Number of discoveries run, including ones that lost a publish race
    pub fn discovery_count(&self) -> usize {
        self.discoveries.load(Ordering::Relaxed)
    }

    fn publish(&self, runtime_type: &RuntimeType, candidate: Option<BoolAccessor>) -> Option<BoolAccessor> {
        match self.write_entries().entry(runtime_type.id) {
            Entry::Occupied(existing) => {
                trace!(
                    "Discarding redundant {} discovery for {}",
                    self.capability, runtime_type.name
                );
                existing.get().clone()
            }
            Entry::Vacant(slot) => slot.insert(candidate).clone(),
        }
    }

    // A panic elsewhere never leaves an entry half-written, so poisoning is ignored
    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<TypeId, Option<BoolAccessor>>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<TypeId, Option<BoolAccessor>>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for CapabilityCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilityCache")
            .field("capability", &self.capability)
            .field("entries", &self.len())
            .field("discoveries", &self.discovery_count())
            .finish()
    }
}
