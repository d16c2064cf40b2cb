//! Spec generation entry points.
//!
//! [`create_spec`] runs one generation: walk the registry, build every
//! operation admitted by the zone filter, assemble the document and apply the
//! overlays. [`SpecGenerator`] wraps it with a memo keyed by zone and overlay
//! list for hosts that serve the document repeatedly.

use crate::error::Result;
use crate::merge::{merge_all, OverlaySource, ResourceRegistry};
use crate::openapi_builder::{SpecAssembler, SpecDocument};
use crate::operation::build_operation;
use crate::registry::{RouteRegistry, Settings};
use crate::walker::walk;
use crate::zone::ZoneFilter;
use log::{debug, info};
use serde_json::Map;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Overlays to apply: the caller's first, then the ones named in settings.
pub fn overlay_sources(requested: &[OverlaySource], settings: &Settings) -> Vec<OverlaySource> {
    requested
        .iter()
        .cloned()
        .chain(settings.merge.iter().map(|source| OverlaySource::parse(source)))
        .collect()
}

/// Generate the document for `registry`.
///
/// Paths whose every operation is filtered out by `zone` are left out of the
/// document entirely.
pub fn create_spec(
    registry: &RouteRegistry,
    zone: &ZoneFilter,
    merges: &[OverlaySource],
    resources: &ResourceRegistry,
) -> Result<SpecDocument> {
    let settings = registry.settings();
    info!(
        "Generating spec for {} {} (zone: {})",
        settings.title(),
        settings.version(),
        zone.zone().unwrap_or("all")
    );

    let mut spec = SpecAssembler::new(settings.title(), settings.version());
    for record in walk(registry)? {
        let mut operations = Map::new();
        for (method, view) in &record.operations {
            if !zone.admits(view.api_zone.as_deref()) {
                debug!("{} {} is outside the requested zone", method.to_uppercase(), record.path);
                continue;
            }
            let operation = build_operation(&mut spec, &record.path, method, view)?;
            operations.insert(method.clone(), operation);
        }
        if operations.is_empty() {
            continue;
        }
        spec.add_path(&record.path, operations);
    }
    info!("Documented {} paths", spec.path_count());

    let document = spec.build()?;
    merge_all(document, &overlay_sources(merges, settings), resources)
}

type CacheKey = (ZoneFilter, Vec<OverlaySource>);

/// Memoizing spec generator bound to one registry.
///
/// The registry is static once the application has started, so cached
/// documents stay valid for the generator's lifetime.
pub struct SpecGenerator {
    registry: RouteRegistry,
    resources: ResourceRegistry,
    cache: Mutex<HashMap<CacheKey, Arc<SpecDocument>>>,
}

impl SpecGenerator {
    pub fn new(registry: RouteRegistry) -> Self {
        Self::with_resources(registry, ResourceRegistry::new())
    }

    pub fn with_resources(registry: RouteRegistry, resources: ResourceRegistry) -> Self {
        Self {
            registry,
            resources,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Return the document for `zone` and `merges`, generating it on first
    /// request. Failed generations are not cached.
    pub fn generate(&self, zone: &ZoneFilter, merges: &[OverlaySource]) -> Result<Arc<SpecDocument>> {
        let key = (zone.clone(), merges.to_vec());
        if let Some(document) = self.lock().get(&key) {
            debug!("Serving cached spec for zone {:?}", zone.zone());
            return Ok(Arc::clone(document));
        }

        let document = Arc::new(create_spec(&self.registry, zone, merges, &self.resources)?);
        let mut cache = self.lock();
        let entry = cache.entry(key).or_insert(document);
        Ok(Arc::clone(entry))
    }

    /// Number of cached documents
    pub fn cached(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, Arc<SpecDocument>>> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
