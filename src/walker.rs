//! Walks the registry and groups views by the path they serve.

use crate::error::{Error, Result};
use crate::registry::{RouteRegistry, ViewMetadata};
use log::debug;

/// All views documented under one path template
#[derive(Debug, Clone)]
pub struct RouteRecord<'r> {
    pub path: String,
    /// Lower-cased method to view, in first-registration order
    pub operations: Vec<(String, &'r ViewMetadata)>,
}

impl<'r> RouteRecord<'r> {
    fn new(path: String) -> Self {
        Self {
            path,
            operations: Vec::new(),
        }
    }

    /// Bind `method` to `view`. A method registered earlier on the same path is
    /// taken over by the later view.
    fn insert(&mut self, method: String, view: &'r ViewMetadata) {
        match self.operations.iter_mut().find(|(existing, _)| *existing == method) {
            Some(slot) => {
                debug!(
                    "{} {} is registered by both {} and {}, keeping {}",
                    method.to_uppercase(),
                    self.path,
                    slot.1.callable,
                    view.callable,
                    view.callable
                );
                slot.1 = view;
            }
            None => self.operations.push((method, view)),
        }
    }

    pub fn operation(&self, method: &str) -> Option<&'r ViewMetadata> {
        self.operations
            .iter()
            .find(|(existing, _)| existing == method)
            .map(|(_, view)| *view)
    }
}

/// Derive the path a view serves.
///
/// A named route wins; otherwise the context's base path joined with the view
/// name (an unnamed view yields a trailing slash). Views with neither are not
/// reachable by path and yield `None`.
///
/// # Errors
///
/// Returns a configuration error when the view names a route that is not
/// registered.
pub fn make_path(registry: &RouteRegistry, view: &ViewMetadata) -> Result<Option<String>> {
    if let Some(route_name) = &view.route_name {
        return match registry.route(route_name) {
            Some(route) => Ok(Some(route.pattern.clone())),
            None => Err(Error::Configuration(format!(
                "view {} refers to unknown route {:?}",
                view.callable, route_name
            ))),
        };
    }

    let base = view.context.as_ref().and_then(|context| context.base_path());
    Ok(base.map(|base| format!("{}/{}", base, view.name.as_deref().unwrap_or(""))))
}

/// Group the registry's views by path, in order of first appearance.
pub fn walk(registry: &RouteRegistry) -> Result<Vec<RouteRecord<'_>>> {
    let mut records: Vec<RouteRecord<'_>> = Vec::new();

    for view in registry.views() {
        let Some(path) = make_path(registry, view)? else {
            debug!("Skipping {}: no path", view.callable);
            continue;
        };

        let index = match records.iter().position(|record| record.path == path) {
            Some(index) => index,
            None => {
                records.push(RouteRecord::new(path));
                records.len() - 1
            }
        };
        for method in view.request_methods.normalized() {
            records[index].insert(method, view);
        }
    }

    debug!("Walked {} paths", records.len());
    Ok(records)
}
