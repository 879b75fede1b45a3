//! Endpoint groups and the registry.
//!
//! Registration is explicit: build descriptors (alone or in a group), then
//! register them. Nothing registers itself.

use crate::endpoint::EndpointDescriptor;
use crate::error::ApiError;
use crate::execution::http::url::join_url;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// A named set of endpoints sharing an id namespace and an optional URL prefix.
///
/// ```rust,ignore
/// let users = EndpointGroup::new("users")
///     .with_url_prefix("/users")
///     .endpoint(EndpointDescriptor::builder("get", "/:id").build())
///     .endpoint(EndpointDescriptor::builder("list", "").build());
/// executor.register_group(users)?; // registers "users.get" and "users.list"
/// ```
#[derive(Debug, Clone)]
pub struct EndpointGroup {
    name: String,
    url_prefix: Option<String>,
    endpoints: Vec<EndpointDescriptor>,
}

impl EndpointGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_prefix: None,
            endpoints: Vec::new(),
        }
    }

    /// Prefix joined in front of every relative endpoint URL of the group.
    pub fn with_url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = Some(prefix.into());
        self
    }

    /// Add an endpoint; its id becomes `<group>.<id>`.
    pub fn endpoint(mut self, mut descriptor: EndpointDescriptor) -> Self {
        descriptor.id = format!("{}.{}", self.name, descriptor.id);
        if let Some(prefix) = &self.url_prefix
            && !descriptor.url.starts_with("http")
        {
            descriptor.url = join_url(prefix, &descriptor.url);
        }
        self.endpoints.push(descriptor);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn into_endpoints(self) -> Vec<EndpointDescriptor> {
        self.endpoints
    }
}

/// Registered endpoint descriptors keyed by id.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    endpoints: RwLock<HashMap<String, Arc<EndpointDescriptor>>>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor. Ids are unique; a duplicate is rejected.
    pub fn register(&self, descriptor: EndpointDescriptor) -> Result<Arc<EndpointDescriptor>, ApiError> {
        let mut endpoints = self.endpoints.write().unwrap_or_else(PoisonError::into_inner);
        if endpoints.contains_key(&descriptor.id) {
            return Err(ApiError::internal(format!(
                "endpoint '{}' is already registered",
                descriptor.id
            )));
        }
        let descriptor = Arc::new(descriptor);
        endpoints.insert(descriptor.id.clone(), descriptor.clone());
        Ok(descriptor)
    }

    /// Register every endpoint of a group; nothing is registered if any id clashes.
    pub fn register_group(&self, group: EndpointGroup) -> Result<Vec<String>, ApiError> {
        self.register_all(group.into_endpoints())
    }

    /// Register a batch of descriptors; nothing is registered if any id clashes.
    pub fn register_all(&self, descriptors: Vec<EndpointDescriptor>) -> Result<Vec<String>, ApiError> {
        let mut endpoints = self.endpoints.write().unwrap_or_else(PoisonError::into_inner);
        for (i, d) in descriptors.iter().enumerate() {
            let clashes_within = descriptors[..i].iter().any(|other| other.id == d.id);
            if endpoints.contains_key(&d.id) || clashes_within {
                return Err(ApiError::internal(format!(
                    "endpoint '{}' is already registered",
                    d.id
                )));
            }
        }
        let ids = descriptors.iter().map(|d| d.id.clone()).collect();
        for d in descriptors {
            endpoints.insert(d.id.clone(), Arc::new(d));
        }
        Ok(ids)
    }

    pub fn get(&self, id: &str) -> Option<Arc<EndpointDescriptor>> {
        self.endpoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .endpoints
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_namespaces_ids_and_prefixes_urls() {
        let group = EndpointGroup::new("users")
            .with_url_prefix("/users/")
            .endpoint(EndpointDescriptor::builder("get", "/:id").build())
            .endpoint(EndpointDescriptor::builder("ext", "https://other/x").build());
        let eps = group.into_endpoints();
        assert_eq!(eps[0].id, "users.get");
        assert_eq!(eps[0].url, "/users/:id");
        assert_eq!(eps[1].url, "https://other/x");
    }

    #[test]
    fn duplicates_are_rejected() {
        let registry = EndpointRegistry::new();
        registry
            .register(EndpointDescriptor::builder("a", "/a").build())
            .unwrap();
        assert!(
            registry
                .register(EndpointDescriptor::builder("a", "/other").build())
                .is_err()
        );
        assert_eq!(registry.get("a").unwrap().url, "/a");
    }

    #[test]
    fn group_registration_is_all_or_nothing() {
        let registry = EndpointRegistry::new();
        registry
            .register(EndpointDescriptor::builder("g.b", "/b").build())
            .unwrap();
        let group = EndpointGroup::new("g")
            .endpoint(EndpointDescriptor::builder("a", "/a").build())
            .endpoint(EndpointDescriptor::builder("b", "/b").build());
        assert!(registry.register_group(group).is_err());
        assert_eq!(registry.ids(), vec!["g.b".to_string()]);

        let ids = registry
            .register_group(EndpointGroup::new("h").endpoint(EndpointDescriptor::builder("a", "/a").build()))
            .unwrap();
        assert_eq!(ids, vec!["h.a".to_string()]);
    }
}
