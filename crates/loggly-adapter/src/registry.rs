// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Adapter factories and routes known to the host process.
//!
//! Nothing registers itself at load time. The bootstrap code creates a
//! [`Registry`], calls each adapter's `register` function once, then builds
//! one adapter per route.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use tracing::debug;

use crate::errors::{ConfigError, RegistryError};
use crate::record::SourceMessage;

pub type CloseFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

/// A running log destination fed by the host's router.
pub trait LogAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Accepts one message without waiting on the destination.
    fn submit(&self, message: SourceMessage);

    /// Stops accepting messages and delivers whatever is buffered.
    fn close(self: Box<Self>) -> CloseFuture;
}

pub type AdapterFactory = fn(&Route) -> Result<Box<dyn LogAdapter>, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub id: String,
    pub adapter: String,
}

impl Route {
    #[must_use]
    pub fn new(id: impl Into<String>, adapter: impl Into<String>) -> Self {
        Route {
            id: id.into(),
            adapter: adapter.into(),
        }
    }
}

#[derive(Default)]
pub struct Registry {
    factories: HashMap<String, AdapterFactory>,
    routes: Vec<Route>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` under `name`, replacing any previous one.
    pub fn register_factory(&mut self, name: &str, factory: AdapterFactory) {
        if self.factories.insert(name.to_string(), factory).is_some() {
            debug!("Replaced adapter factory {}", name);
        }
    }

    pub fn add_route(&mut self, route: Route) -> Result<(), RegistryError> {
        if !self.factories.contains_key(&route.adapter) {
            return Err(RegistryError::UnknownAdapter(route.adapter));
        }
        if self.routes.iter().any(|r| r.id == route.id) {
            return Err(RegistryError::DuplicateRoute(route.id));
        }
        self.routes.push(route);
        Ok(())
    }

    #[must_use]
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Creates one adapter per route, in route order.
    pub fn build_routes(&self) -> Result<Vec<Box<dyn LogAdapter>>, RegistryError> {
        self.routes
            .iter()
            .map(|route| {
                let factory = self
                    .factories
                    .get(&route.adapter)
                    .ok_or_else(|| RegistryError::UnknownAdapter(route.adapter.clone()))?;
                factory(route).map_err(|source| RegistryError::Factory {
                    adapter: route.adapter.clone(),
                    route: route.id.clone(),
                    source,
                })
            })
            .collect()
    }
}
