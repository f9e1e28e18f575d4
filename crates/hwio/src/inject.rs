//! Resolution of named slots against a [`Registry`].
//!
//! A [`Wiring`] declares every slot an application component needs, each
//! with the category it expects. Resolving it looks every slot up in one
//! pass and either returns all of them or reports every slot that failed.

use core::fmt;
use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::category::IoCategory;
use crate::error::{Error, Result};
use crate::io::{IoInstance, TypedIo};
use crate::registry::Registry;

/// One slot to fill: by explicit instance id, or by the slot name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectionRequest {
    pub slot: String,
    #[serde(default)]
    pub id: Option<String>,
    pub category: IoCategory,
}

impl InjectionRequest {
    pub fn new(slot: impl Into<String>, category: IoCategory) -> Self {
        Self { slot: slot.into(), id: None, category }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Registry id this request resolves to.
    pub fn target(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.slot)
    }
}

/// Look a single request up. Pure, nothing is created.
pub fn resolve(registry: &Registry, request: &InjectionRequest) -> Result<IoInstance> {
    registry.get(request.target(), request.category)
}

/// Serde form of a [`Wiring`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WiringConfig {
    pub slots: Vec<InjectionRequest>,
}

impl WiringConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Wiring {
    requests: Vec<InjectionRequest>,
}

impl From<WiringConfig> for Wiring {
    fn from(config: WiringConfig) -> Self {
        Self { requests: config.slots }
    }
}

impl Wiring {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot resolved by its own name, e.g. `slot::<dyn DigitalOutput>("led")`.
    pub fn slot<T: TypedIo + ?Sized>(self, slot: impl Into<String>) -> Self {
        self.request(InjectionRequest::new(slot, T::CATEGORY))
    }

    pub fn slot_with_id<T: TypedIo + ?Sized>(
        self,
        slot: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        self.request(InjectionRequest::new(slot, T::CATEGORY).with_id(id))
    }

    pub fn request(mut self, request: InjectionRequest) -> Self {
        self.requests.push(request);
        self
    }

    pub fn requests(&self) -> &[InjectionRequest] {
        &self.requests
    }

    pub fn resolve(
        &self,
        registry: &Registry,
    ) -> core::result::Result<Wired, InjectionError> {
        let mut slots = HashMap::with_capacity(self.requests.len());
        let mut failures = Vec::new();

        for request in &self.requests {
            if slots.contains_key(&request.slot) {
                failures.push((
                    request.slot.clone(),
                    Error::InvalidConfig {
                        reason: format!("slot `{}` declared twice", request.slot),
                    },
                ));
                continue;
            }
            match resolve(registry, request) {
                Ok(instance) => {
                    slots.insert(request.slot.clone(), instance);
                }
                Err(err) => failures.push((request.slot.clone(), err)),
            }
        }

        if !failures.is_empty() {
            return Err(InjectionError { failures });
        }
        debug!(slots = slots.len(), "wiring resolved");
        Ok(Wired { slots })
    }
}

/// Resolved slots.
#[derive(Debug, Clone)]
pub struct Wired {
    slots: HashMap<String, IoInstance>,
}

impl Wired {
    pub fn get<T: TypedIo + ?Sized>(&self, slot: &str) -> Result<Arc<T>> {
        self.instance(slot)
            .ok_or_else(|| Error::NotFound { id: slot.to_owned() })?
            .expect_typed::<T>()
    }

    pub fn instance(&self, slot: &str) -> Option<&IoInstance> {
        self.slots.get(slot)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Every slot of a [`Wiring`] that could not be resolved.
#[derive(Debug, derive_more::Error)]
pub struct InjectionError {
    pub failures: Vec<(String, Error)>,
}

impl InjectionError {
    pub fn slots(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|(slot, _)| slot.as_str())
    }
}

impl fmt::Display for InjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} slot(s) could not be resolved", self.failures.len())?;
        for (slot, err) in &self.failures {
            write!(f, "; `{slot}`: {err}")?;
        }
        Ok(())
    }
}
