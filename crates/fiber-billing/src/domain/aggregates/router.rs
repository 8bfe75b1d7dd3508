//! Router entity referenced by subscribers.

use fiber_common::EntityId;
use serde::{Deserialize, Serialize};

/// A managed network router. The name is the addressing key understood by the
/// router control gateway.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Router {
    id: EntityId,
    name: String,
    host: String,
}

impl Router {
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            id: EntityId::new(),
            name: name.into(),
            host: host.into(),
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}
