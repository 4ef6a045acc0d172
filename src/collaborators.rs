//! Seams to the outside world.
//!
//! The engine never performs I/O itself. `<sraix>` delegates to an
//! [`ExternalService`] and `<learnf>` hands learned categories to a
//! [`RulePersistence`]; both are optional and a missing collaborator makes the
//! tag fail soft.

use crate::Category;
use crate::error::ServiceError;

/// Remote bot or service queried by `<sraix>`.
pub trait ExternalService: Send + Sync {
    /// Send `query` to `service` and return its plain-text answer.
    fn call(&self, service: &str, query: &str) -> Result<String, ServiceError>;
}

/// Durable storage for categories learned with `<learnf>`.
pub trait RulePersistence: Send + Sync {
    fn persist(&self, category: &Category) -> Result<(), ServiceError>;
}

#[derive(Default)]
pub struct Collaborators {
    pub service: Option<Box<dyn ExternalService>>,
    pub persistence: Option<Box<dyn RulePersistence>>,
}

impl Collaborators {
    pub fn call_service(&self, service: &str, query: &str) -> Result<String, ServiceError> {
        match &self.service {
            Some(s) => s.call(service, query),
            None => Err(ServiceError::Unavailable(service.to_string())),
        }
    }

    pub fn persist(&self, category: &Category) -> Result<(), ServiceError> {
        match &self.persistence {
            Some(p) => p.persist(category),
            None => Err(ServiceError::Unavailable("persistence".to_string())),
        }
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators")
            .field("service", &self.service.is_some())
            .field("persistence", &self.persistence.is_some())
            .finish()
    }
}
