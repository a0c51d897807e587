//! Requesting user capability
//!
//! Rows a user may not see are dropped before any filter runs. Tables the
//! user may not see answer with an empty result. Neither case is an error,
//! so the requester learns nothing about hidden objects.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::{Host, Service};

/// Visibility capability consumed by tables
pub trait User: Send + Sync {
    /// Contact name, `None` for the unrestricted user
    fn name(&self) -> Option<&str>;

    fn is_authorized_for_table(&self, _table: &str) -> bool {
        true
    }

    fn is_authorized_for_host(&self, host: &Host) -> bool;

    fn is_authorized_for_service(&self, service: &Service) -> bool;
}

/// Service visibility rule for contacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAuthorization {
    /// Service contacts and host contacts see the service
    #[default]
    Loose,
    /// Only service contacts see the service
    Strict,
}

impl ServiceAuthorization {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceAuthorization::Loose => "loose",
            ServiceAuthorization::Strict => "strict",
        }
    }
}

/// Unrestricted user (no `AuthUser:` header)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuthUser;

impl User for NoAuthUser {
    fn name(&self) -> Option<&str> {
        None
    }

    fn is_authorized_for_host(&self, _host: &Host) -> bool {
        true
    }

    fn is_authorized_for_service(&self, _service: &Service) -> bool {
        true
    }
}

/// A named contact restricted to the objects it is a contact of
#[derive(Debug, Clone)]
pub struct ContactUser {
    name: String,
    service_auth: ServiceAuthorization,
    hidden_tables: HashSet<String>,
}

impl ContactUser {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service_auth: ServiceAuthorization::default(),
            hidden_tables: HashSet::new(),
        }
    }

    pub fn with_service_authorization(mut self, service_auth: ServiceAuthorization) -> Self {
        self.service_auth = service_auth;
        self
    }

    /// Hides a whole table from this user
    pub fn hide_table(mut self, table: impl Into<String>) -> Self {
        self.hidden_tables.insert(table.into());
        self
    }
}

impl User for ContactUser {
    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn is_authorized_for_table(&self, table: &str) -> bool {
        !self.hidden_tables.contains(table)
    }

    fn is_authorized_for_host(&self, host: &Host) -> bool {
        host.has_contact(&self.name)
    }

    fn is_authorized_for_service(&self, service: &Service) -> bool {
        service.has_contact(&self.name)
            || (self.service_auth == ServiceAuthorization::Loose
                && service.host.has_contact(&self.name))
    }
}
