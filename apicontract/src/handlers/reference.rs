//! Handler references parsed from route actions.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::contracts::codes;
use crate::errors::ExtractionError;

/// A handler type plus the method a route dispatches to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerRef {
    /// Handler (controller) name, possibly namespaced.
    pub handler: String,
    /// Method invoked on the handler.
    pub method: String,
}

impl HandlerRef {
    /// Creates a handler reference.
    #[must_use]
    pub fn new(handler: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            method: method.into(),
        }
    }

    /// Parses `Handler@method` or `Handler::method`.
    ///
    /// The `::` form splits on the last separator so namespaced handlers
    /// (`app::http::PostController::show`) keep their path.
    pub fn parse(action: &str) -> Result<Self, ExtractionError> {
        let action = action.trim();
        let split = action
            .split_once('@')
            .or_else(|| action.rsplit_once("::"));

        match split {
            Some((handler, method))
                if !handler.trim().is_empty()
                    && !method.trim().is_empty()
                    && !method.contains(['@', ':']) =>
            {
                Ok(Self::new(handler.trim(), method.trim()))
            }
            _ => Err(ExtractionError::new(
                codes::ROUTE_INVALID_ACTION_FORMAT,
                format!("Route action '{action}' is not of the form 'Handler@method'"),
            )
            .with_context("action", action)),
        }
    }

    /// Handler name without its namespace.
    #[must_use]
    pub fn short_handler(&self) -> &str {
        short_name(&self.handler)
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.handler, self.method)
    }
}

/// Strips a `\`, `::` or `/` separated namespace from a type name.
#[must_use]
pub fn short_name(name: &str) -> &str {
    let after_colons = name.rsplit("::").next().unwrap_or(name);
    after_colons
        .rsplit(['\\', '/'])
        .next()
        .unwrap_or(after_colons)
}
