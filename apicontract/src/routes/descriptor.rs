//! Route table entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ExtractionError;
use crate::handlers::HandlerRef;

/// HTTP method of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// HEAD
    Head,
    /// OPTIONS
    Options,
}

impl HttpMethod {
    /// Upper-case wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            "HEAD" => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            other => Err(format!("unsupported HTTP method '{other}'")),
        }
    }
}

/// One registered route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    /// HTTP method.
    pub method: HttpMethod,
    /// URI template with `{param}` placeholders, always starting with `/`.
    pub uri: String,
    /// Handler action as written in the route table (`Handler@method`).
    pub action: String,
    middleware: Vec<String>,
}

impl RouteDescriptor {
    /// Creates a route with no middleware.
    #[must_use]
    pub fn new(method: HttpMethod, uri: &str, action: impl Into<String>) -> Self {
        Self {
            method,
            uri: normalize_uri(uri),
            action: action.into(),
            middleware: Vec::new(),
        }
    }

    /// Adds middleware, skipping entries already present.
    #[must_use]
    pub fn with_middleware<I, S>(mut self, middleware: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in middleware {
            let name = name.into();
            if !self.middleware.contains(&name) {
                self.middleware.push(name);
            }
        }
        self
    }

    /// Middleware in declaration order.
    #[must_use]
    pub fn middleware(&self) -> &[String] {
        &self.middleware
    }

    /// Parses the action into a handler reference.
    pub fn handler(&self) -> Result<HandlerRef, ExtractionError> {
        HandlerRef::parse(&self.action).map_err(|err| {
            err.with_context("uri", self.uri.clone())
                .with_context("method", self.method.as_str())
        })
    }
}

fn normalize_uri(uri: &str) -> String {
    let trimmed = uri.trim();
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}
