//! Environment resolution: which of the two datastore backends a request
//! operates against.
//!
//! The tag is resolved once, early in the request lifecycle, and stays fixed
//! for the remainder of that request ([`RequestEnvironment`] has no mutation
//! API). An explicit signal wins and becomes sticky; otherwise the sticky
//! value is reused; otherwise production is assumed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};

use crate::core::StoreError;

/// Selects one of the two isolated datastore backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentTag {
    Dev,
    #[default]
    Prod,
}

impl EnvironmentTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dev => "dev",
            Self::Prod => "prod",
        }
    }

    /// Strict parse: only the exact strings "dev" and "prod" are recognized.
    /// Anything else means "no explicit signal" to the resolver.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "dev" => Some(Self::Dev),
            "prod" => Some(Self::Prod),
            _ => None,
        }
    }
}

impl fmt::Display for EnvironmentTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnvironmentTag {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
            .ok_or_else(|| StoreError::Execution(format!("Unknown environment tag '{}'", s)))
    }
}

/// Raw environment signals carried by an inbound request.
///
/// The query parameter takes precedence over the header.
#[derive(Debug, Clone, Default)]
pub struct RequestSignals {
    query: Option<String>,
    header: Option<String>,
}

impl RequestSignals {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn query(value: impl Into<String>) -> Self {
        Self {
            query: Some(value.into()),
            header: None,
        }
    }

    pub fn header(value: impl Into<String>) -> Self {
        Self {
            query: None,
            header: Some(value.into()),
        }
    }

    pub fn with_query(mut self, value: impl Into<String>) -> Self {
        self.query = Some(value.into());
        self
    }

    pub fn with_header(mut self, value: impl Into<String>) -> Self {
        self.header = Some(value.into());
        self
    }

    fn explicit(&self) -> Option<&str> {
        self.query.as_deref().or(self.header.as_deref())
    }
}

/// Session-scoped slot remembering the last explicitly selected tag.
///
/// Shared by handle; the HTTP layer keeps one per logical session.
#[derive(Debug, Clone, Default)]
pub struct StickyStore {
    slot: Arc<RwLock<Option<EnvironmentTag>>>,
}

impl StickyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<EnvironmentTag> {
        self.slot.read().ok().and_then(|slot| *slot)
    }

    pub fn set(&self, tag: EnvironmentTag) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = Some(tag);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.slot.write() {
            *slot = None;
        }
    }
}

/// Derives the active environment tag from request signals.
///
/// Resolution never fails: a valid explicit signal wins and is persisted to
/// the sticky store, an existing sticky value is reused next, and production
/// is the final fallback.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentResolver {
    sticky: StickyStore,
}

impl EnvironmentResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sticky(sticky: StickyStore) -> Self {
        Self { sticky }
    }

    pub fn sticky(&self) -> &StickyStore {
        &self.sticky
    }

    pub fn resolve(&self, signals: &RequestSignals) -> EnvironmentTag {
        if let Some(tag) = signals.explicit().and_then(EnvironmentTag::parse) {
            self.sticky.set(tag);
            return tag;
        }

        self.sticky.get().unwrap_or_default()
    }

    /// Resolves and freezes the tag for one request.
    pub fn resolve_request(&self, signals: &RequestSignals) -> RequestEnvironment {
        RequestEnvironment {
            tag: self.resolve(signals),
        }
    }
}

/// The per-request resolution product. Immutable once constructed; there is
/// no way to switch environments mid-request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestEnvironment {
    tag: EnvironmentTag,
}

impl RequestEnvironment {
    pub fn tag(&self) -> EnvironmentTag {
        self.tag
    }
}
