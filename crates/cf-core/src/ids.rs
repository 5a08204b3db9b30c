use core::fmt;
use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{CoreError, CoreResult};

/// Globally unique identifier of an instrument (sensor or actuator).
///
/// - Only an [`IdentityRegistry`] hands these out, so two live instruments
///   allocated from the same registry never share one
/// - `Arc<str>` keeps clones cheap; every Signal carries one
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstrumentId(Arc<str>);

impl InstrumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstrumentId({})", self.0)
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for InstrumentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for InstrumentId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Ledger of every identity handed out so far.
///
/// There is no release operation: once allocated, an identity
/// stays taken for as long as the registry lives. Construct one registry per
/// plant (or per test) and pass it to instrument constructors.
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    used: Mutex<HashSet<Arc<str>>>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `value` as a new instrument identity.
    ///
    /// Fails with [`CoreError::DuplicateIdentity`] if `value` was already
    /// allocated; the registry is left unchanged in that case.
    pub fn allocate(&self, value: impl AsRef<str>) -> CoreResult<InstrumentId> {
        let value = value.as_ref();
        if value.trim().is_empty() {
            return Err(CoreError::InvalidArg {
                what: "instrument id must not be blank",
            });
        }

        let mut used = self.used.lock();
        if used.contains(value) {
            tracing::error!(instrument = value, "instrument id already allocated");
            return Err(CoreError::DuplicateIdentity {
                id: value.to_string(),
            });
        }
        let id: Arc<str> = Arc::from(value);
        used.insert(Arc::clone(&id));
        Ok(InstrumentId(id))
    }

    pub fn is_allocated(&self, value: &str) -> bool {
        self.used.lock().contains(value)
    }

    pub fn len(&self) -> usize {
        self.used.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.lock().is_empty()
    }
}
