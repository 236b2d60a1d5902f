//! Result of an ensure-style operation

use graft_model::ObjectId;
use serde::Serialize;

/// An object that now exists, and whether this call created it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ensured {
    /// The object
    pub id: ObjectId,
    /// True when created by this call, false when reused
    pub created: bool,
}

impl Ensured {
    /// Freshly created object
    #[inline]
    #[must_use]
    pub fn created(id: ObjectId) -> Self {
        Self { id, created: true }
    }

    /// Pre-existing object
    #[inline]
    #[must_use]
    pub fn reused(id: ObjectId) -> Self {
        Self { id, created: false }
    }
}
