//! Reachability anchor for the owner region

use std::sync::Arc;

use crate::pool::OwnerRegion;
use crate::scope::CloseAction;

/// Holds the owner region for as long as a lease scope is alive
///
/// Registered as a close action, so the scope (and therefore every segment
/// sliced from the region) keeps the region's bytes allocated even after the
/// lease itself and the worker that built the pool are gone.
pub(crate) struct KeepAlive(Arc<OwnerRegion>);

impl KeepAlive {
    pub(crate) fn new(region: Arc<OwnerRegion>) -> Self {
        Self(region)
    }

    pub(crate) fn into_close_action(self) -> CloseAction {
        Box::new(move || drop(self))
    }
}
