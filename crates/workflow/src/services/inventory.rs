//! Inventory collaborator trait and in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, UnitId};
use thiserror::Error;

/// A sellable catalog unit (a "bag") as seen by the order engine.
///
/// The engine only ever reads `price`/`active` and flips `active`; all
/// other catalog fields live elsewhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InventoryUnit {
    pub id: UnitId,
    pub price: Money,
    pub active: bool,
}

/// Errors from the inventory collaborator.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// The referenced unit does not exist.
    #[error("inventory unit not found: {0}")]
    UnitNotFound(UnitId),

    /// The collaborator could not be reached or failed internally.
    #[error("inventory service unavailable: {0}")]
    Unavailable(String),
}

/// Trait for the external inventory collaborator.
#[async_trait]
pub trait InventoryService: Send + Sync {
    /// Fetches a unit by id, `None` if absent.
    async fn get_unit(&self, id: UnitId) -> Result<Option<InventoryUnit>, InventoryError>;

    /// Sets a unit's activity flag and returns the updated unit.
    async fn set_unit_active(
        &self,
        id: UnitId,
        active: bool,
    ) -> Result<InventoryUnit, InventoryError>;
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    units: HashMap<UnitId, InventoryUnit>,
    fail_deactivation: HashSet<UnitId>,
    deactivations: HashMap<UnitId, u32>,
}

/// In-memory inventory service for tests and default runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryService {
    state: Arc<RwLock<InMemoryInventoryState>>,
}

impl InMemoryInventoryService {
    /// Creates a new empty in-memory inventory service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a unit in the catalog.
    pub fn add_unit(&self, id: UnitId, price: Money, active: bool) {
        let mut state = self.state.write().unwrap();
        state.units.insert(id, InventoryUnit { id, price, active });
    }

    /// Configures `set_unit_active` to fail for the given unit.
    pub fn set_fail_on_deactivate(&self, id: UnitId, fail: bool) {
        let mut state = self.state.write().unwrap();
        if fail {
            state.fail_deactivation.insert(id);
        } else {
            state.fail_deactivation.remove(&id);
        }
    }

    /// Returns true if the unit is currently active.
    pub fn is_active(&self, id: UnitId) -> bool {
        self.state
            .read()
            .unwrap()
            .units
            .get(&id)
            .is_some_and(|u| u.active)
    }

    /// Number of successful deactivations applied to the unit.
    pub fn deactivation_count(&self, id: UnitId) -> u32 {
        self.state
            .read()
            .unwrap()
            .deactivations
            .get(&id)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl InventoryService for InMemoryInventoryService {
    async fn get_unit(&self, id: UnitId) -> Result<Option<InventoryUnit>, InventoryError> {
        let state = self.state.read().unwrap();
        Ok(state.units.get(&id).cloned())
    }

    async fn set_unit_active(
        &self,
        id: UnitId,
        active: bool,
    ) -> Result<InventoryUnit, InventoryError> {
        let mut state = self.state.write().unwrap();

        if !active && state.fail_deactivation.contains(&id) {
            return Err(InventoryError::Unavailable(format!(
                "simulated failure deactivating unit {id}"
            )));
        }

        let unit = state
            .units
            .get_mut(&id)
            .ok_or(InventoryError::UnitNotFound(id))?;
        unit.active = active;
        let unit = unit.clone();

        if !active {
            *state.deactivations.entry(id).or_insert(0) += 1;
        }
        Ok(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_and_deactivate() {
        let service = InMemoryInventoryService::new();
        service.add_unit(UnitId::new(1), Money::from_cents(1099), true);

        let unit = service.get_unit(UnitId::new(1)).await.unwrap().unwrap();
        assert!(unit.active);
        assert_eq!(unit.price.cents(), 1099);

        let updated = service
            .set_unit_active(UnitId::new(1), false)
            .await
            .unwrap();
        assert!(!updated.active);
        assert!(!service.is_active(UnitId::new(1)));
        assert_eq!(service.deactivation_count(UnitId::new(1)), 1);
    }

    #[tokio::test]
    async fn test_missing_unit() {
        let service = InMemoryInventoryService::new();
        assert!(service.get_unit(UnitId::new(9)).await.unwrap().is_none());

        let result = service.set_unit_active(UnitId::new(9), false).await;
        assert!(matches!(result, Err(InventoryError::UnitNotFound(_))));
    }

    #[tokio::test]
    async fn test_simulated_deactivation_failure() {
        let service = InMemoryInventoryService::new();
        service.add_unit(UnitId::new(1), Money::from_cents(100), true);
        service.set_fail_on_deactivate(UnitId::new(1), true);

        let result = service.set_unit_active(UnitId::new(1), false).await;
        assert!(matches!(result, Err(InventoryError::Unavailable(_))));

        // The unit stays active and no deactivation is recorded.
        assert!(service.is_active(UnitId::new(1)));
        assert_eq!(service.deactivation_count(UnitId::new(1)), 0);
    }
}
