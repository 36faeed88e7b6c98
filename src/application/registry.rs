//! Entity registry: arena of the roaming entity graph
//!
//! Operators, pools and stations are plain values; EVSEs are shared
//! controllers. Children store their parent's identifier and resolve it
//! through the registry, so removing an entity never leaves a dangling
//! reference: it is simply refused while children exist.
//!
//! Registering a child and removing a parent both take the structure lock,
//! so the parent check and the insert (or the children check and the
//! removal) happen as one step.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::info;

use crate::application::charging::{EvseController, RequestOptions, SharedEvseController};
use crate::application::events::{Event, EventSubscriber, SharedEventBus, StatusChangedEvent};
use crate::domain::charging_pool::{ChargingPool, ChargingPoolAdminStatusType, ChargingPoolStatusType};
use crate::domain::charging_station::{
    ChargingStation, ChargingStationAdminStatusType, ChargingStationStatusType,
};
use crate::domain::evse::{Evse, EvseSettings};
use crate::domain::ids::{ChargingPoolId, ChargingStationId, EvseId, OperatorId};
use crate::domain::operator::ChargingStationOperator;
use crate::domain::status::{HistoryLimits, ScheduleChange};
use crate::domain::timestamped::Timestamped;
use crate::support::errors::{DomainError, DomainResult};

/// Shared, reference-counted entity registry
pub type SharedEntityRegistry = Arc<EntityRegistry>;

/// Thread-safe registry of the whole entity graph
pub struct EntityRegistry {
    operators: DashMap<OperatorId, ChargingStationOperator>,
    pools: DashMap<ChargingPoolId, ChargingPool>,
    stations: DashMap<ChargingStationId, ChargingStation>,
    evses: DashMap<EvseId, SharedEvseController>,
    structure: Mutex<()>,
    events: SharedEventBus,
    evse_settings: EvseSettings,
}

fn insert_unique<K, V>(map: &DashMap<K, V>, key: K, value: V, entity: &str) -> DomainResult<()>
where
    K: Eq + std::hash::Hash + Clone + std::fmt::Display,
{
    match map.entry(key) {
        Entry::Occupied(occupied) => Err(DomainError::Conflict(format!(
            "{entity} {} is already registered",
            occupied.key()
        ))),
        Entry::Vacant(vacant) => {
            vacant.insert(value);
            Ok(())
        }
    }
}

fn same_operator(child: &OperatorId, parent: &OperatorId, what: &str) -> DomainResult<()> {
    if child != parent {
        return Err(DomainError::invalid_argument(format!(
            "{what} belongs to operator {child}, its parent to {parent}"
        )));
    }
    Ok(())
}

impl EntityRegistry {
    pub fn new(events: SharedEventBus, evse_settings: EvseSettings) -> Self {
        Self {
            operators: DashMap::new(),
            pools: DashMap::new(),
            stations: DashMap::new(),
            evses: DashMap::new(),
            structure: Mutex::new(()),
            events,
            evse_settings,
        }
    }

    /// Wrap in `Arc` for shared ownership
    pub fn shared(events: SharedEventBus, evse_settings: EvseSettings) -> SharedEntityRegistry {
        Arc::new(Self::new(events, evse_settings))
    }

    pub fn events(&self) -> &SharedEventBus {
        &self.events
    }

    pub fn subscribe(&self) -> EventSubscriber {
        self.events.subscribe()
    }

    pub fn history_limits(&self) -> HistoryLimits {
        self.evse_settings.history
    }

    /// Serializes parent/child structure changes. The guarded section never
    /// panics, so a poisoned lock still protects a consistent graph.
    fn lock_structure(&self) -> MutexGuard<'_, ()> {
        self.structure.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Registration ───────────────────────────────────────────

    pub fn add_operator(&self, operator: ChargingStationOperator) -> DomainResult<()> {
        let id = operator.id.clone();
        insert_unique(&self.operators, id.clone(), operator, "operator")?;
        info!(operator_id = %id, "Operator registered");
        Ok(())
    }

    pub fn add_charging_pool(&self, pool: ChargingPool) -> DomainResult<()> {
        let _structure = self.lock_structure();
        if !self.operators.contains_key(&pool.operator_id) {
            return Err(DomainError::not_found("operator", &pool.operator_id));
        }
        let id = pool.id.clone();
        insert_unique(&self.pools, id.clone(), pool, "charging pool")?;
        info!(pool_id = %id, "Charging pool registered");
        Ok(())
    }

    pub fn add_charging_station(&self, station: ChargingStation) -> DomainResult<()> {
        same_operator(
            station.id.operator_id(),
            station.pool_id.operator_id(),
            "charging station",
        )?;
        let _structure = self.lock_structure();
        if !self.pools.contains_key(&station.pool_id) {
            return Err(DomainError::not_found("charging pool", &station.pool_id));
        }
        let id = station.id.clone();
        insert_unique(&self.stations, id.clone(), station, "charging station")?;
        info!(station_id = %id, "Charging station registered");
        Ok(())
    }

    /// Register an EVSE and return its controller
    pub fn add_evse(&self, evse: Evse) -> DomainResult<SharedEvseController> {
        same_operator(evse.id().operator_id(), evse.station_id().operator_id(), "EVSE")?;
        let _structure = self.lock_structure();
        if !self.stations.contains_key(evse.station_id()) {
            return Err(DomainError::not_found("charging station", evse.station_id()));
        }
        let controller = Arc::new(EvseController::new(evse, self.events.clone()));
        let id = controller.id().clone();
        insert_unique(&self.evses, id.clone(), controller.clone(), "EVSE")?;
        info!(evse_id = %id, station_id = %controller.station_id(), "EVSE registered");
        Ok(controller)
    }

    /// Create an EVSE with the registry's default settings
    pub fn create_evse(
        &self,
        id: EvseId,
        station_id: ChargingStationId,
    ) -> DomainResult<SharedEvseController> {
        self.add_evse(Evse::new(id, station_id, self.evse_settings))
    }

    // ── Lookup ─────────────────────────────────────────────────

    pub fn operator(&self, id: &OperatorId) -> Option<ChargingStationOperator> {
        self.operators.get(id).map(|o| o.value().clone())
    }

    pub fn evse(&self, id: &EvseId) -> Option<SharedEvseController> {
        self.evses.get(id).map(|e| e.value().clone())
    }

    pub fn contains_pool(&self, id: &ChargingPoolId) -> bool {
        self.pools.contains_key(id)
    }

    pub fn contains_station(&self, id: &ChargingStationId) -> bool {
        self.stations.contains_key(id)
    }

    /// Run `f` against a registered charging pool
    pub fn with_pool<R>(&self, id: &ChargingPoolId, f: impl FnOnce(&ChargingPool) -> R) -> DomainResult<R> {
        self.pools
            .get(id)
            .map(|pool| f(pool.value()))
            .ok_or_else(|| DomainError::not_found("charging pool", id))
    }

    /// Run `f` against a registered charging station
    pub fn with_station<R>(
        &self,
        id: &ChargingStationId,
        f: impl FnOnce(&ChargingStation) -> R,
    ) -> DomainResult<R> {
        self.stations
            .get(id)
            .map(|station| f(station.value()))
            .ok_or_else(|| DomainError::not_found("charging station", id))
    }

    pub fn evses(&self) -> Vec<SharedEvseController> {
        self.evses.iter().map(|e| e.value().clone()).collect()
    }

    pub fn evses_of_station(&self, station_id: &ChargingStationId) -> Vec<SharedEvseController> {
        self.evses
            .iter()
            .filter(|e| e.station_id() == station_id)
            .map(|e| e.value().clone())
            .collect()
    }

    pub fn stations_of_pool(&self, pool_id: &ChargingPoolId) -> Vec<ChargingStationId> {
        self.stations
            .iter()
            .filter(|s| &s.pool_id == pool_id)
            .map(|s| s.key().clone())
            .collect()
    }

    pub fn pools_of_operator(&self, operator_id: &OperatorId) -> Vec<ChargingPoolId> {
        self.pools
            .iter()
            .filter(|p| &p.operator_id == operator_id)
            .map(|p| p.key().clone())
            .collect()
    }

    pub fn evse_count(&self) -> usize {
        self.evses.len()
    }

    // ── Parent traversal ───────────────────────────────────────

    pub fn station_of_evse(&self, evse_id: &EvseId) -> DomainResult<ChargingStationId> {
        self.evses
            .get(evse_id)
            .map(|e| e.station_id().clone())
            .ok_or_else(|| DomainError::not_found("EVSE", evse_id))
    }

    pub fn pool_of_station(&self, station_id: &ChargingStationId) -> DomainResult<ChargingPoolId> {
        self.with_station(station_id, |s| s.pool_id.clone())
    }

    pub fn operator_of_pool(&self, pool_id: &ChargingPoolId) -> DomainResult<ChargingStationOperator> {
        let operator_id = self.with_pool(pool_id, |p| p.operator_id.clone())?;
        self.operator(&operator_id)
            .ok_or_else(|| DomainError::not_found("operator", operator_id))
    }

    /// Walk EVSE → station → pool → operator
    pub fn operator_of_evse(&self, evse_id: &EvseId) -> DomainResult<ChargingStationOperator> {
        let station_id = self.station_of_evse(evse_id)?;
        let pool_id = self.pool_of_station(&station_id)?;
        self.operator_of_pool(&pool_id)
    }

    // ── Removal ────────────────────────────────────────────────

    pub fn remove_evse(&self, id: &EvseId) -> DomainResult<SharedEvseController> {
        let (_, controller) = self
            .evses
            .remove(id)
            .ok_or_else(|| DomainError::not_found("EVSE", id))?;
        info!(evse_id = %id, "EVSE removed");
        Ok(controller)
    }

    pub fn remove_charging_station(&self, id: &ChargingStationId) -> DomainResult<ChargingStation> {
        let _structure = self.lock_structure();
        let children = self.evses_of_station(id).len();
        if children > 0 {
            return Err(DomainError::Conflict(format!(
                "charging station {id} still has {children} EVSE(s)"
            )));
        }
        let (_, station) = self
            .stations
            .remove(id)
            .ok_or_else(|| DomainError::not_found("charging station", id))?;
        info!(station_id = %id, "Charging station removed");
        Ok(station)
    }

    pub fn remove_charging_pool(&self, id: &ChargingPoolId) -> DomainResult<ChargingPool> {
        let _structure = self.lock_structure();
        let children = self.stations_of_pool(id).len();
        if children > 0 {
            return Err(DomainError::Conflict(format!(
                "charging pool {id} still has {children} charging station(s)"
            )));
        }
        let (_, pool) = self
            .pools
            .remove(id)
            .ok_or_else(|| DomainError::not_found("charging pool", id))?;
        info!(pool_id = %id, "Charging pool removed");
        Ok(pool)
    }

    pub fn remove_operator(&self, id: &OperatorId) -> DomainResult<ChargingStationOperator> {
        let _structure = self.lock_structure();
        let children = self.pools_of_operator(id).len();
        if children > 0 {
            return Err(DomainError::Conflict(format!(
                "operator {id} still has {children} charging pool(s)"
            )));
        }
        let (_, operator) = self
            .operators
            .remove(id)
            .ok_or_else(|| DomainError::not_found("operator", id))?;
        info!(operator_id = %id, "Operator removed");
        Ok(operator)
    }

    // ── Station / pool status ──────────────────────────────────

    pub fn set_station_status(
        &self,
        id: &ChargingStationId,
        status: ChargingStationStatusType,
        options: RequestOptions,
    ) -> DomainResult<Option<ScheduleChange<ChargingStationStatusType>>> {
        let ctx = options.resolve();
        let mut station = self
            .stations
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found("charging station", id))?;
        let change = station
            .tracker
            .set_status(status, ctx.timestamp, ctx.event_tracking_id);
        if let Some(change) = &change {
            self.events
                .publish(Event::ChargingStationStatusChanged(status_event(id, change)));
        }
        Ok(change)
    }

    pub fn set_station_admin_status(
        &self,
        id: &ChargingStationId,
        admin_status: ChargingStationAdminStatusType,
        options: RequestOptions,
    ) -> DomainResult<Option<ScheduleChange<ChargingStationAdminStatusType>>> {
        let ctx = options.resolve();
        let mut station = self
            .stations
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found("charging station", id))?;
        let change = station
            .tracker
            .set_admin_status(admin_status, ctx.timestamp, ctx.event_tracking_id);
        if let Some(change) = &change {
            info!(station_id = %id, old = %change.old.value, new = %change.new.value, "Charging station admin status changed");
            self.events
                .publish(Event::ChargingStationAdminStatusChanged(status_event(id, change)));
        }
        Ok(change)
    }

    pub fn station_status(&self, id: &ChargingStationId) -> DomainResult<Timestamped<ChargingStationStatusType>> {
        self.with_station(id, ChargingStation::status)
    }

    pub fn station_admin_status(
        &self,
        id: &ChargingStationId,
    ) -> DomainResult<Timestamped<ChargingStationAdminStatusType>> {
        self.with_station(id, ChargingStation::admin_status)
    }

    pub fn set_pool_status(
        &self,
        id: &ChargingPoolId,
        status: ChargingPoolStatusType,
        options: RequestOptions,
    ) -> DomainResult<Option<ScheduleChange<ChargingPoolStatusType>>> {
        let ctx = options.resolve();
        let mut pool = self
            .pools
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found("charging pool", id))?;
        let change = pool
            .tracker
            .set_status(status, ctx.timestamp, ctx.event_tracking_id);
        if let Some(change) = &change {
            self.events
                .publish(Event::ChargingPoolStatusChanged(status_event(id, change)));
        }
        Ok(change)
    }

    pub fn set_pool_admin_status(
        &self,
        id: &ChargingPoolId,
        admin_status: ChargingPoolAdminStatusType,
        options: RequestOptions,
    ) -> DomainResult<Option<ScheduleChange<ChargingPoolAdminStatusType>>> {
        let ctx = options.resolve();
        let mut pool = self
            .pools
            .get_mut(id)
            .ok_or_else(|| DomainError::not_found("charging pool", id))?;
        let change = pool
            .tracker
            .set_admin_status(admin_status, ctx.timestamp, ctx.event_tracking_id);
        if let Some(change) = &change {
            info!(pool_id = %id, old = %change.old.value, new = %change.new.value, "Charging pool admin status changed");
            self.events
                .publish(Event::ChargingPoolAdminStatusChanged(status_event(id, change)));
        }
        Ok(change)
    }

    pub fn pool_status(&self, id: &ChargingPoolId) -> DomainResult<Timestamped<ChargingPoolStatusType>> {
        self.with_pool(id, ChargingPool::status)
    }

    pub fn pool_admin_status(
        &self,
        id: &ChargingPoolId,
    ) -> DomainResult<Timestamped<ChargingPoolAdminStatusType>> {
        self.with_pool(id, ChargingPool::admin_status)
    }

    /// Detach the remote execution path of every EVSE
    pub async fn detach_all_remotes(&self) {
        for evse in self.evses() {
            evse.detach_remote().await;
        }
    }
}

fn status_event<I: Clone, T: Clone>(id: &I, change: &ScheduleChange<T>) -> StatusChangedEvent<I, T> {
    StatusChangedEvent {
        id: id.clone(),
        old: change.old.clone(),
        new: change.new.clone(),
        event_tracking_id: change.event_tracking_id,
        timestamp: change.timestamp,
    }
}

impl std::fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("operators", &self.operators.len())
            .field("pools", &self.pools.len())
            .field("stations", &self.stations.len())
            .field("evses", &self.evses.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::create_event_bus;
    use crate::domain::evse::EvseStatusType;

    fn registry() -> EntityRegistry {
        EntityRegistry::new(create_event_bus(64), EvseSettings::default())
    }

    fn populated() -> EntityRegistry {
        let registry = registry();
        let operator: OperatorId = "DE*GEF".parse().unwrap();
        registry
            .add_operator(ChargingStationOperator::new(operator, "GraphDefined"))
            .unwrap();
        registry
            .add_charging_pool(ChargingPool::new("DE*GEF*P1".parse().unwrap(), HistoryLimits::default()))
            .unwrap();
        registry
            .add_charging_station(ChargingStation::new(
                "DE*GEF*S1".parse().unwrap(),
                "DE*GEF*P1".parse().unwrap(),
                HistoryLimits::default(),
            ))
            .unwrap();
        registry
            .create_evse("DE*GEF*E1*1".parse().unwrap(), "DE*GEF*S1".parse().unwrap())
            .unwrap();
        registry
    }

    #[test]
    fn children_require_registered_parent() {
        let registry = registry();
        let err = registry
            .add_charging_pool(ChargingPool::new("DE*GEF*P1".parse().unwrap(), HistoryLimits::default()))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "operator", .. }));

        let err = registry
            .create_evse("DE*GEF*E1*1".parse().unwrap(), "DE*GEF*S1".parse().unwrap())
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "charging station", .. }));
    }

    #[test]
    fn duplicates_conflict() {
        let registry = populated();
        let err = registry
            .create_evse("DE*GEF*E1*1".parse().unwrap(), "DE*GEF*S1".parse().unwrap())
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(registry.evse_count(), 1);
    }

    #[test]
    fn evse_must_share_station_operator() {
        let registry = populated();
        let err = registry
            .create_evse("DE*XYZ*E1".parse().unwrap(), "DE*GEF*S1".parse().unwrap())
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
    }

    #[test]
    fn parents_resolve_through_registry() {
        let registry = populated();
        let evse_id: EvseId = "DE*GEF*E1*1".parse().unwrap();
        assert_eq!(registry.station_of_evse(&evse_id).unwrap().to_string(), "DE*GEF*S1");
        assert_eq!(registry.operator_of_evse(&evse_id).unwrap().name, "GraphDefined");
    }

    #[test]
    fn removal_refused_while_children_exist() {
        let registry = populated();
        let station_id: ChargingStationId = "DE*GEF*S1".parse().unwrap();
        assert!(matches!(
            registry.remove_charging_station(&station_id),
            Err(DomainError::Conflict(_))
        ));

        registry.remove_evse(&"DE*GEF*E1*1".parse().unwrap()).unwrap();
        registry.remove_charging_station(&station_id).unwrap();
        registry.remove_charging_pool(&"DE*GEF*P1".parse().unwrap()).unwrap();
        registry.remove_operator(&"DE*GEF".parse().unwrap()).unwrap();
        assert!(registry.operator(&"DE*GEF".parse().unwrap()).is_none());
    }

    #[test]
    fn station_status_changes_are_published() {
        let registry = populated();
        let mut events = registry.subscribe();
        let station_id: ChargingStationId = "DE*GEF*S1".parse().unwrap();

        registry
            .set_station_admin_status(
                &station_id,
                ChargingStationAdminStatusType::Operational,
                RequestOptions::new(),
            )
            .unwrap();
        registry
            .set_station_status(&station_id, ChargingStationStatusType::Available, RequestOptions::new())
            .unwrap();

        assert_eq!(
            registry.station_status(&station_id).unwrap().value,
            ChargingStationStatusType::Available
        );
        let types: Vec<_> = events.drain().iter().map(|m| m.event.event_type()).collect();
        assert_eq!(
            types,
            vec![
                "charging_station_admin_status_changed",
                "charging_station_status_changed"
            ]
        );
    }

    #[tokio::test]
    async fn evse_controllers_share_registry_bus() {
        let registry = populated();
        let mut events = registry.subscribe();
        let evse = registry.evse(&"DE*GEF*E1*1".parse().unwrap()).unwrap();
        evse.set_status(EvseStatusType::Available, RequestOptions::new()).await;
        assert_eq!(events.drain().len(), 1);
    }

    #[test]
    fn concurrent_evse_add_and_station_removal_never_orphan() {
        let station_id: ChargingStationId = "DE*GEF*S1".parse().unwrap();
        let evse_id: EvseId = "DE*GEF*E1*2".parse().unwrap();

        for _ in 0..500 {
            let registry = Arc::new(populated());
            registry.remove_evse(&"DE*GEF*E1*1".parse().unwrap()).unwrap();
            let barrier = Arc::new(std::sync::Barrier::new(2));

            let adder = {
                let (registry, barrier) = (registry.clone(), barrier.clone());
                let (evse_id, station_id) = (evse_id.clone(), station_id.clone());
                std::thread::spawn(move || {
                    barrier.wait();
                    registry.create_evse(evse_id, station_id).is_ok()
                })
            };
            let remover = {
                let (registry, barrier) = (registry.clone(), barrier.clone());
                let station_id = station_id.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    registry.remove_charging_station(&station_id).is_ok()
                })
            };
            let added = adder.join().unwrap();
            let removed = remover.join().unwrap();

            assert!(!(added && removed), "EVSE registered under a removed station");
            if added {
                assert!(registry.contains_station(&station_id));
                assert_eq!(registry.station_of_evse(&evse_id).unwrap(), station_id);
            }
        }
    }
}
