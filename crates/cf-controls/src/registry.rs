//! Exclusivity ledger for control loops.
//!
//! A sensor or actuator may participate in at most one control loop, and a
//! loop id may be claimed only once. Claims are permanent: there is no
//! unregister operation, so an instrument taken by a loop stays taken for as
//! long as the registry lives.

use std::collections::{HashMap, HashSet};

use cf_core::InstrumentId;
use parking_lot::Mutex;
use tracing::{error, info};

use crate::error::{ControlError, ControlResult, RegisteredEntity};

#[derive(Debug, Default)]
struct Claims {
    sensors: HashMap<InstrumentId, String>,
    actuators: HashMap<InstrumentId, String>,
    loops: HashSet<String>,
}

/// Records which control loop owns which sensor and actuator.
#[derive(Debug, Default)]
pub struct ControlLoopRegistry {
    claims: Mutex<Claims>,
}

impl ControlLoopRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `sensor` and `actuator` for the loop `loop_id`.
    ///
    /// The check and the insert happen under one lock, so of two concurrent
    /// registrations for the same sensor exactly one succeeds.
    ///
    /// # Errors
    ///
    /// [`ControlError::DuplicateRegistration`] naming the first claim found
    /// taken (sensor, then actuator, then loop). Nothing is inserted on error.
    pub fn register(
        &self,
        loop_id: &str,
        sensor: &InstrumentId,
        actuator: &InstrumentId,
    ) -> ControlResult<()> {
        let mut claims = self.claims.lock();

        let taken = if claims.sensors.contains_key(sensor) {
            Some(RegisteredEntity::Sensor(sensor.clone()))
        } else if claims.actuators.contains_key(actuator) {
            Some(RegisteredEntity::Actuator(actuator.clone()))
        } else if claims.loops.contains(loop_id) {
            Some(RegisteredEntity::ControlLoop(loop_id.to_string()))
        } else {
            None
        };
        if let Some(entity) = taken {
            error!(%entity, "already registered; cannot complete registration");
            return Err(ControlError::DuplicateRegistration { entity });
        }

        claims.sensors.insert(sensor.clone(), loop_id.to_string());
        claims.actuators.insert(actuator.clone(), loop_id.to_string());
        claims.loops.insert(loop_id.to_string());
        info!(control_loop = loop_id, %sensor, %actuator, "control loop registered");
        Ok(())
    }

    /// Id of the loop that owns `sensor`, if any.
    pub fn sensor_owner(&self, sensor: &InstrumentId) -> Option<String> {
        self.claims.lock().sensors.get(sensor).cloned()
    }

    /// Id of the loop that owns `actuator`, if any.
    pub fn actuator_owner(&self, actuator: &InstrumentId) -> Option<String> {
        self.claims.lock().actuators.get(actuator).cloned()
    }

    pub fn is_loop_registered(&self, loop_id: &str) -> bool {
        self.claims.lock().loops.contains(loop_id)
    }

    /// Number of registered loops.
    pub fn len(&self) -> usize {
        self.claims.lock().loops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.lock().loops.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cf_core::IdentityRegistry;
    use std::sync::{Arc, Barrier};

    struct Fixture {
        ids: IdentityRegistry,
        registry: ControlLoopRegistry,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                ids: IdentityRegistry::new(),
                registry: ControlLoopRegistry::new(),
            }
        }

        fn id(&self, value: &str) -> InstrumentId {
            self.ids.allocate(value).unwrap()
        }
    }

    #[test]
    fn register_records_owners() {
        let f = Fixture::new();
        let (s, a) = (f.id("TT-1"), f.id("TV-1"));
        f.registry.register("TIC-1", &s, &a).unwrap();

        assert_eq!(f.registry.sensor_owner(&s).as_deref(), Some("TIC-1"));
        assert_eq!(f.registry.actuator_owner(&a).as_deref(), Some("TIC-1"));
        assert!(f.registry.is_loop_registered("TIC-1"));
        assert_eq!(f.registry.len(), 1);
    }

    #[test]
    fn duplicate_sensor_rejected_without_partial_insert() {
        let f = Fixture::new();
        let (s, a1, a2) = (f.id("TT-1"), f.id("TV-1"), f.id("TV-2"));
        f.registry.register("TIC-1", &s, &a1).unwrap();

        let err = f.registry.register("TIC-2", &s, &a2).unwrap_err();
        assert_eq!(
            err,
            ControlError::DuplicateRegistration {
                entity: RegisteredEntity::Sensor(s.clone())
            }
        );
        assert!(f.registry.actuator_owner(&a2).is_none());
        assert!(!f.registry.is_loop_registered("TIC-2"));
    }

    #[test]
    fn duplicate_actuator_rejected() {
        let f = Fixture::new();
        let (s1, s2, a) = (f.id("TT-1"), f.id("TT-2"), f.id("TV-1"));
        f.registry.register("TIC-1", &s1, &a).unwrap();

        let err = f.registry.register("TIC-2", &s2, &a).unwrap_err();
        assert!(matches!(
            err,
            ControlError::DuplicateRegistration {
                entity: RegisteredEntity::Actuator(_)
            }
        ));
        assert!(f.registry.sensor_owner(&s2).is_none());
    }

    #[test]
    fn duplicate_loop_id_rejected() {
        let f = Fixture::new();
        let (s1, s2, a1, a2) = (f.id("TT-1"), f.id("TT-2"), f.id("TV-1"), f.id("TV-2"));
        f.registry.register("TIC-1", &s1, &a1).unwrap();

        let err = f.registry.register("TIC-1", &s2, &a2).unwrap_err();
        assert_eq!(
            err,
            ControlError::DuplicateRegistration {
                entity: RegisteredEntity::ControlLoop("TIC-1".to_string())
            }
        );
    }

    #[test]
    fn concurrent_claims_on_one_sensor_have_one_winner() {
        let f = Arc::new(Fixture::new());
        let sensor = f.id("TT-shared");
        let actuators: Vec<_> = (0..8).map(|i| f.id(&format!("TV-{i}"))).collect();
        let barrier = Arc::new(Barrier::new(actuators.len()));

        let handles: Vec<_> = actuators
            .into_iter()
            .enumerate()
            .map(|(i, actuator)| {
                let (f, sensor, barrier) = (Arc::clone(&f), sensor.clone(), Arc::clone(&barrier));
                std::thread::spawn(move || {
                    barrier.wait();
                    f.registry
                        .register(&format!("TIC-{i}"), &sensor, &actuator)
                        .is_ok()
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .filter_map(|h| h.join().ok())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(f.registry.len(), 1);
    }
}
