use std::sync::Mutex;

use async_trait::async_trait;
use crossbeam_channel::Sender;
use fxhash::FxHashMap;

use crate::core::config::TrackerOptions;
use crate::core::geo::{Coordinate, LocationReading};
use crate::core::geomath;
use crate::tracking::{LocationError, PositionUpdate, WatchId};
use crate::traits::LocationProvider;

#[derive(Debug, Clone)]
enum InitialFix {
    Reading(LocationReading),
    Fail(LocationError),
    Hang,
}

#[derive(Debug)]
struct ProviderState {
    initial: InitialFix,
    next_watch: u64,
    watchers: FxHashMap<WatchId, Sender<PositionUpdate>>,
    requests: usize,
    cancels: usize,
}

/// In-process location provider driven by the caller.
///
/// `request_once` answers with the configured initial fix (or failure), and
/// every reading passed to [`push`](Self::push) is delivered to all active
/// watches.
#[derive(Debug)]
pub struct SimulatedLocationProvider {
    state: Mutex<ProviderState>,
}

impl SimulatedLocationProvider {
    /// Provider without a fix; the initial request fails as unavailable
    pub fn new() -> Self {
        Self::with_initial(InitialFix::Fail(LocationError::ProviderUnavailable(
            "no position fix".into(),
        )))
    }

    pub fn with_fix(reading: LocationReading) -> Self {
        Self::with_initial(InitialFix::Reading(reading))
    }

    fn with_initial(initial: InitialFix) -> Self {
        Self {
            state: Mutex::new(ProviderState {
                initial,
                next_watch: 1,
                watchers: FxHashMap::default(),
                requests: 0,
                cancels: 0,
            }),
        }
    }

    fn update<F: FnOnce(&mut ProviderState) -> R, R: Default>(&self, f: F) -> R {
        match self.state.lock() {
            Ok(mut state) => f(&mut state),
            Err(_) => R::default(),
        }
    }

    pub fn set_fix(&self, reading: LocationReading) {
        self.update(|state| state.initial = InitialFix::Reading(reading));
    }

    /// Make the next initial request fail with `error`
    pub fn set_failure(&self, error: LocationError) {
        self.update(|state| state.initial = InitialFix::Fail(error));
    }

    pub fn deny(&self) {
        self.set_failure(LocationError::PermissionDenied);
    }

    /// Make the next initial request never resolve
    pub fn hang(&self) {
        self.update(|state| state.initial = InitialFix::Hang);
    }

    /// Deliver a reading to every watch; returns how many received it
    pub fn push(&self, reading: LocationReading) -> usize {
        self.broadcast(Ok(reading))
    }

    pub fn push_error(&self, error: LocationError) -> usize {
        self.broadcast(Err(error))
    }

    fn broadcast(&self, update: PositionUpdate) -> usize {
        self.update(|state| {
            state
                .watchers
                .retain(|_, sender| sender.send(update.clone()).is_ok());
            state.watchers.len()
        })
    }

    /// Drop every watch channel without being asked to
    pub fn close_watches(&self) {
        self.update(|state| state.watchers.clear());
    }

    pub fn active_watches(&self) -> usize {
        self.update(|state| state.watchers.len())
    }

    pub fn request_count(&self) -> usize {
        self.update(|state| state.requests)
    }

    pub fn cancel_count(&self) -> usize {
        self.update(|state| state.cancels)
    }
}

impl Default for SimulatedLocationProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LocationProvider for SimulatedLocationProvider {
    async fn request_once(&self, _options: &TrackerOptions) -> Result<LocationReading, LocationError> {
        let initial = match self.state.lock() {
            Ok(mut state) => {
                state.requests += 1;
                state.initial.clone()
            }
            Err(_) => InitialFix::Fail(LocationError::ProviderUnavailable(
                "provider state poisoned".into(),
            )),
        };

        match initial {
            InitialFix::Reading(reading) => Ok(reading),
            InitialFix::Fail(error) => Err(error),
            InitialFix::Hang => {
                futures::future::pending::<()>().await;
                Err(LocationError::ProviderUnavailable("request abandoned".into()))
            }
        }
    }

    fn watch(
        &self,
        _options: &TrackerOptions,
        updates: Sender<PositionUpdate>,
    ) -> Result<WatchId, LocationError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| LocationError::ProviderUnavailable("provider state poisoned".into()))?;
        let id = WatchId(state.next_watch);
        state.next_watch += 1;
        state.watchers.insert(id, updates);
        Ok(id)
    }

    fn cancel(&self, watch: WatchId) {
        self.update(|state| {
            if state.watchers.remove(&watch).is_some() {
                state.cancels += 1;
            }
        });
    }
}

/// Straight-line walk with deterministic GPS wobble
#[derive(Debug, Clone)]
pub struct WalkPath {
    pub origin: Coordinate,
    pub bearing_deg: f64,
    pub speed_mps: f64,
    pub accuracy_m: f64,
    /// Amplitude of the simulated position noise
    pub jitter_m: f64,
}

impl WalkPath {
    pub fn new(origin: Coordinate, bearing_deg: f64, speed_mps: f64) -> Self {
        Self {
            origin,
            bearing_deg,
            speed_mps,
            accuracy_m: 8.0,
            jitter_m: 2.0,
        }
    }

    pub fn with_accuracy(mut self, accuracy_m: f64) -> Self {
        self.accuracy_m = accuracy_m;
        self
    }

    pub fn with_jitter(mut self, jitter_m: f64) -> Self {
        self.jitter_m = jitter_m;
        self
    }

    /// Reading the device would report `elapsed_ms` into the walk
    pub fn reading_at(&self, elapsed_ms: u64) -> LocationReading {
        let seconds = elapsed_ms as f64 / 1000.0;
        let along = geomath::destination(&self.origin, self.bearing_deg, self.speed_mps * seconds);

        // incommensurate periods so the wobble never lines up with sampling
        let wobble = self.jitter_m * (seconds * 1.7).sin();
        let sideways = self.jitter_m * (seconds * 2.3).cos();
        let noisy = geomath::destination(
            &geomath::destination(&along, self.bearing_deg, wobble),
            self.bearing_deg + 90.0,
            sideways,
        );

        LocationReading::new(noisy, self.accuracy_m, elapsed_ms)
    }
}
