use std::sync::Arc;

use crossbeam_channel::{Receiver, TryRecvError};

use super::filter::{FilterVerdict, ReadingFilter};
use super::{LocationError, PermissionStatus, PositionUpdate, TrackingState, WatchId};
use crate::core::config::TrackerOptions;
use crate::core::events::{ListenerSet, Subscription};
use crate::core::geo::LocationReading;
use crate::traits::LocationProvider;

/// Counters for readings seen by the tracker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerStats {
    pub received: u64,
    pub accepted: u64,
    pub rejected_inaccurate: u64,
    pub rejected_insignificant: u64,
}

struct ActiveWatch {
    id: WatchId,
    updates: Receiver<PositionUpdate>,
}

/// Owns at most one device-location subscription and publishes filtered
/// readings.
///
/// The provider pushes raw events into a channel owned by the current watch;
/// [`pump`](LocationTracker::pump) drains it in arrival order. Stopping (or
/// dropping) the tracker cancels the watch and discards the channel, so
/// events from a cancelled watch can never reach subscribers.
pub struct LocationTracker {
    provider: Arc<dyn LocationProvider>,
    options: TrackerOptions,
    state: TrackingState,
    permission: PermissionStatus,
    watch: Option<ActiveWatch>,
    filter: ReadingFilter,
    current: Option<LocationReading>,
    last_error: Option<LocationError>,
    readings: ListenerSet<LocationReading>,
    errors: ListenerSet<LocationError>,
    stats: TrackerStats,
}

impl LocationTracker {
    pub fn new(provider: Arc<dyn LocationProvider>) -> Self {
        Self::with_options(provider, TrackerOptions::default())
    }

    pub fn with_options(provider: Arc<dyn LocationProvider>, options: TrackerOptions) -> Self {
        let filter = ReadingFilter::new(&options);
        Self {
            provider,
            options,
            state: TrackingState::Idle,
            permission: PermissionStatus::Prompt,
            watch: None,
            filter,
            current: None,
            last_error: None,
            readings: ListenerSet::new(),
            errors: ListenerSet::new(),
            stats: TrackerStats::default(),
        }
    }

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn permission(&self) -> PermissionStatus {
        self.permission
    }

    /// Latest accepted (filtered) reading
    pub fn current_location(&self) -> Option<&LocationReading> {
        self.current.as_ref()
    }

    pub fn last_error(&self) -> Option<&LocationError> {
        self.last_error.as_ref()
    }

    pub fn options(&self) -> &TrackerOptions {
        &self.options
    }

    pub fn stats(&self) -> TrackerStats {
        self.stats
    }

    pub fn is_watching(&self) -> bool {
        self.watch.is_some()
    }

    /// Receive every accepted reading until the subscription is dropped
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&LocationReading) + Send + Sync + 'static,
    {
        self.readings.subscribe(listener)
    }

    /// Receive provider failures until the subscription is dropped
    pub fn on_error<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&LocationError) + Send + Sync + 'static,
    {
        self.errors.subscribe(listener)
    }

    /// Request an initial fix and, once it resolves, begin watching.
    ///
    /// Failures are reported through [`on_error`](Self::on_error) and leave
    /// the tracker in [`TrackingState::Error`]; nothing is retried.
    pub async fn start(&mut self, options: TrackerOptions) -> TrackingState {
        self.cancel_watch();
        self.filter = ReadingFilter::new(&options);
        self.options = options;
        self.last_error = None;
        self.state = TrackingState::Requesting;
        log::info!(
            "requesting location (high_accuracy={}, timeout={} ms)",
            self.options.enable_high_accuracy,
            self.options.timeout_ms
        );

        let provider = Arc::clone(&self.provider);
        let options = self.options.clone();
        let initial = match tokio::time::timeout(options.timeout(), provider.request_once(&options))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(LocationError::ProviderTimeout {
                timeout_ms: options.timeout_ms,
            }),
        };

        let reading = match initial {
            Ok(reading) => reading,
            Err(error) => {
                self.fail(error);
                return self.state;
            }
        };

        self.permission = PermissionStatus::Granted;
        let (sender, updates) = crossbeam_channel::unbounded();
        match self.provider.watch(&options, sender) {
            Ok(id) => {
                log::info!("location watch {:?} started", id);
                self.watch = Some(ActiveWatch { id, updates });
                self.state = TrackingState::Watching;
                self.process(reading);
            }
            Err(error) => self.fail(error),
        }
        self.state
    }

    /// Manual, user-triggered retry with the last options
    pub async fn request_location(&mut self) -> TrackingState {
        let options = self.options.clone();
        self.start(options).await
    }

    /// Drain pending provider events, returning the readings accepted in
    /// this batch (oldest first)
    pub fn pump(&mut self) -> Vec<LocationReading> {
        let mut accepted = Vec::new();
        loop {
            let next = match &self.watch {
                Some(watch) => watch.updates.try_recv(),
                None => break,
            };

            match next {
                Ok(Ok(reading)) => {
                    if let Some(reading) = self.process(reading) {
                        accepted.push(reading);
                    }
                }
                Ok(Err(error)) => {
                    self.fail(error);
                    break;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.fail(LocationError::ProviderUnavailable(
                        "location watch closed by provider".into(),
                    ));
                    break;
                }
            }
        }
        accepted
    }

    /// Cancel the watch and go idle. No-op unless requesting or watching.
    pub fn stop(&mut self) {
        self.cancel_watch();
        if matches!(
            self.state,
            TrackingState::Watching | TrackingState::Requesting
        ) {
            log::info!("location tracking stopped");
            self.state = TrackingState::Idle;
        }
    }

    fn process(&mut self, reading: LocationReading) -> Option<LocationReading> {
        self.stats.received += 1;
        match self.filter.offer(reading) {
            FilterVerdict::Accepted(accepted) => {
                self.stats.accepted += 1;
                log::debug!(
                    "accepted fix ({:.6}, {:.6}) ±{:.1} m",
                    accepted.lat(),
                    accepted.lng(),
                    accepted.accuracy
                );
                self.current = Some(accepted);
                self.readings.emit(&accepted);
                Some(accepted)
            }
            FilterVerdict::Inaccurate { accuracy } => {
                self.stats.rejected_inaccurate += 1;
                log::debug!(
                    "rejected fix: accuracy {:.1} m above {:.1} m",
                    accuracy,
                    self.options.max_accuracy_m
                );
                None
            }
            FilterVerdict::Insignificant { moved_m } => {
                self.stats.rejected_insignificant += 1;
                log::debug!("rejected fix: moved only {:.2} m", moved_m);
                None
            }
        }
    }

    fn fail(&mut self, error: LocationError) {
        log::warn!("location tracking failed: {}", error);
        self.cancel_watch();
        if error == LocationError::PermissionDenied {
            self.permission = PermissionStatus::Denied;
        }
        self.state = TrackingState::Error;
        self.last_error = Some(error.clone());
        self.errors.emit(&error);
    }

    fn cancel_watch(&mut self) {
        if let Some(watch) = self.watch.take() {
            log::debug!("cancelling location watch {:?}", watch.id);
            self.provider.cancel(watch.id);
        }
    }
}

impl Drop for LocationTracker {
    fn drop(&mut self) {
        self.cancel_watch();
    }
}

impl std::fmt::Debug for LocationTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationTracker")
            .field("state", &self.state)
            .field("permission", &self.permission)
            .field("watching", &self.is_watching())
            .field("current", &self.current)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::geo::Coordinate;
    use crate::sim::SimulatedLocationProvider;
    use std::sync::Mutex;

    fn reading(lat: f64, lng: f64, accuracy: f64, timestamp: u64) -> LocationReading {
        LocationReading::new(Coordinate::new(lat, lng), accuracy, timestamp)
    }

    fn tracker_with(provider: &Arc<SimulatedLocationProvider>) -> LocationTracker {
        LocationTracker::new(provider.clone())
    }

    #[tokio::test]
    async fn test_start_transitions_to_watching() {
        let provider = Arc::new(SimulatedLocationProvider::with_fix(reading(35.0, 139.0, 5.0, 0)));
        let mut tracker = tracker_with(&provider);
        assert_eq!(tracker.state(), TrackingState::Idle);
        assert_eq!(tracker.permission(), PermissionStatus::Prompt);

        let state = tracker.start(TrackerOptions::default()).await;

        assert_eq!(state, TrackingState::Watching);
        assert_eq!(tracker.permission(), PermissionStatus::Granted);
        assert_eq!(tracker.current_location().map(|r| r.lat()), Some(35.0));
        assert_eq!(provider.active_watches(), 1);
    }

    #[tokio::test]
    async fn test_denied_permission() {
        let provider = Arc::new(SimulatedLocationProvider::new());
        provider.deny();
        let mut tracker = tracker_with(&provider);

        let errors = Arc::new(Mutex::new(Vec::new()));
        let _sub = {
            let errors = errors.clone();
            tracker.on_error(move |e| errors.lock().unwrap().push(e.clone()))
        };

        let state = tracker.start(TrackerOptions::default()).await;

        assert_eq!(state, TrackingState::Error);
        assert_eq!(tracker.permission(), PermissionStatus::Denied);
        assert_eq!(tracker.last_error(), Some(&LocationError::PermissionDenied));
        assert_eq!(*errors.lock().unwrap(), vec![LocationError::PermissionDenied]);
        assert_eq!(provider.active_watches(), 0);
        assert_eq!(provider.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_request_timeout() {
        let provider = Arc::new(SimulatedLocationProvider::new());
        provider.hang();
        let mut tracker = tracker_with(&provider);

        let options = TrackerOptions {
            timeout_ms: 500,
            ..Default::default()
        };
        let state = tracker.start(options).await;

        assert_eq!(state, TrackingState::Error);
        assert_eq!(
            tracker.last_error(),
            Some(&LocationError::ProviderTimeout { timeout_ms: 500 })
        );
        // a timeout is not a permission decision
        assert_eq!(tracker.permission(), PermissionStatus::Prompt);
    }

    #[tokio::test]
    async fn test_pump_applies_filter_and_notifies() {
        let provider = Arc::new(SimulatedLocationProvider::with_fix(reading(35.0, 139.0, 5.0, 0)));
        let mut tracker = tracker_with(&provider);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let _sub = {
            let seen = seen.clone();
            tracker.subscribe(move |r| seen.lock().unwrap().push(*r))
        };
        tracker.start(TrackerOptions::default()).await;

        provider.push(reading(35.0009, 139.0, 500.0, 1_000)); // inaccurate
        provider.push(reading(35.00001, 139.0, 5.0, 2_000)); // jitter
        provider.push(reading(35.0009, 139.0, 5.0, 3_000)); // real move

        let accepted = tracker.pump();
        assert_eq!(accepted.len(), 1);

        let stats = tracker.stats();
        assert_eq!(stats.received, 4);
        assert_eq!(stats.accepted, 2);
        assert_eq!(stats.rejected_inaccurate, 1);
        assert_eq!(stats.rejected_insignificant, 1);
        assert_eq!(seen.lock().unwrap().len(), 2);
        assert!(seen.lock().unwrap().iter().all(|r| r.accuracy <= 50.0));
    }

    #[tokio::test]
    async fn test_watch_error_moves_to_error_without_retry() {
        let provider = Arc::new(SimulatedLocationProvider::with_fix(reading(35.0, 139.0, 5.0, 0)));
        let mut tracker = tracker_with(&provider);
        tracker.start(TrackerOptions::default()).await;

        provider.push_error(LocationError::ProviderUnavailable("gps lost".into()));
        provider.push(reading(35.01, 139.0, 5.0, 5_000));

        let accepted = tracker.pump();
        assert!(accepted.is_empty());
        assert_eq!(tracker.state(), TrackingState::Error);
        assert_eq!(provider.active_watches(), 0);
        assert_eq!(provider.request_count(), 1);

        // still in error until start is called again
        assert!(tracker.pump().is_empty());
        assert_eq!(tracker.state(), TrackingState::Error);
    }

    #[tokio::test]
    async fn test_provider_closing_watch_is_reported() {
        let provider = Arc::new(SimulatedLocationProvider::with_fix(reading(35.0, 139.0, 5.0, 0)));
        let mut tracker = tracker_with(&provider);
        tracker.start(TrackerOptions::default()).await;

        provider.close_watches();
        tracker.pump();

        assert_eq!(tracker.state(), TrackingState::Error);
        assert!(matches!(
            tracker.last_error(),
            Some(LocationError::ProviderUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let provider = Arc::new(SimulatedLocationProvider::with_fix(reading(35.0, 139.0, 5.0, 0)));
        let mut tracker = tracker_with(&provider);

        tracker.stop();
        assert_eq!(tracker.state(), TrackingState::Idle);

        tracker.start(TrackerOptions::default()).await;
        tracker.stop();
        tracker.stop();

        assert_eq!(tracker.state(), TrackingState::Idle);
        assert_eq!(provider.active_watches(), 0);
        assert_eq!(provider.cancel_count(), 1);
    }

    #[tokio::test]
    async fn test_restart_keeps_single_subscription() {
        let provider = Arc::new(SimulatedLocationProvider::with_fix(reading(35.0, 139.0, 5.0, 0)));
        let mut tracker = tracker_with(&provider);

        let calls = Arc::new(Mutex::new(0usize));
        let _sub = {
            let calls = calls.clone();
            tracker.subscribe(move |_| *calls.lock().unwrap() += 1)
        };

        tracker.start(TrackerOptions::default()).await;
        tracker.stop();
        tracker.start(TrackerOptions::default()).await;
        // restarting while watching also replaces the watch
        tracker.start(TrackerOptions::default()).await;
        assert_eq!(provider.active_watches(), 1);

        *calls.lock().unwrap() = 0;
        provider.push(reading(35.01, 139.0, 5.0, 10_000));
        tracker.pump();
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_request_location_recovers_from_error() {
        let provider = Arc::new(SimulatedLocationProvider::new());
        provider.deny();
        let mut tracker = tracker_with(&provider);
        tracker.start(TrackerOptions::default()).await;
        assert_eq!(tracker.state(), TrackingState::Error);

        provider.set_fix(reading(35.0, 139.0, 5.0, 0));
        let state = tracker.request_location().await;

        assert_eq!(state, TrackingState::Watching);
        assert_eq!(tracker.permission(), PermissionStatus::Granted);
        assert!(tracker.last_error().is_none());
    }

    #[tokio::test]
    async fn test_drop_cancels_watch() {
        let provider = Arc::new(SimulatedLocationProvider::with_fix(reading(35.0, 139.0, 5.0, 0)));
        {
            let mut tracker = tracker_with(&provider);
            tracker.start(TrackerOptions::default()).await;
            assert_eq!(provider.active_watches(), 1);
        }
        assert_eq!(provider.active_watches(), 0);
    }
}
