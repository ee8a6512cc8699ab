use std::collections::VecDeque;

use crate::core::config::TrackerOptions;
use crate::core::geo::LocationReading;
use crate::core::geomath;

/// Outcome of offering one raw reading to the filter
#[derive(Debug, Clone, PartialEq)]
pub enum FilterVerdict {
    /// Smoothed reading that passed every gate
    Accepted(LocationReading),
    /// Accuracy radius above the configured maximum
    Inaccurate { accuracy: f64 },
    /// Smoothed position too close to the last accepted one
    Insignificant { moved_m: f64 },
}

impl FilterVerdict {
    pub fn accepted(&self) -> Option<&LocationReading> {
        match self {
            Self::Accepted(reading) => Some(reading),
            _ => None,
        }
    }
}

/// Accuracy gate, bounded smoothing history and significance gate.
///
/// Each call to [`offer`](ReadingFilter::offer) runs the full pipeline for a
/// single reading; readings are never partially interleaved.
#[derive(Debug, Clone)]
pub struct ReadingFilter {
    history: VecDeque<LocationReading>,
    capacity: usize,
    window: usize,
    max_accuracy_m: f64,
    min_distance_m: f64,
    last_accepted: Option<LocationReading>,
}

impl ReadingFilter {
    pub fn new(options: &TrackerOptions) -> Self {
        let capacity = options.history_capacity.max(options.smoothing_window).max(1);
        Self {
            history: VecDeque::with_capacity(capacity),
            capacity,
            window: options.smoothing_window,
            max_accuracy_m: options.max_accuracy_m,
            min_distance_m: options.min_distance_threshold_m,
            last_accepted: None,
        }
    }

    pub fn offer(&mut self, reading: LocationReading) -> FilterVerdict {
        if !geomath::is_accurate(&reading, self.max_accuracy_m) {
            return FilterVerdict::Inaccurate {
                accuracy: reading.accuracy,
            };
        }

        self.history.push_back(reading);
        while self.history.len() > self.capacity {
            self.history.pop_front();
        }

        let smoothed =
            geomath::smooth(self.history.make_contiguous(), self.window).unwrap_or(reading);

        if let Some(last) = &self.last_accepted {
            if !geomath::has_significant_movement(
                &last.coordinate,
                &smoothed.coordinate,
                self.min_distance_m,
            ) {
                return FilterVerdict::Insignificant {
                    moved_m: geomath::distance(&last.coordinate, &smoothed.coordinate),
                };
            }
        }

        let accepted = derive_motion(self.last_accepted.as_ref(), smoothed);
        self.last_accepted = Some(accepted);
        FilterVerdict::Accepted(accepted)
    }

    pub fn last_accepted(&self) -> Option<&LocationReading> {
        self.last_accepted.as_ref()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.last_accepted = None;
    }
}

/// Fill in heading and speed the provider did not report
fn derive_motion(previous: Option<&LocationReading>, mut reading: LocationReading) -> LocationReading {
    let Some(previous) = previous else {
        return reading;
    };

    if reading.heading.is_none()
        && geomath::distance(&previous.coordinate, &reading.coordinate) > 0.0
    {
        reading.heading = Some(geomath::bearing(&previous.coordinate, &reading.coordinate));
    }
    if reading.speed.is_none() {
        reading.speed = Some(geomath::speed(previous, &reading));
    }
    reading
}
