use std::time::{Duration, Instant};

/// Caps how often the render loop does real work.
///
/// The loop is woken on every display frame; a frame is due only once
/// `1000 / target_fps` ms have passed since the last *rendered* frame.
#[derive(Debug, Clone)]
pub struct FramePacer {
    target_fps: u32,
    min_interval: Duration,
    last_rendered: Option<Instant>,
}

impl FramePacer {
    pub fn new(target_fps: u32) -> Self {
        let target_fps = target_fps.max(1);
        Self {
            target_fps,
            min_interval: Duration::from_millis(1000 / target_fps as u64),
            last_rendered: None,
        }
    }

    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// The first frame is always due
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_rendered {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
        }
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.last_rendered = Some(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intervals() {
        assert_eq!(FramePacer::new(30).min_interval(), Duration::from_millis(33));
        assert_eq!(FramePacer::new(60).min_interval(), Duration::from_millis(16));
        assert_eq!(FramePacer::new(0).target_fps(), 1);
    }

    #[test]
    fn test_thirty_fps_on_sixty_hz_display() {
        let mut pacer = FramePacer::new(30);
        let start = Instant::now();
        let vsync = Duration::from_micros(16_667);

        let mut rendered = 0;
        for i in 0..60u32 {
            let now = start + vsync * i;
            if pacer.is_due(now) {
                pacer.mark_rendered(now);
                rendered += 1;
            }
        }
        // every other display frame over one second
        assert_eq!(rendered, 30);
    }

    #[test]
    fn test_unrendered_frame_does_not_reset_interval() {
        let mut pacer = FramePacer::new(30);
        let start = Instant::now();
        pacer.mark_rendered(start);

        assert!(!pacer.is_due(start + Duration::from_millis(20)));
        assert!(pacer.is_due(start + Duration::from_millis(40)));
        // still due until something is actually rendered
        assert!(pacer.is_due(start + Duration::from_millis(45)));
    }
}
