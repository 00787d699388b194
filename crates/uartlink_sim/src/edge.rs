//! Rising-edge detection on a sampled boolean signal.

/// One bit of history used to report low-to-high transitions.
///
/// Call [`observe`](EdgeDetector::observe) exactly once per tick with the
/// signal's current level. An edge is reported on the tick the signal is first
/// seen high after having been low on the previous tick, so the detector lags
/// the physical transition by one tick. A level held high is reported once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EdgeDetector {
    previous: bool,
}

impl EdgeDetector {
    /// A detector whose recorded history is low.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `current` and reports whether it is a rising edge.
    pub fn observe(&mut self, current: bool) -> bool {
        let rising = !self.previous && current;
        self.previous = current;
        rising
    }

    /// The level recorded on the last call.
    pub fn previous(&self) -> bool {
        self.previous
    }
}
