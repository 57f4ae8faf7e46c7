// ── Per-grill reachability state machine ──
//
// Each polling task owns one tracker: its state-machine value and
// consecutive-failure counter live here, passed by ownership to the
// task rather than stored in ambient globals.

use crate::model::Reachability;

/// Drives the `Unpolled → Online → Degraded → Offline` transitions from
/// a stream of poll outcomes.
#[derive(Debug)]
pub(crate) struct ReachabilityTracker {
    current: Reachability,
    failures: u32,
    threshold: u32,
}

impl ReachabilityTracker {
    /// `threshold` consecutive failures force the Offline transition.
    /// A threshold of zero is treated as one.
    pub(crate) fn new(threshold: u32) -> Self {
        Self {
            current: Reachability::Unpolled,
            failures: 0,
            threshold: threshold.max(1),
        }
    }

    /// A successful poll: counters reset, the grill is online.
    pub(crate) fn on_success(&mut self) -> Reachability {
        self.failures = 0;
        self.current = Reachability::Online;
        self.current
    }

    /// A transient poll failure.
    ///
    /// Online degrades on the first failure; Degraded (and Unpolled,
    /// which has no snapshot to serve stale) hold until the threshold
    /// forces Offline.
    pub(crate) fn on_failure(&mut self) -> Reachability {
        self.failures = self.failures.saturating_add(1);
        self.current = if self.failures >= self.threshold {
            Reachability::Offline
        } else {
            match self.current {
                Reachability::Online => Reachability::Degraded,
                other => other,
            }
        };
        self.current
    }

    pub(crate) fn failures(&self) -> u32 {
        self.failures
    }

    #[cfg(test)]
    pub(crate) fn current(&self) -> Reachability {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_success_brings_online() {
        let mut t = ReachabilityTracker::new(3);
        assert_eq!(t.current(), Reachability::Unpolled);
        assert_eq!(t.on_success(), Reachability::Online);
    }

    #[test]
    fn single_failure_degrades_an_online_grill() {
        let mut t = ReachabilityTracker::new(3);
        t.on_success();
        assert_eq!(t.on_failure(), Reachability::Degraded);
        assert_eq!(t.failures(), 1);
    }

    #[test]
    fn threshold_failures_force_offline() {
        let mut t = ReachabilityTracker::new(3);
        t.on_success();
        assert_eq!(t.on_failure(), Reachability::Degraded);
        assert_eq!(t.on_failure(), Reachability::Degraded);
        assert_eq!(t.on_failure(), Reachability::Offline);
    }

    #[test]
    fn success_recovers_from_degraded_and_resets_counter() {
        let mut t = ReachabilityTracker::new(3);
        t.on_success();
        t.on_failure();
        t.on_failure();
        assert_eq!(t.on_success(), Reachability::Online);
        assert_eq!(t.failures(), 0);
        // The counter really did reset: two more failures stay Degraded.
        t.on_failure();
        assert_eq!(t.on_failure(), Reachability::Degraded);
    }

    #[test]
    fn success_recovers_from_offline() {
        let mut t = ReachabilityTracker::new(2);
        t.on_success();
        t.on_failure();
        assert_eq!(t.on_failure(), Reachability::Offline);
        assert_eq!(t.on_success(), Reachability::Online);
    }

    #[test]
    fn unpolled_holds_until_threshold() {
        let mut t = ReachabilityTracker::new(3);
        assert_eq!(t.on_failure(), Reachability::Unpolled);
        assert_eq!(t.on_failure(), Reachability::Unpolled);
        assert_eq!(t.on_failure(), Reachability::Offline);
    }

    #[test]
    fn offline_stays_offline_on_further_failures() {
        let mut t = ReachabilityTracker::new(1);
        t.on_success();
        assert_eq!(t.on_failure(), Reachability::Offline);
        assert_eq!(t.on_failure(), Reachability::Offline);
    }

    #[test]
    fn zero_threshold_behaves_as_one() {
        let mut t = ReachabilityTracker::new(0);
        t.on_success();
        assert_eq!(t.on_failure(), Reachability::Offline);
    }
}
