//! Periodic tick scheduling.
//!
//! The scheduler tracks deadlines for two independent cadences and hands
//! out whichever is due. It never spawns anything: the engine task owns it,
//! sleeps until [`Scheduler::next_deadline`], then calls
//! [`Scheduler::take_due`]. Ticks therefore run on the same task as every
//! other mutation and can never overlap.
//!
//! # Precedence
//!
//! When both ticks are due at once, the navigation tick wins and the route
//! refresh is skipped until its next cadence. That next deadline is shifted
//! by half a navigation interval so the two cadences stop coinciding;
//! otherwise a refresh interval that is a multiple of the navigation
//! interval would be skipped on every cycle. Deadlines missed while the
//! task was busy are not replayed; the next one is scheduled one interval
//! from now.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Default route-refresh cadence.
pub const DEFAULT_ROUTE_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Default navigation-tick cadence.
pub const DEFAULT_NAVIGATION_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Kind of periodic tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TickKind {
    /// Recompute preview routes, or refresh the navigation route.
    RouteRefresh,
    /// Reroute detection and maneuver advancement.
    Navigation,
}

impl std::fmt::Display for TickKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TickKind::RouteRefresh => f.write_str("route_refresh"),
            TickKind::Navigation => f.write_str("navigation"),
        }
    }
}

/// Deadline tracker for the two cadences.
#[derive(Debug)]
pub struct Scheduler {
    refresh_interval: Duration,
    navigation_interval: Duration,
    refresh_deadline: Option<Instant>,
    navigation_deadline: Option<Instant>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(
            DEFAULT_ROUTE_REFRESH_INTERVAL,
            DEFAULT_NAVIGATION_TICK_INTERVAL,
        )
    }
}

impl Scheduler {
    pub fn new(refresh_interval: Duration, navigation_interval: Duration) -> Self {
        Self {
            refresh_interval,
            navigation_interval,
            refresh_deadline: None,
            navigation_deadline: None,
        }
    }

    pub fn interval(&self, kind: TickKind) -> Duration {
        match kind {
            TickKind::RouteRefresh => self.refresh_interval,
            TickKind::Navigation => self.navigation_interval,
        }
    }

    fn slot(&mut self, kind: TickKind) -> &mut Option<Instant> {
        match kind {
            TickKind::RouteRefresh => &mut self.refresh_deadline,
            TickKind::Navigation => &mut self.navigation_deadline,
        }
    }

    /// Start a cadence; the first tick is due one interval after `now`.
    ///
    /// Starting a running cadence leaves its deadline untouched. Returns
    /// whether the cadence was newly started.
    pub fn start(&mut self, kind: TickKind, now: Instant) -> bool {
        let interval = self.interval(kind);
        let slot = self.slot(kind);
        if slot.is_some() {
            return false;
        }
        *slot = Some(now + interval);
        tracing::debug!(tick = %kind, interval_ms = interval.as_millis() as u64, "Timer started");
        true
    }

    /// Stop a cadence. Returns whether it was running.
    pub fn cancel(&mut self, kind: TickKind) -> bool {
        let was_running = self.slot(kind).take().is_some();
        if was_running {
            tracing::debug!(tick = %kind, "Timer cancelled");
        }
        was_running
    }

    /// Stop both cadences.
    pub fn cancel_all(&mut self) {
        self.cancel(TickKind::RouteRefresh);
        self.cancel(TickKind::Navigation);
    }

    pub fn is_active(&self, kind: TickKind) -> bool {
        match kind {
            TickKind::RouteRefresh => self.refresh_deadline.is_some(),
            TickKind::Navigation => self.navigation_deadline.is_some(),
        }
    }

    /// Running cadences, navigation first.
    pub fn active(&self) -> Vec<TickKind> {
        [TickKind::Navigation, TickKind::RouteRefresh]
            .into_iter()
            .filter(|k| self.is_active(*k))
            .collect()
    }

    /// Earliest pending deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.navigation_deadline, self.refresh_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Take the tick due at `now`, if any, and schedule its successor.
    pub fn take_due(&mut self, now: Instant) -> Option<TickKind> {
        let navigation_due = self.navigation_deadline.is_some_and(|d| d <= now);
        let refresh_due = self.refresh_deadline.is_some_and(|d| d <= now);

        if navigation_due {
            self.reschedule(TickKind::Navigation, now);
            if refresh_due {
                let next = now + self.refresh_interval + self.navigation_interval / 2;
                self.refresh_deadline = Some(next);
                tracing::debug!("Route refresh skipped, navigation tick takes precedence");
            }
            return Some(TickKind::Navigation);
        }

        if refresh_due {
            self.reschedule(TickKind::RouteRefresh, now);
            return Some(TickKind::RouteRefresh);
        }

        None
    }

    fn reschedule(&mut self, kind: TickKind, now: Instant) {
        let interval = self.interval(kind);
        let slot = self.slot(kind);
        if let Some(deadline) = *slot {
            let next = deadline + interval;
            *slot = Some(if next <= now { now + interval } else { next });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheduler() -> Scheduler {
        Scheduler::new(Duration::from_secs(30), Duration::from_secs(1))
    }

    #[test]
    fn test_nothing_due_before_first_interval() {
        let now = Instant::now();
        let mut s = scheduler();
        s.start(TickKind::Navigation, now);

        assert_eq!(s.take_due(now), None);
        assert_eq!(s.next_deadline(), Some(now + Duration::from_secs(1)));
        assert_eq!(
            s.take_due(now + Duration::from_secs(1)),
            Some(TickKind::Navigation)
        );
    }

    #[test]
    fn test_start_is_idempotent() {
        let now = Instant::now();
        let mut s = scheduler();
        assert!(s.start(TickKind::RouteRefresh, now));
        assert!(!s.start(TickKind::RouteRefresh, now + Duration::from_secs(10)));
        assert_eq!(s.next_deadline(), Some(now + Duration::from_secs(30)));
    }

    #[test]
    fn test_navigation_takes_precedence() {
        let now = Instant::now();
        let mut s = Scheduler::new(Duration::from_secs(2), Duration::from_secs(2));
        s.start(TickKind::RouteRefresh, now);
        s.start(TickKind::Navigation, now);

        let t = now + Duration::from_secs(2);
        assert_eq!(s.take_due(t), Some(TickKind::Navigation));
        // Refresh skipped for this cycle, not deferred
        assert_eq!(s.take_due(t), None);
        assert_eq!(s.next_deadline(), Some(now + Duration::from_secs(4)));

        // Next refresh lands between navigation ticks
        assert_eq!(
            s.take_due(now + Duration::from_secs(4)),
            Some(TickKind::Navigation)
        );
        assert_eq!(s.next_deadline(), Some(now + Duration::from_secs(5)));
        assert_eq!(
            s.take_due(now + Duration::from_secs(5)),
            Some(TickKind::RouteRefresh)
        );
    }

    #[test]
    fn test_refresh_not_starved_by_aligned_navigation() {
        let now = Instant::now();
        let mut s = scheduler();
        s.start(TickKind::RouteRefresh, now);
        s.start(TickKind::Navigation, now);

        let mut refreshes = 0;
        for ms in (500..=120_000).step_by(500) {
            if s.take_due(now + Duration::from_millis(ms)) == Some(TickKind::RouteRefresh) {
                refreshes += 1;
            }
        }

        // Skipped at 30 s, then runs at 60.5 s and 90.5 s
        assert_eq!(refreshes, 2);
    }

    #[test]
    fn test_missed_ticks_not_replayed() {
        let now = Instant::now();
        let mut s = scheduler();
        s.start(TickKind::Navigation, now);

        let late = now + Duration::from_millis(10_500);
        assert_eq!(s.take_due(late), Some(TickKind::Navigation));
        assert_eq!(s.take_due(late), None);
        assert_eq!(s.next_deadline(), Some(late + Duration::from_secs(1)));
    }

    #[test]
    fn test_cadence_keeps_phase() {
        let now = Instant::now();
        let mut s = scheduler();
        s.start(TickKind::Navigation, now);

        s.take_due(now + Duration::from_millis(1_200));
        assert_eq!(s.next_deadline(), Some(now + Duration::from_secs(2)));
    }

    #[test]
    fn test_cancel() {
        let now = Instant::now();
        let mut s = scheduler();
        s.start(TickKind::Navigation, now);
        s.start(TickKind::RouteRefresh, now);
        assert_eq!(
            s.active(),
            vec![TickKind::Navigation, TickKind::RouteRefresh]
        );

        assert!(s.cancel(TickKind::Navigation));
        assert!(!s.cancel(TickKind::Navigation));
        assert_eq!(s.take_due(now + Duration::from_secs(5)), None);

        s.cancel_all();
        assert!(s.active().is_empty());
        assert_eq!(s.next_deadline(), None);
        assert_eq!(s.take_due(now + Duration::from_secs(60)), None);
    }
}
