//! In-flight route request tracking.
//!
//! Every route request gets a [`RouteTicket`]. Results come back with their
//! ticket and are only applied when the ticket is still current:
//!
//! - its generation matches (no rebind or cleanup happened in between), and
//! - its sequence is the latest issued for that purpose.
//!
//! Anything else is a stale result and is dropped.

use std::collections::HashMap;

use crate::directions::RoutePurpose;

/// Identifies one route request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteTicket {
    pub generation: u64,
    pub purpose: RoutePurpose,
    pub seq: u64,
}

/// At most one live request per purpose.
#[derive(Debug, Default)]
pub struct RequestTracker {
    generation: u64,
    next_seq: u64,
    in_flight: HashMap<RoutePurpose, u64>,
}

impl RequestTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a ticket unless a request for `purpose` is already in flight.
    pub fn issue(&mut self, purpose: RoutePurpose) -> Option<RouteTicket> {
        if self.in_flight.contains_key(&purpose) {
            return None;
        }
        Some(self.issue_replacing(purpose))
    }

    /// Issue a ticket, superseding any request in flight for `purpose`.
    pub fn issue_replacing(&mut self, purpose: RoutePurpose) -> RouteTicket {
        self.next_seq += 1;
        self.in_flight.insert(purpose, self.next_seq);
        RouteTicket {
            generation: self.generation,
            purpose,
            seq: self.next_seq,
        }
    }

    /// Settle a result. Returns whether it should be applied.
    pub fn complete(&mut self, ticket: RouteTicket) -> bool {
        if ticket.generation != self.generation {
            return false;
        }
        match self.in_flight.get(&ticket.purpose) {
            Some(&seq) if seq == ticket.seq => {
                self.in_flight.remove(&ticket.purpose);
                true
            }
            _ => false,
        }
    }

    pub fn is_in_flight(&self, purpose: RoutePurpose) -> bool {
        self.in_flight.contains_key(&purpose)
    }

    /// Forget every request in flight and start a new generation.
    pub fn invalidate_all(&mut self) {
        self.generation += 1;
        self.in_flight.clear();
    }

    /// Current generation; bumped by [`RequestTracker::invalidate_all`].
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_in_flight_per_purpose() {
        let mut tracker = RequestTracker::new();
        let ticket = tracker.issue(RoutePurpose::Navigation).unwrap();
        assert!(tracker.issue(RoutePurpose::Navigation).is_none());
        assert!(tracker.issue(RoutePurpose::PickupPreview).is_some());

        assert!(tracker.complete(ticket));
        assert!(!tracker.is_in_flight(RoutePurpose::Navigation));
        assert!(tracker.issue(RoutePurpose::Navigation).is_some());
    }

    #[test]
    fn test_superseded_result_dropped() {
        let mut tracker = RequestTracker::new();
        let old = tracker.issue_replacing(RoutePurpose::Navigation);
        let new = tracker.issue_replacing(RoutePurpose::Navigation);

        assert!(!tracker.complete(old));
        assert!(tracker.is_in_flight(RoutePurpose::Navigation));
        assert!(tracker.complete(new));
    }

    #[test]
    fn test_invalidate_drops_previous_generation() {
        let mut tracker = RequestTracker::new();
        let ticket = tracker.issue(RoutePurpose::DestinationPreview).unwrap();
        tracker.invalidate_all();

        assert_eq!(tracker.generation(), 1);
        assert!(!tracker.is_in_flight(RoutePurpose::DestinationPreview));
        assert!(!tracker.complete(ticket));

        let fresh = tracker.issue(RoutePurpose::DestinationPreview).unwrap();
        assert_eq!(fresh.generation, 1);
        assert!(tracker.complete(fresh));
    }

    #[test]
    fn test_completing_twice() {
        let mut tracker = RequestTracker::new();
        let ticket = tracker.issue(RoutePurpose::PickupPreview).unwrap();
        assert!(tracker.complete(ticket));
        assert!(!tracker.complete(ticket));
    }
}
