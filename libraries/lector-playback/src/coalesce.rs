//! At-most-one-in-flight request tracking

use lector_core::UnitId;
use std::collections::HashSet;
use tracing::debug;

/// Proof that a request for a unit is in flight
///
/// Hand it back to [`RequestCoalescer::finish`] when the request completes.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a ticket that is never finished blocks its unit forever"]
pub struct Ticket {
    unit_id: UnitId,
}

impl Ticket {
    pub fn unit_id(&self) -> UnitId {
        self.unit_id
    }
}

/// Drops duplicate requests for a unit while one is outstanding
#[derive(Debug, Default)]
pub struct RequestCoalescer {
    in_flight: HashSet<UnitId>,
}

impl RequestCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a request, or `None` if one for `unit_id` is already running
    pub fn try_begin(&mut self, unit_id: UnitId) -> Option<Ticket> {
        if self.in_flight.insert(unit_id) {
            Some(Ticket { unit_id })
        } else {
            debug!(%unit_id, "Dropping duplicate request");
            None
        }
    }

    pub fn finish(&mut self, ticket: Ticket) {
        self.in_flight.remove(&ticket.unit_id);
    }

    pub fn is_in_flight(&self, unit_id: UnitId) -> bool {
        self.in_flight.contains(&unit_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_is_dropped_until_finished() {
        let mut coalescer = RequestCoalescer::new();
        let unit = UnitId::generate();

        let ticket = coalescer.try_begin(unit).unwrap();
        assert!(coalescer.try_begin(unit).is_none());
        assert!(coalescer.is_in_flight(unit));

        coalescer.finish(ticket);
        assert!(!coalescer.is_in_flight(unit));
        assert!(coalescer.try_begin(unit).is_some());
    }

    #[test]
    fn test_units_are_independent() {
        let mut coalescer = RequestCoalescer::new();
        let _a = coalescer.try_begin(UnitId::generate()).unwrap();
        assert!(coalescer.try_begin(UnitId::generate()).is_some());
    }
}
