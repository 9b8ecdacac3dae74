use std::sync::atomic::{AtomicU64, Ordering};

/// Sequence number handed out when a view request starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

impl Ticket {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Last-request-wins ordering for responses that arrive out of order.
///
/// The list view issues a ticket per fetch and only applies a response whose
/// ticket is still the latest one issued. Responses for filters the user has
/// already moved past are dropped on arrival.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    latest: AtomicU64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Drop every outstanding ticket, e.g. when the view is torn down
    pub fn cancel_all(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_latest_ticket_is_current() {
        let seq = RequestSequencer::new();
        let first = seq.issue();
        assert!(seq.is_current(first));

        let second = seq.issue();
        assert!(!seq.is_current(first));
        assert!(seq.is_current(second));
        assert!(second > first);
    }

    #[test]
    fn test_cancel_all_invalidates_outstanding() {
        let seq = RequestSequencer::new();
        let ticket = seq.issue();
        seq.cancel_all();
        assert!(!seq.is_current(ticket));
        assert!(seq.is_current(seq.issue()));
    }
}
