use std::collections::VecDeque;

use smallvec::SmallVec;

use crate::Concurrency;

/// Admission bookkeeping of a limiter
///
/// Every transition is a plain `&mut self` call, so the owner decides how they are serialized.
/// Tickets handed out by [`State::admit`] are already counted as active.
#[derive(Debug)]
pub(crate) struct State<T> {
    concurrency: Concurrency,
    active: usize,
    queue: VecDeque<T>,
}

/// Tickets admitted in one step
pub(crate) type Admitted<T> = SmallVec<[T; 4]>;

impl<T> State<T> {
    pub(crate) fn new(concurrency: Concurrency) -> Self {
        Self {
            concurrency,
            active: 0,
            queue: VecDeque::new(),
        }
    }

    pub(crate) fn enqueue(&mut self, ticket: T) {
        self.queue.push_back(ticket);
    }

    /// Moves tickets from the queue head while the ceiling allows it
    pub(crate) fn admit(&mut self) -> Admitted<T> {
        let mut admitted = Admitted::new();

        while self.concurrency.allows(self.active) {
            match self.queue.pop_front() {
                Some(ticket) => {
                    self.active += 1;
                    admitted.push(ticket);
                }
                None => break,
            }
        }

        admitted
    }

    pub(crate) fn finish(&mut self) {
        debug_assert!(self.active > 0, "finished more tasks than were admitted");
        self.active = self.active.saturating_sub(1);
    }

    /// Returns slots of admitted tickets that nobody was waiting for
    pub(crate) fn refund(&mut self, slots: usize) {
        self.active = self.active.saturating_sub(slots);
    }

    pub(crate) fn set_concurrency(&mut self, concurrency: Concurrency) -> Concurrency {
        std::mem::replace(&mut self.concurrency, concurrency)
    }

    pub(crate) fn clear(&mut self) -> VecDeque<T> {
        std::mem::take(&mut self.queue)
    }

    pub(crate) fn concurrency(&self) -> Concurrency {
        self.concurrency
    }

    pub(crate) fn active(&self) -> usize {
        self.active
    }

    pub(crate) fn pending(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.active == 0 && self.queue.is_empty()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use itertools::Itertools;

    use super::*;

    fn state_with(concurrency: usize, tickets: usize) -> State<usize> {
        let mut state = State::new(Concurrency::new(concurrency).unwrap());
        (0..tickets).for_each(|ticket| state.enqueue(ticket));
        state
    }

    #[test]
    fn admits_tickets_up_to_ceiling_in_queue_order() {
        let mut state = state_with(3, 5);

        assert_eq!(state.admit().into_iter().collect_vec(), vec![0, 1, 2]);
        assert_eq!((state.active(), state.pending()), (3, 2));
    }

    #[test]
    fn admits_nothing_while_ceiling_is_reached() {
        let mut state = state_with(2, 4);
        state.admit();

        assert!(state.admit().is_empty());
        assert_eq!(state.active(), 2);
    }

    #[test]
    fn admits_next_ticket_after_finish() {
        let mut state = state_with(2, 4);
        state.admit();

        state.finish();

        assert_eq!(state.admit().into_iter().collect_vec(), vec![2]);
        assert_eq!((state.active(), state.pending()), (2, 1));
    }

    #[test]
    fn admits_whole_queue_when_unbounded() {
        let mut state = State::new(Concurrency::Unbounded);
        (0..100).for_each(|ticket| state.enqueue(ticket));

        assert_eq!(state.admit().len(), 100);
        assert!(state.queue.is_empty());
    }

    #[test]
    fn raising_ceiling_makes_room_for_more_tickets() {
        let mut state = state_with(2, 10);
        state.admit();

        let previous = state.set_concurrency(Concurrency::new(4).unwrap());

        assert_eq!(previous, Concurrency::new(2).unwrap());
        assert_eq!(state.admit().into_iter().collect_vec(), vec![2, 3]);
        assert_eq!((state.active(), state.pending()), (4, 6));
    }

    #[test]
    fn lowering_ceiling_keeps_running_tasks_and_blocks_admission() {
        let mut state = state_with(4, 8);
        state.admit();

        state.set_concurrency(Concurrency::new(2).unwrap());
        state.finish();

        assert!(state.admit().is_empty());
        assert_eq!(state.active(), 3);

        state.finish();
        state.finish();

        assert_eq!(state.admit().into_iter().collect_vec(), vec![4]);
        assert_eq!(state.active(), 2);
    }

    #[test]
    fn clearing_returns_discarded_tickets() {
        let mut state = state_with(1, 4);
        state.admit();

        assert_eq!(state.clear().into_iter().collect_vec(), vec![1, 2, 3]);
        assert_eq!((state.active(), state.pending()), (1, 0));
    }

    #[test]
    fn refunded_slots_are_available_again() {
        let mut state = state_with(2, 4);
        state.admit();

        state.refund(2);

        assert_eq!(state.admit().into_iter().collect_vec(), vec![2, 3]);
    }

    #[test]
    fn reports_idle_only_without_active_and_pending_tickets() {
        let mut state = state_with(1, 1);
        assert!(!state.is_idle());

        state.admit();
        assert!(!state.is_idle());

        state.finish();
        assert!(state.is_idle());
    }
}
