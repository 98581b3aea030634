//! Load coalescing.
//!
//! At most one `GET /cart` is in flight. Callers join it instead of queueing
//! a second one, unless it started before the mutation they need reflected,
//! in which case they wait it out and start a fresh one. A load that is
//! overtaken by a mutation is restamped and fetches again.

use std::sync::{Mutex, PoisonError};

use tokio::sync::watch;

use lieferspatz::{errors::CartError, state::CartState};

/// Shared outcome of one load.
pub(crate) type LoadResult = Result<CartState, CartError>;

type Outcome = watch::Receiver<Option<LoadResult>>;

#[derive(Debug, Default)]
struct Slots {
    next_seq: u64,
    applied_seq: u64,
    in_flight: Option<InFlight>,
}

#[derive(Debug)]
struct InFlight {
    seq: u64,
    epoch: u64,
    outcome: Outcome,
}

/// How a caller takes part in a load.
#[derive(Debug)]
pub(crate) enum Join {
    /// Nothing suitable is in flight; the caller must run this load.
    Leader {
        /// Sequence number of the new load
        seq: u64,

        /// Mutation epoch the load started in
        epoch: u64,

        /// Where the leader publishes the result
        publish: watch::Sender<Option<LoadResult>>,

        /// Where every caller reads it
        outcome: Outcome,
    },

    /// A load that reflects the caller's mutations is in flight.
    Follower(Outcome),

    /// A load is in flight but started too early; wait, then try again.
    Stale(Outcome),
}

/// Bookkeeping for the in-flight load.
#[derive(Debug, Default)]
pub(crate) struct LoadRegistry {
    slots: Mutex<Slots>,
}

impl LoadRegistry {
    /// Join the in-flight load if it started at or after `min_epoch`,
    /// otherwise register a new one stamped with `current_epoch`.
    pub(crate) fn join(&self, min_epoch: u64, current_epoch: u64) -> Join {
        let mut slots = self.lock();

        match &slots.in_flight {
            Some(in_flight) if in_flight.epoch >= min_epoch => {
                Join::Follower(in_flight.outcome.clone())
            }
            Some(in_flight) => Join::Stale(in_flight.outcome.clone()),
            None => {
                slots.next_seq += 1;

                let seq = slots.next_seq;
                let (publish, outcome) = watch::channel(None);

                slots.in_flight = Some(InFlight {
                    seq,
                    epoch: current_epoch,
                    outcome: outcome.clone(),
                });

                Join::Leader {
                    seq,
                    epoch: current_epoch,
                    publish,
                    outcome,
                }
            }
        }
    }

    /// Retire a load. Returns whether its result may be applied, which is
    /// only the case when no newer load has been applied already.
    pub(crate) fn finish(&self, seq: u64) -> bool {
        let mut slots = self.lock();

        if slots
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.seq == seq)
        {
            slots.in_flight = None;
        }

        if seq > slots.applied_seq {
            slots.applied_seq = seq;
            true
        } else {
            false
        }
    }

    /// Move the in-flight load to a later epoch before it fetches again.
    pub(crate) fn restamp(&self, seq: u64, epoch: u64) {
        let mut slots = self.lock();

        if let Some(in_flight) = slots
            .in_flight
            .as_mut()
            .filter(|in_flight| in_flight.seq == seq)
        {
            in_flight.epoch = epoch;
        }
    }

    /// Whether a load is outstanding.
    pub(crate) fn is_loading(&self) -> bool {
        self.lock().in_flight.is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Wait for a load's result.
pub(crate) async fn outcome(mut outcome: Outcome) -> LoadResult {
    match outcome.wait_for(Option::is_some).await {
        Ok(result) => result.clone().unwrap_or_else(|| Err(interrupted())),
        Err(_closed) => Err(interrupted()),
    }
}

fn interrupted() -> CartError {
    CartError::Network("cart load interrupted".to_string())
}
