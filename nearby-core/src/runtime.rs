//! Single consumer that owns the [`StateStore`].
//!
//! Async completions never touch the store directly. They post a
//! [`StoreAction`] into one unbounded channel; a dedicated task applies the
//! actions one by one, so listeners observe mutations in channel order.
//! Results tagged with an epoch other than the current one are dropped, and
//! so are search results from any search but the latest.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::model::{Place, PointOfInterest, PointOfInterestDetail, WeatherSnapshot};
use crate::store::{Epoch, Generation, StateSnapshot, StateStore};

#[derive(Debug, Error)]
#[error("State store runtime has stopped")]
pub struct StoreClosed;

/// Messages the consumer task understands.
///
/// `*Did*` variants carry the result of a network call; the others are
/// requests that reply through a oneshot channel.
#[derive(Debug)]
pub enum StoreAction {
    SearchBegin {
        reply: oneshot::Sender<Generation>,
    },
    CandidatesDidLoad {
        generation: Generation,
        places: Vec<Place>,
    },
    SelectionBegin {
        reply: oneshot::Sender<Epoch>,
    },
    WeatherDidLoad {
        epoch: Epoch,
        weather: WeatherSnapshot,
    },
    PoisDidLoad {
        epoch: Epoch,
        pois: Vec<PointOfInterest>,
    },
    DetailClaim {
        xid: String,
        reply: oneshot::Sender<Option<(Epoch, PointOfInterestDetail)>>,
    },
    DetailDidLoad {
        epoch: Epoch,
        xid: String,
        description: Option<String>,
    },
    Snapshot {
        reply: oneshot::Sender<StateSnapshot>,
    },
}

impl StoreAction {
    pub fn name(&self) -> &'static str {
        match self {
            StoreAction::SearchBegin { .. } => "SearchBegin",
            StoreAction::CandidatesDidLoad { .. } => "CandidatesDidLoad",
            StoreAction::SelectionBegin { .. } => "SelectionBegin",
            StoreAction::WeatherDidLoad { .. } => "WeatherDidLoad",
            StoreAction::PoisDidLoad { .. } => "PoisDidLoad",
            StoreAction::DetailClaim { .. } => "DetailClaim",
            StoreAction::DetailDidLoad { .. } => "DetailDidLoad",
            StoreAction::Snapshot { .. } => "Snapshot",
        }
    }
}

/// Apply one action to the store. Returns `true` if the state changed.
pub fn reducer(store: &mut StateStore, action: StoreAction) -> bool {
    match action {
        StoreAction::SearchBegin { reply } => {
            let generation = store.begin_search();
            let _ = reply.send(generation);
            true
        }

        StoreAction::CandidatesDidLoad { generation, places } => {
            let current = store.search_generation();
            if generation != current {
                debug!(generation, current, "Discarding result of a previous search");
                return false;
            }
            store.set_candidates(places);
            true
        }

        StoreAction::SelectionBegin { reply } => {
            let epoch = store.begin_selection();
            let _ = reply.send(epoch);
            true
        }

        StoreAction::WeatherDidLoad { epoch, weather } => {
            if is_stale(store, epoch, "weather") {
                return false;
            }
            store.set_weather(Some(weather));
            true
        }

        StoreAction::PoisDidLoad { epoch, pois } => {
            if is_stale(store, epoch, "places") {
                return false;
            }
            for poi in pois {
                let xid = poi.xid.clone();
                store.upsert_poi(&xid, poi.into());
            }
            true
        }

        StoreAction::DetailClaim { xid, reply } => {
            let claimed = store.claim_detail(&xid);
            let changed = claimed.is_some();
            let _ = reply.send(claimed.map(|poi| (store.epoch(), poi)));
            changed
        }

        StoreAction::DetailDidLoad {
            epoch,
            xid,
            description,
        } => {
            if is_stale(store, epoch, "place info") {
                return false;
            }
            store.resolve_detail(&xid, description)
        }

        StoreAction::Snapshot { reply } => {
            let _ = reply.send(store.snapshot());
            false
        }
    }
}

fn is_stale(store: &StateStore, epoch: Epoch, what: &str) -> bool {
    let current = store.epoch();
    if epoch != current {
        debug!(epoch, current, what, "Discarding result of a previous selection");
        return true;
    }
    false
}

/// Spawns the consumer task.
pub struct StoreRuntime;

impl StoreRuntime {
    /// Move `store` into a new task. The task ends, handing the store back,
    /// once every [`StoreHandle`] has been dropped.
    pub fn spawn(mut store: StateStore) -> (StoreHandle, JoinHandle<StateStore>) {
        let (tx, mut rx) = mpsc::unbounded_channel::<StoreAction>();

        let task = tokio::spawn(async move {
            while let Some(action) = rx.recv().await {
                let name = action.name();
                let changed = reducer(&mut store, action);
                trace!(action = name, changed, "Action applied");
            }
            store
        });

        (StoreHandle { tx }, task)
    }
}

/// Cloneable sender side of the consumer task.
#[derive(Debug, Clone)]
pub struct StoreHandle {
    tx: mpsc::UnboundedSender<StoreAction>,
}

impl StoreHandle {
    pub fn send(&self, action: StoreAction) -> Result<(), StoreClosed> {
        self.tx.send(action).map_err(|_| StoreClosed)
    }

    /// Clear the candidates and return the new search generation.
    pub async fn begin_search(&self) -> Result<Generation, StoreClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreAction::SearchBegin { reply })?;
        rx.await.map_err(|_| StoreClosed)
    }

    /// Clear POIs and weather and return the new epoch.
    pub async fn begin_selection(&self) -> Result<Epoch, StoreClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreAction::SelectionBegin { reply })?;
        rx.await.map_err(|_| StoreClosed)
    }

    /// Claim the detail fetch for `xid`; `None` if it was already claimed
    /// or the POI is not in the store.
    pub async fn claim_detail(
        &self,
        xid: &str,
    ) -> Result<Option<(Epoch, PointOfInterestDetail)>, StoreClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreAction::DetailClaim {
            xid: xid.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| StoreClosed)
    }

    pub async fn snapshot(&self) -> Result<StateSnapshot, StoreClosed> {
        let (reply, rx) = oneshot::channel();
        self.send(StoreAction::Snapshot { reply })?;
        rx.await.map_err(|_| StoreClosed)
    }
}
