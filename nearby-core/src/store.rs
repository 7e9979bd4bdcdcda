//! Observable state: candidate places, discovered POIs and the weather display.
//!
//! The store knows nothing about the network. Every mutation notifies the
//! registered listeners synchronously, in the order the mutations happen.

use std::collections::HashMap;

use crate::model::{Place, PointOfInterestDetail, WeatherSnapshot};

/// Identifies the currently active selection.
pub type Epoch = u64;

/// Identifies the most recent place search.
pub type Generation = u64;

/// Granular change notification delivered to listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    CandidateAdded { index: usize, place: Place },
    CandidateRemoved { index: usize, place: Place },
    PoiAdded(PointOfInterestDetail),
    PoiRemoved(PointOfInterestDetail),
    /// An existing entry was replaced in place.
    PoiUpdated(PointOfInterestDetail),
    WeatherChanged(Option<WeatherSnapshot>),
}

pub type StoreListener = Box<dyn Fn(&StoreEvent) + Send + Sync>;

#[derive(Default)]
pub struct StateStore {
    candidates: Vec<Place>,
    pois: HashMap<String, PointOfInterestDetail>,
    poi_order: Vec<String>,
    weather: Option<WeatherSnapshot>,
    epoch: Epoch,
    search: Generation,
    listeners: Vec<StoreListener>,
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("candidates", &self.candidates.len())
            .field("pois", &self.poi_order.len())
            .field("weather", &self.weather)
            .field("epoch", &self.epoch)
            .field("search", &self.search)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. It sees every event emitted from now on.
    pub fn subscribe(&mut self, listener: StoreListener) {
        self.listeners.push(listener);
    }

    fn emit(&self, event: StoreEvent) {
        for listener in &self.listeners {
            listener(&event);
        }
    }

    /// Replace the candidate sequence.
    ///
    /// Old entries are removed back to front so each reported index is
    /// valid at the moment the event fires.
    pub fn set_candidates(&mut self, places: Vec<Place>) {
        while let Some(place) = self.candidates.pop() {
            let index = self.candidates.len();
            self.emit(StoreEvent::CandidateRemoved { index, place });
        }

        for place in places {
            let index = self.candidates.len();
            self.candidates.push(place.clone());
            self.emit(StoreEvent::CandidateAdded { index, place });
        }
    }

    pub fn clear_pois(&mut self) {
        for xid in std::mem::take(&mut self.poi_order) {
            if let Some(poi) = self.pois.remove(&xid) {
                self.emit(StoreEvent::PoiRemoved(poi));
            }
        }
    }

    /// Insert or replace a POI keyed by `xid`.
    ///
    /// A replacement never clears an already claimed detail flag.
    pub fn upsert_poi(&mut self, xid: &str, mut record: PointOfInterestDetail) {
        match self.pois.get_mut(xid) {
            Some(existing) => {
                record.detail_attempted |= existing.detail_attempted;
                *existing = record.clone();
                self.emit(StoreEvent::PoiUpdated(record));
            }
            None => {
                self.poi_order.push(xid.to_string());
                self.pois.insert(xid.to_string(), record.clone());
                self.emit(StoreEvent::PoiAdded(record));
            }
        }
    }

    pub fn set_weather(&mut self, weather: Option<WeatherSnapshot>) {
        if self.weather == weather {
            return;
        }
        self.weather = weather.clone();
        self.emit(StoreEvent::WeatherChanged(weather));
    }

    /// Start a new selection: bump the epoch, then clear POIs and weather.
    pub fn begin_selection(&mut self) -> Epoch {
        self.epoch += 1;
        self.clear_pois();
        self.set_weather(None);
        self.epoch
    }

    /// Start a new search: bump the generation and clear the candidates.
    pub fn begin_search(&mut self) -> Generation {
        self.search += 1;
        self.set_candidates(Vec::new());
        self.search
    }

    /// Mark the detail of `xid` as attempted.
    ///
    /// Returns the claimed record only for the first caller; later calls,
    /// and calls for unknown ids, return `None`.
    pub fn claim_detail(&mut self, xid: &str) -> Option<PointOfInterestDetail> {
        let poi = self.pois.get_mut(xid)?;
        if poi.detail_attempted {
            return None;
        }
        poi.detail_attempted = true;
        let claimed = poi.clone();
        self.emit(StoreEvent::PoiUpdated(claimed.clone()));
        Some(claimed)
    }

    /// Record the outcome of a detail fetch. `None` leaves the entry as
    /// "attempted, no description".
    pub fn resolve_detail(&mut self, xid: &str, description: Option<String>) -> bool {
        let Some(poi) = self.pois.get_mut(xid) else {
            return false;
        };
        poi.detail_attempted = true;
        if description.is_none() || poi.description == description {
            return false;
        }
        poi.description = description;
        let updated = poi.clone();
        self.emit(StoreEvent::PoiUpdated(updated));
        true
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn search_generation(&self) -> Generation {
        self.search
    }

    pub fn candidates(&self) -> &[Place] {
        &self.candidates
    }

    pub fn weather(&self) -> Option<&WeatherSnapshot> {
        self.weather.as_ref()
    }

    pub fn poi(&self, xid: &str) -> Option<&PointOfInterestDetail> {
        self.pois.get(xid)
    }

    /// POIs in discovery order.
    pub fn pois(&self) -> impl Iterator<Item = &PointOfInterestDetail> {
        self.poi_order.iter().filter_map(|xid| self.pois.get(xid))
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            candidates: self.candidates.clone(),
            pois: self.pois().cloned().collect(),
            weather: self.weather.clone(),
            epoch: self.epoch,
        }
    }
}

/// Read-only copy of the store contents.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StateSnapshot {
    pub candidates: Vec<Place>,
    pub pois: Vec<PointOfInterestDetail>,
    pub weather: Option<WeatherSnapshot>,
    pub epoch: Epoch,
}

impl StateSnapshot {
    /// Resolve a rendered candidate label back to its place. Labels are not
    /// unique; the first candidate with that label wins.
    pub fn find_candidate(&self, label: &str) -> Option<&Place> {
        self.candidates.iter().find(|p| p.label() == label)
    }

    pub fn poi(&self, xid: &str) -> Option<&PointOfInterestDetail> {
        self.pois.iter().find(|p| p.xid == xid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PointOfInterest;
    use std::sync::{Arc, Mutex};

    fn recording_store() -> (StateStore, Arc<Mutex<Vec<StoreEvent>>>) {
        let mut store = StateStore::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        store.subscribe(Box::new(move |event| {
            sink.lock().unwrap().push(event.clone());
        }));
        (store, events)
    }

    fn place(name: &str, city: Option<&str>) -> Place {
        Place {
            name: name.into(),
            city: city.map(str::to_string),
            lat: 1.0,
            lng: 2.0,
        }
    }

    fn poi(xid: &str, name: &str) -> PointOfInterestDetail {
        PointOfInterest {
            xid: xid.into(),
            name: name.into(),
        }
        .into()
    }

    #[test]
    fn set_candidates_removes_then_adds() {
        let (mut store, events) = recording_store();
        store.set_candidates(vec![place("A", None), place("B", None)]);
        events.lock().unwrap().clear();

        store.set_candidates(vec![place("C", Some("X"))]);

        let events = events.lock().unwrap();
        assert_eq!(
            *events,
            vec![
                StoreEvent::CandidateRemoved {
                    index: 1,
                    place: place("B", None),
                },
                StoreEvent::CandidateRemoved {
                    index: 0,
                    place: place("A", None),
                },
                StoreEvent::CandidateAdded {
                    index: 0,
                    place: place("C", Some("X")),
                },
            ]
        );
        assert_eq!(store.candidates().len(), 1);
    }

    #[test]
    fn begin_selection_clears_before_new_entries_arrive() {
        let (mut store, events) = recording_store();
        store.upsert_poi("N1", poi("N1", "Old"));
        store.set_weather(Some(WeatherSnapshot {
            condition: Some("Rain".into()),
            description: None,
            temperature_c: Some(4.0),
        }));

        let epoch = store.begin_selection();
        store.upsert_poi("N2", poi("N2", "New"));

        assert_eq!(epoch, 1);
        let events = events.lock().unwrap();
        let tail: Vec<_> = events.iter().skip(2).cloned().collect();
        assert_eq!(
            tail,
            vec![
                StoreEvent::PoiRemoved(poi("N1", "Old")),
                StoreEvent::WeatherChanged(None),
                StoreEvent::PoiAdded(poi("N2", "New")),
            ]
        );
    }

    #[test]
    fn begin_search_clears_candidates_and_bumps_generation() {
        let (mut store, events) = recording_store();
        store.set_candidates(vec![place("A", None)]);

        assert_eq!(store.begin_search(), 1);
        assert_eq!(store.begin_search(), 2);

        assert!(store.candidates().is_empty());
        assert_eq!(store.search_generation(), 2);
        let removed = events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, StoreEvent::CandidateRemoved { .. }))
            .count();
        assert_eq!(removed, 1);
    }

    #[test]
    fn claim_detail_succeeds_once() {
        let mut store = StateStore::new();
        store.upsert_poi("N1", poi("N1", "Louvre"));

        let first = store.claim_detail("N1");
        let second = store.claim_detail("N1");

        assert!(first.is_some_and(|p| p.detail_attempted()));
        assert!(second.is_none());
        assert!(store.claim_detail("unknown").is_none());
    }

    #[test]
    fn upsert_never_resets_detail_flag() {
        let mut store = StateStore::new();
        store.upsert_poi("N1", poi("N1", "Louvre"));
        store.claim_detail("N1");

        store.upsert_poi("N1", poi("N1", "Louvre Museum"));

        let stored = store.poi("N1").unwrap();
        assert!(stored.detail_attempted());
        assert_eq!(stored.name, "Louvre Museum");
    }

    #[test]
    fn resolve_detail_without_description_keeps_flag() {
        let (mut store, events) = recording_store();
        store.upsert_poi("N1", poi("N1", "Louvre"));
        store.claim_detail("N1");
        let before = events.lock().unwrap().len();

        let changed = store.resolve_detail("N1", None);

        assert!(!changed);
        assert_eq!(events.lock().unwrap().len(), before);
        let stored = store.poi("N1").unwrap();
        assert!(stored.detail_attempted());
        assert_eq!(stored.description, None);
    }

    #[test]
    fn resolve_detail_writes_description() {
        let mut store = StateStore::new();
        store.upsert_poi("N1", poi("N1", "Louvre"));
        store.claim_detail("N1");

        assert!(store.resolve_detail("N1", Some("Museum".into())));
        assert_eq!(store.poi("N1").unwrap().description.as_deref(), Some("Museum"));
    }

    #[test]
    fn unchanged_weather_emits_nothing() {
        let (mut store, events) = recording_store();
        store.set_weather(None);
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn snapshot_keeps_discovery_order_and_finds_labels() {
        let mut store = StateStore::new();
        store.set_candidates(vec![place("Paris", Some("Paris")), place("Paris", None)]);
        for (xid, name) in [("N3", "c"), ("N1", "a"), ("N2", "b")] {
            store.upsert_poi(xid, poi(xid, name));
        }

        let snapshot = store.snapshot();
        let ids: Vec<_> = snapshot.pois.iter().map(|p| p.xid.as_str()).collect();

        assert_eq!(ids, ["N3", "N1", "N2"]);
        assert_eq!(snapshot.find_candidate("Paris"), Some(&place("Paris", None)));
        assert!(snapshot.find_candidate("Lyon").is_none());
    }
}
