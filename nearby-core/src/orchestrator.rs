//! Issues the upstream requests and posts their results to the store.
//!
//! Every failure except an empty search query ends here: it is logged and
//! the affected piece of state simply stays empty.

use reqwest::Url;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::codec;
use crate::config::Settings;
use crate::error::FetchError;
use crate::gateway::{HttpGateway, ReqwestGateway};
use crate::model::{Place, PointOfInterestDetail};
use crate::runtime::{StoreAction, StoreClosed, StoreHandle};
use crate::store::Epoch;

const WEATHER_UNITS: &str = "metric";
const WEATHER_CITIES: &str = "1";
const PLACES_FORMAT: &str = "json";

/// Fan-out started by [`RequestOrchestrator::select_place`].
#[derive(Debug)]
pub struct Selection {
    pub epoch: Epoch,
    weather: JoinHandle<()>,
    pois: JoinHandle<()>,
}

impl Selection {
    /// Wait for both calls to finish and their results to be posted.
    pub async fn join(self) {
        let (weather, pois) = tokio::join!(self.weather, self.pois);
        if let Err(e) = weather.and(pois) {
            warn!(epoch = self.epoch, error = %e, "Selection task did not complete");
        }
    }
}

#[derive(Debug)]
pub enum DetailRequest {
    /// A detail fetch for this POI was already issued; nothing was sent.
    AlreadyAttempted,
    Dispatched(JoinHandle<()>),
}

impl DetailRequest {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, DetailRequest::Dispatched(_))
    }

    pub async fn join(self) {
        if let DetailRequest::Dispatched(handle) = self {
            if let Err(e) = handle.await {
                warn!(error = %e, "Detail task did not complete");
            }
        }
    }
}

#[derive(Debug)]
struct Inner {
    gateway: Arc<dyn HttpGateway>,
    settings: Settings,
    store: StoreHandle,
}

/// Entry point for the host: search, select, and on-demand detail.
///
/// Cheap to clone; all clones share one HTTP client and one store.
#[derive(Debug, Clone)]
pub struct RequestOrchestrator {
    inner: Arc<Inner>,
}

impl RequestOrchestrator {
    pub fn new(gateway: Arc<dyn HttpGateway>, settings: Settings, store: StoreHandle) -> Self {
        Self {
            inner: Arc::new(Inner {
                gateway,
                settings,
                store,
            }),
        }
    }

    /// Build an orchestrator over a real HTTP client.
    pub fn from_settings(settings: Settings, store: StoreHandle) -> anyhow::Result<Self> {
        let gateway = ReqwestGateway::new(settings.connect_timeout)?;
        Ok(Self::new(Arc::new(gateway), settings, store))
    }

    pub fn store(&self) -> &StoreHandle {
        &self.inner.store
    }

    /// Search candidate places by free-text name.
    ///
    /// The candidate sequence is cleared first and the search gets a new
    /// generation; results reach the store only while no newer search has
    /// started. A blank query is rejected without touching the network; any
    /// other failure yields an empty list.
    #[instrument(skip(self))]
    pub async fn search_places(&self, query: &str) -> Result<Vec<Place>, FetchError> {
        let inner = &self.inner;
        let generation = inner.store.begin_search().await;

        let query = query.trim();
        if query.is_empty() {
            warn!("Search query is empty, not sending a request");
            return Err(FetchError::invalid_input("search query is empty"));
        }

        let generation = match generation {
            Ok(generation) => generation,
            Err(e) => {
                warn!(error = %e, "Search results have nowhere to go");
                return Ok(Vec::new());
            }
        };

        let url = inner.geocoding_url(query);
        let places = match inner.fetch(&url, codec::decode_places).await {
            Ok(mut places) => {
                places.truncate(inner.settings.limits.geocoding_limit as usize);
                places
            }
            Err(e) => {
                warn!(error = %e, kind = ?e.kind(), "Place search failed");
                Vec::new()
            }
        };

        info!(generation, count = places.len(), "Found places");
        inner.publish(StoreAction::CandidatesDidLoad {
            generation,
            places: places.clone(),
        });
        Ok(places)
    }

    /// Select a candidate: clear POIs and weather, then load both concurrently.
    ///
    /// Returns once the store has been cleared; the two calls keep running in
    /// the background and neither waits for the other.
    #[instrument(skip(self, place), fields(place = %place))]
    pub async fn select_place(&self, place: &Place) -> Result<Selection, StoreClosed> {
        let epoch = self.inner.store.begin_selection().await?;
        info!(epoch, lat = place.lat, lng = place.lng, "Selected place");

        let inner = self.inner.clone();
        let at = place.clone();
        let weather = tokio::spawn(async move { inner.load_weather(&at, epoch).await });

        let inner = self.inner.clone();
        let at = place.clone();
        let pois = tokio::spawn(async move { inner.load_pois(&at, epoch).await });

        Ok(Selection {
            epoch,
            weather,
            pois,
        })
    }

    /// Fetch the description of a POI, at most once per discovered entry.
    ///
    /// The attempt flag is claimed in the store before the request goes
    /// out, so overlapping calls for the same POI send a single request.
    #[instrument(skip(self, poi), fields(xid = %poi.xid))]
    pub async fn fetch_detail(
        &self,
        poi: &PointOfInterestDetail,
    ) -> Result<DetailRequest, StoreClosed> {
        if poi.detail_attempted() {
            debug!("Detail already attempted");
            return Ok(DetailRequest::AlreadyAttempted);
        }

        let Some((epoch, claimed)) = self.inner.store.claim_detail(&poi.xid).await? else {
            debug!("Detail claimed by an earlier request");
            return Ok(DetailRequest::AlreadyAttempted);
        };

        let inner = self.inner.clone();
        let handle = tokio::spawn(async move { inner.load_detail(claimed.xid, epoch).await });
        Ok(DetailRequest::Dispatched(handle))
    }
}

impl Inner {
    fn publish(&self, action: StoreAction) {
        let name = action.name();
        if self.store.send(action).is_err() {
            warn!(action = name, "State store has stopped, dropping update");
        }
    }

    async fn fetch<T>(
        &self,
        url: &Url,
        decode: fn(&str) -> Result<T, FetchError>,
    ) -> Result<T, FetchError> {
        let body = self.gateway.fetch(url).await?;
        decode(&body)
    }

    async fn load_weather(&self, place: &Place, epoch: Epoch) {
        let url = self.weather_url(place);
        let result = self.fetch(&url, codec::decode_weather).await.and_then(|w| {
            if w.condition.is_some() {
                Ok(w)
            } else {
                Err(FetchError::missing("weather description"))
            }
        });

        match result {
            Ok(weather) => {
                info!(
                    epoch,
                    condition = weather.condition.as_deref().unwrap_or_default(),
                    temp = ?weather.temperature_c,
                    "Got weather"
                );
                self.publish(StoreAction::WeatherDidLoad { epoch, weather });
            }
            Err(e) => {
                warn!(epoch, error = %e, kind = ?e.kind(), "Weather unavailable, display stays empty");
            }
        }
    }

    async fn load_pois(&self, place: &Place, epoch: Epoch) {
        let mut url = self.places_url(&["places", "radius"]);
        self.append_places_query(&mut url, place);

        match self.fetch(&url, codec::decode_pois).await {
            Ok(pois) => {
                info!(epoch, count = pois.len(), "Found interesting places");
                self.publish(StoreAction::PoisDidLoad { epoch, pois });
            }
            Err(e) => {
                warn!(epoch, error = %e, kind = ?e.kind(), "Interesting places unavailable");
            }
        }
    }

    async fn load_detail(&self, xid: String, epoch: Epoch) {
        let mut url = self.places_url(&["places", "xid", xid.as_str()]);
        url.query_pairs_mut()
            .append_pair("lang", &self.settings.language)
            .append_pair("apikey", &self.settings.places_key);

        let description = match self.fetch(&url, codec::decode_poi_detail).await {
            Ok(body) => match body.description {
                Some(text) => {
                    info!(xid, "Got description");
                    Some(text)
                }
                None => {
                    let e = FetchError::missing("description");
                    info!(xid, reason = %e, "No info available");
                    None
                }
            },
            Err(e) => {
                warn!(xid, error = %e, kind = ?e.kind(), "Place info unavailable");
                None
            }
        };

        self.publish(StoreAction::DetailDidLoad {
            epoch,
            xid,
            description,
        });
    }

    fn geocoding_url(&self, query: &str) -> Url {
        let mut url = self.settings.geocoding_url.clone();
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("limit", &self.settings.limits.geocoding_limit.to_string())
            .append_pair("key", &self.settings.geocoding_key);
        url
    }

    fn weather_url(&self, place: &Place) -> Url {
        let mut url = self.settings.weather_url.clone();
        url.query_pairs_mut()
            .append_pair("lat", &place.lat.to_string())
            .append_pair("lon", &place.lng.to_string())
            .append_pair("units", WEATHER_UNITS)
            .append_pair("cnt", WEATHER_CITIES)
            .append_pair("appid", &self.settings.weather_key);
        url
    }

    fn append_places_query(&self, url: &mut Url, place: &Place) {
        let limits = &self.settings.limits;
        url.query_pairs_mut()
            .append_pair("lang", &self.settings.language)
            .append_pair("radius", &limits.poi_radius_m.to_string())
            .append_pair("lon", &place.lng.to_string())
            .append_pair("lat", &place.lat.to_string())
            .append_pair("format", PLACES_FORMAT)
            .append_pair("limit", &limits.poi_limit.to_string())
            .append_pair("apikey", &self.settings.places_key);
    }

    /// `<places root>/<language>/<segments...>`, each segment percent-encoded.
    ///
    /// `Config::settings` only accepts a places root that can take a path.
    fn places_url(&self, segments: &[&str]) -> Url {
        let mut url = self.settings.places_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .push(&self.settings.language)
                .extend(segments);
        }
        url
    }
}
