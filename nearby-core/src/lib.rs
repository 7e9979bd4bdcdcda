//! Core library for the `nearby` place explorer.
//!
//! This crate defines:
//! - A single-shot HTTP gateway and decoders for the upstream JSON APIs
//! - The request orchestrator (search, select, on-demand POI detail)
//! - An observable state store driven by a single consumer task
//! - Configuration & credentials handling
//!
//! It is used by `nearby-cli`, but any host that can register a store
//! listener can drive it.

pub mod codec;
pub mod config;
pub mod error;
pub mod gateway;
pub mod model;
pub mod orchestrator;
pub mod runtime;
pub mod store;

pub use config::{Config, Endpoints, Limits, ServiceConfig, ServiceId, Settings};
pub use error::{FetchError, FetchErrorKind};
pub use gateway::{HttpGateway, ReqwestGateway};
pub use model::{Place, PointOfInterest, PointOfInterestDetail, WeatherSnapshot};
pub use orchestrator::{DetailRequest, RequestOrchestrator, Selection};
pub use runtime::{StoreAction, StoreClosed, StoreHandle, StoreRuntime};
pub use store::{Epoch, Generation, StateSnapshot, StateStore, StoreEvent, StoreListener};
