//! Core domain types.
//!
//! Pure values with no knowledge of how the registry stores or matches
//! providers.

pub mod filter;
pub mod properties;
pub mod ranking;
pub mod service;
pub mod strategy;

pub use filter::{
    ComposeError, Composition, FilterBuilder, ServiceSpec, TYPE_NAME_ERROR, language_clause,
    with_language_clause,
};
pub use properties::{
    Properties, PropertySnapshot, SERVICE_ID, SERVICE_LANGUAGE, SERVICE_RANKING, SERVICE_VERSION,
};
pub use ranking::{ProviderRanking, ServiceRankingOrder, best_of};
pub use service::{ProviderObject, ServiceEvent, ServiceEventKind, ServiceId, ServiceReference};
pub use strategy::RebindStrategy;
