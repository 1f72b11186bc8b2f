//! Redirect-event classification
//!
//! Everything a single redirect request passes through before its click
//! record reaches the analytics sink: bot detection, User-Agent parsing,
//! trigger and referrer classification, UTM extraction, identity hashing,
//! record assembly and columnar emission.
//!
//! The classifiers never fail: malformed input degrades to a default value so
//! that tracking can never break a redirect.

pub mod bot;
pub mod dedup;
pub mod emitter;
pub mod geo;
pub mod identity;
pub mod ip_extractor;
pub mod metadata;
pub mod referrer;
pub mod sink;
pub mod trigger;
pub mod user_agent;
pub mod utm;

pub use bot::{detect_bot, BotClassifier, BotRules};
pub use dedup::DedupCache;
pub use emitter::{to_data_point, AnalyticsEmitter, DataPoint};
pub use geo::{EdgeGeo, GeoIpService};
pub use identity::{create_identity_hash, hash_ip};
pub use ip_extractor::extract_client_ip;
pub use metadata::{
    deduplication_key, recent_click_key, ClickContext, ClickMetadata, ClickMetadataAssembler,
    RequestSignals,
};
pub use referrer::normalize_referrer;
pub use sink::{AnalyticsSink, BufferedSink, LoggingSink, MemorySink};
pub use trigger::{classify_trigger, Trigger, TriggerSignals};
pub use user_agent::{parse_user_agent, ParsedUserAgent, UserAgentParser};
pub use utm::{extract_utm_params, UtmParams};
