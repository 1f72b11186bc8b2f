//! Click metadata assembly
//!
//! Runs every classifier over one inbound redirect request and freezes the
//! result into a [`ClickMetadata`] record. Also derives the dedup and
//! last-click cache keys consumed by the external cache.

use axum::http::{HeaderMap, Uri};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::bot::{header_str, BotClassifier, BOT_MANAGEMENT_HEADER};
use crate::analytics::geo::EdgeGeo;
use crate::analytics::identity::{create_identity_hash, hash_ip};
use crate::analytics::referrer::normalize_referrer;
use crate::analytics::trigger::{classify_trigger, Trigger, TriggerSignals};
use crate::analytics::user_agent::{DeviceType, UserAgentParser};
use crate::analytics::utm::{extract_utm_params, UtmParams};

/// Longest user agent kept on a click record, in characters
pub const MAX_USER_AGENT_LEN: usize = 500;

const ID_ALPHABET: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const ID_ENTROPY_BYTES: usize = 16;

/// Random URL-safe identifier of 16 characters.
///
/// Bytes are mapped onto the 62-character alphabet by modulo, which slightly
/// favours the first eight characters.
pub fn generate_id() -> String {
    let bytes: [u8; ID_ENTROPY_BYTES] = rand::random();
    bytes
        .iter()
        .map(|b| ID_ALPHABET[*b as usize % ID_ALPHABET.len()] as char)
        .collect()
}

/// `click:dedup:{domain}:{slug}:{identity_hash}`
pub fn deduplication_key(domain: &str, slug: &str, identity_hash: &str) -> String {
    format!("click:dedup:{domain}:{slug}:{identity_hash}")
}

/// `click:recent:{domain}:{slug}`
pub fn recent_click_key(domain: &str, slug: &str) -> String {
    format!("click:recent:{domain}:{slug}")
}

/// Truncate to at most `max` characters on a char boundary
pub(crate) fn truncate_chars(value: &str, max: usize) -> String {
    match value.char_indices().nth(max) {
        Some((idx, _)) => value[..idx].to_string(),
        None => value.to_string(),
    }
}

/// The link being redirected
#[derive(Debug, Clone, Default)]
pub struct ClickContext {
    pub link_id: String,
    pub user_id: Option<String>,
    pub organization_id: Option<String>,
    pub domain: String,
    pub slug: String,
    pub destination_url: String,
    pub ab_test_id: Option<String>,
    pub ab_variant: Option<String>,
}

/// Request-side inputs, all optional
#[derive(Debug, Clone, Default)]
pub struct RequestSignals {
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub client_ip: Option<String>,
    pub bot_management: Option<String>,
    pub trigger: TriggerSignals,
    pub geo: EdgeGeo,
    /// Region reported when the edge metadata has no colo
    pub default_region: Option<String>,
}

impl RequestSignals {
    pub fn from_request(
        uri: &Uri,
        headers: &HeaderMap,
        client_ip: Option<String>,
        geo: EdgeGeo,
        explicit_trigger: Option<Trigger>,
    ) -> Self {
        Self {
            user_agent: header_str(headers, "user-agent").map(str::to_string),
            referrer: header_str(headers, "referer").map(str::to_string),
            client_ip,
            bot_management: header_str(headers, BOT_MANAGEMENT_HEADER).map(str::to_string),
            trigger: TriggerSignals::from_request(uri, headers, explicit_trigger),
            geo,
            default_region: None,
        }
    }
}

/// Canonical fact record for one redirect event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClickMetadata {
    pub click_id: String,
    pub link_id: String,
    pub user_id: Option<String>,
    pub organization_id: Option<String>,
    pub domain: String,
    pub slug: String,
    pub destination_url: String,

    pub continent: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
    pub postal_code: Option<String>,

    pub device: DeviceType,
    pub device_vendor: Option<String>,
    pub device_model: Option<String>,
    pub browser: String,
    pub browser_version: String,
    pub engine: Option<String>,
    pub engine_version: Option<String>,
    pub os: String,
    pub os_version: String,
    pub cpu_architecture: Option<String>,

    pub referrer: Option<String>,
    pub referrer_domain: String,
    pub ip_hash: Option<String>,
    pub identity_hash: Option<String>,
    pub user_agent: String,

    pub trigger: Trigger,
    pub is_qr: bool,
    pub is_bot: bool,
    pub is_unique: bool,

    #[serde(flatten)]
    pub utm: UtmParams,

    pub ab_test_id: Option<String>,
    pub ab_variant: Option<String>,
    pub edge_region: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ClickMetadata {
    pub fn deduplication_key(&self) -> Option<String> {
        self.identity_hash
            .as_deref()
            .map(|hash| deduplication_key(&self.domain, &self.slug, hash))
    }

    pub fn recent_click_key(&self) -> String {
        recent_click_key(&self.domain, &self.slug)
    }

    /// ISO-8601 UTC timestamp with millisecond precision
    pub fn timestamp_iso(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

/// Identity derived from a request before the record is built, so callers can
/// consult the dedup cache and then pass the verdict as `is_unique`.
pub fn request_identity(signals: &RequestSignals) -> Option<String> {
    signals
        .client_ip
        .as_deref()
        .map(|ip| create_identity_hash(ip, signals.user_agent.as_deref().unwrap_or_default()))
}

#[derive(Default)]
pub struct ClickMetadataAssembler {
    user_agents: UserAgentParser,
    bots: BotClassifier,
}

impl ClickMetadataAssembler {
    pub fn new(user_agents: UserAgentParser, bots: BotClassifier) -> Self {
        Self { user_agents, bots }
    }

    pub fn bots(&self) -> &BotClassifier {
        &self.bots
    }

    /// Build the record. `is_unique` comes from the caller's dedup lookup.
    pub fn assemble(
        &self,
        link: &ClickContext,
        request: &RequestSignals,
        is_unique: bool,
    ) -> ClickMetadata {
        let raw_ua = request.user_agent.as_deref().unwrap_or_default();
        let parsed = self.user_agents.parse(raw_ua);
        let is_bot = self
            .bots
            .is_bot(request.user_agent.as_deref(), request.bot_management.as_deref());

        let trigger = classify_trigger(&request.trigger);
        let geo = &request.geo;

        ClickMetadata {
            click_id: generate_id(),
            link_id: link.link_id.clone(),
            user_id: link.user_id.clone(),
            organization_id: link.organization_id.clone(),
            domain: link.domain.clone(),
            slug: link.slug.clone(),
            destination_url: link.destination_url.clone(),

            continent: geo.continent.clone(),
            country: geo.country.clone(),
            region: geo.region.clone(),
            city: geo.city.clone(),
            latitude: geo.latitude,
            longitude: geo.longitude,
            timezone: geo.timezone.clone(),
            postal_code: geo.postal_code.clone(),

            device: parsed.device,
            device_vendor: parsed.device_vendor,
            device_model: parsed.device_model,
            browser: parsed.browser,
            browser_version: parsed.browser_version,
            engine: parsed.engine,
            engine_version: parsed.engine_version,
            os: parsed.os,
            os_version: parsed.os_version,
            cpu_architecture: parsed.cpu_architecture,

            referrer: request.referrer.clone(),
            referrer_domain: normalize_referrer(request.referrer.as_deref(), &link.domain),
            ip_hash: request.client_ip.as_deref().map(hash_ip),
            identity_hash: request_identity(request),
            user_agent: truncate_chars(raw_ua, MAX_USER_AGENT_LEN),

            trigger,
            is_qr: trigger == Trigger::Qr,
            is_bot,
            is_unique,

            utm: extract_utm_params(&link.destination_url),

            ab_test_id: link.ab_test_id.clone(),
            ab_variant: link.ab_variant.clone(),
            edge_region: geo.colo.clone().or_else(|| request.default_region.clone()),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::referrer::DIRECT;

    fn link() -> ClickContext {
        ClickContext {
            link_id: "lnk_1".to_string(),
            user_id: Some("usr_1".to_string()),
            organization_id: None,
            domain: "go2.gg".to_string(),
            slug: "abc".to_string(),
            destination_url: "https://d.example/x?utm_source=news&utm_campaign=launch".to_string(),
            ab_test_id: Some("ab_1".to_string()),
            ab_variant: Some("B".to_string()),
        }
    }

    fn request() -> RequestSignals {
        RequestSignals {
            user_agent: Some(
                "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1"
                    .to_string(),
            ),
            referrer: Some("https://www.go2.gg/dashboard".to_string()),
            client_ip: Some("203.0.113.9".to_string()),
            geo: EdgeGeo {
                country: Some("US".to_string()),
                colo: Some("SJC".to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_generate_id_shape() {
        let id = generate_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(id, generate_id());
    }

    #[test]
    fn test_key_formats() {
        assert_eq!(
            deduplication_key("go2.gg", "abc", "deadbeef"),
            "click:dedup:go2.gg:abc:deadbeef"
        );
        assert_eq!(recent_click_key("go2.gg", "abc"), "click:recent:go2.gg:abc");
    }

    #[test]
    fn test_assemble_resolves_all_fields() {
        let assembler = ClickMetadataAssembler::default();
        let click = assembler.assemble(&link(), &request(), true);

        assert_eq!(click.link_id, "lnk_1");
        assert_eq!(click.device, DeviceType::Mobile);
        assert_eq!(click.browser, "Safari");
        assert_eq!(click.os, "iOS");
        assert_eq!(click.referrer_domain, DIRECT);
        assert_eq!(click.trigger, Trigger::Link);
        assert!(!click.is_qr);
        assert!(!click.is_bot);
        assert!(click.is_unique);
        assert_eq!(click.country.as_deref(), Some("US"));
        assert_eq!(click.edge_region.as_deref(), Some("SJC"));
        assert_eq!(click.utm.utm_source.as_deref(), Some("news"));
        assert_eq!(click.utm.utm_campaign.as_deref(), Some("launch"));
        assert_eq!(click.ip_hash, Some(hash_ip("203.0.113.9")));

        let identity = click.identity_hash.clone().unwrap();
        assert_eq!(identity.len(), 32);
        assert_eq!(
            click.deduplication_key(),
            Some(format!("click:dedup:go2.gg:abc:{identity}"))
        );
        assert!(click.timestamp_iso().ends_with('Z'));
    }

    #[test]
    fn test_assemble_with_no_request_signals() {
        let assembler = ClickMetadataAssembler::default();
        let click = assembler.assemble(&link(), &RequestSignals::default(), false);

        assert!(click.is_bot);
        assert_eq!(click.browser, "unknown");
        assert_eq!(click.referrer_domain, DIRECT);
        assert!(click.ip_hash.is_none());
        assert!(click.identity_hash.is_none());
        assert!(click.deduplication_key().is_none());
        assert!(click.country.is_none());
        assert!(click.edge_region.is_none());
        assert_eq!(click.user_agent, "");
    }

    #[test]
    fn test_user_agent_truncated_to_limit() {
        let mut signals = request();
        signals.user_agent = Some("é".repeat(800));
        let click = ClickMetadataAssembler::default().assemble(&link(), &signals, true);
        assert_eq!(click.user_agent.chars().count(), MAX_USER_AGENT_LEN);
    }

    #[test]
    fn test_qr_trigger_sets_flag() {
        let mut signals = request();
        signals.trigger.qr_param = Some("1".to_string());
        let click = ClickMetadataAssembler::default().assemble(&link(), &signals, true);
        assert_eq!(click.trigger, Trigger::Qr);
        assert!(click.is_qr);
    }
}
