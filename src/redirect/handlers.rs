use axum::{
    extract::{ConnectInfo, Path, State},
    http::{header, header::HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;

use super::middleware::RequestStart;
use crate::analytics::bot::header_str;
use crate::analytics::dedup::RecentClick;
use crate::analytics::geo::resolve_geo;
use crate::analytics::metadata::request_identity;
use crate::analytics::{
    deduplication_key, extract_client_ip, AnalyticsEmitter, AnalyticsSink, ClickMetadataAssembler,
    DedupCache, GeoIpService, RequestSignals, Trigger,
};
use crate::config::{AnalyticsConfig, TrustedProxyMode};
use crate::storage::Storage;

/// Request header that overrides trigger classification
pub const TRIGGER_HEADER: &str = "x-linkpulse-trigger";

pub struct RedirectState {
    pub storage: Arc<dyn Storage>,
    pub assembler: ClickMetadataAssembler,
    pub emitter: AnalyticsEmitter,
    pub dedup: DedupCache,
    pub geoip: Option<Arc<GeoIpService>>,
    pub trusted_proxy_mode: TrustedProxyMode,
    pub edge_region: Option<String>,
}

impl RedirectState {
    pub fn new(
        storage: Arc<dyn Storage>,
        sink: Arc<dyn AnalyticsSink>,
        config: &AnalyticsConfig,
        geoip: Option<Arc<GeoIpService>>,
    ) -> Self {
        Self {
            storage,
            assembler: ClickMetadataAssembler::default(),
            emitter: AnalyticsEmitter::new(sink),
            dedup: DedupCache::new(
                std::time::Duration::from_secs(config.dedup_window_secs),
                config.dedup_max_entries,
            ),
            geoip,
            trusted_proxy_mode: config.trusted_proxy_mode,
            edge_region: config.edge_region.clone(),
        }
    }
}

/// Host the request was addressed to, lowercased and without port
fn request_domain(headers: &HeaderMap) -> Option<String> {
    let host = header_str(headers, header::HOST.as_str())?;
    let host = match host.rsplit_once(':') {
        Some((name, port))
            if !port.is_empty()
                && port.chars().all(|c| c.is_ascii_digit())
                && (!name.contains(':') || name.ends_with(']')) =>
        {
            name
        }
        _ => host,
    };
    Some(host.to_ascii_lowercase())
}

/// Resolve a short link, record the click and redirect to its destination
pub async fn redirect_link(
    State(state): State<Arc<RedirectState>>,
    Path(slug): Path<String>,
    Extension(RequestStart(request_start)): Extension<RequestStart>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let Some(domain) = request_domain(&headers) else {
        return (StatusCode::BAD_REQUEST, "Missing Host header").into_response();
    };

    let link = match state.storage.get_link(&domain, &slug).await {
        Ok(Some(link)) => link,
        Ok(None) => return (StatusCode::NOT_FOUND, "Link not found").into_response(),
        Err(e) => {
            tracing::error!(%domain, %slug, error = %e, "Failed to look up link");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response();
        }
    };

    if link.archived {
        return (StatusCode::GONE, "This link has been archived").into_response();
    }

    let client_ip = extract_client_ip(&headers, addr.ip(), state.trusted_proxy_mode);
    let geo = resolve_geo(&headers, Some(client_ip), state.geoip.as_deref());
    let explicit_trigger =
        header_str(&headers, TRIGGER_HEADER).and_then(|value| value.parse::<Trigger>().ok());

    let mut signals = RequestSignals::from_request(
        &uri,
        &headers,
        Some(client_ip.to_string()),
        geo,
        explicit_trigger,
    );
    signals.default_region = state.edge_region.clone();

    let is_bot = state
        .assembler
        .bots()
        .is_bot(signals.user_agent.as_deref(), signals.bot_management.as_deref());

    let is_unique = if is_bot {
        false
    } else {
        match request_identity(&signals) {
            Some(identity) => {
                state
                    .dedup
                    .check_and_mark(&deduplication_key(&link.domain, &link.slug, &identity))
                    .await
            }
            None => true,
        }
    };

    let click = state
        .assembler
        .assemble(&link.click_context(), &signals, is_unique);

    state
        .dedup
        .record_recent(
            &click.recent_click_key(),
            RecentClick {
                click_id: click.click_id.clone(),
                timestamp: click.timestamp,
            },
        )
        .await;

    state.emitter.emit(&click);

    tracing::debug!(
        link_id = %link.id,
        click_id = %click.click_id,
        trigger = %click.trigger,
        is_bot,
        is_unique,
        "Redirecting"
    );

    let elapsed_ms = request_start.elapsed().as_millis().to_string();

    (
        StatusCode::FOUND,
        [
            (header::LOCATION.as_str(), link.destination_url),
            ("x-linkpulse-timing-total-ms", elapsed_ms),
        ],
    )
        .into_response()
}

/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    #[derive(Serialize)]
    struct HealthResponse {
        status: &'static str,
        timestamp: String,
    }

    Json(HealthResponse {
        status: "OK",
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn with_host(host: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static(host));
        headers
    }

    #[test]
    fn test_request_domain_strips_port_and_case() {
        assert_eq!(request_domain(&with_host("Go2.GG:8080")).as_deref(), Some("go2.gg"));
        assert_eq!(request_domain(&with_host("go2.gg")).as_deref(), Some("go2.gg"));
        assert_eq!(request_domain(&with_host("[::1]:3000")).as_deref(), Some("[::1]"));
        assert_eq!(request_domain(&with_host("[::1]")).as_deref(), Some("[::1]"));
        assert_eq!(request_domain(&HeaderMap::new()), None);
    }
}
