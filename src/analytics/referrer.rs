//! Referrer normalization

use url::Url;

/// Referrer value for absent, unparsable, or self-referencing referrers
pub const DIRECT: &str = "(direct)";

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Reduce a referrer URL to its lower-cased host without `www.`.
///
/// Referrals from the link's own domain collapse to [`DIRECT`].
pub fn normalize_referrer(referrer: Option<&str>, link_domain: &str) -> String {
    let Some(raw) = referrer.map(str::trim).filter(|r| !r.is_empty()) else {
        return DIRECT.to_string();
    };

    let host = match Url::parse(raw) {
        Ok(url) => match url.host_str() {
            Some(host) if !host.is_empty() => host.to_lowercase(),
            _ => return DIRECT.to_string(),
        },
        Err(_) => return DIRECT.to_string(),
    };

    let host = strip_www(&host);
    let own = link_domain.trim().to_lowercase();

    if host == strip_www(&own) {
        return DIRECT.to_string();
    }

    host.to_string()
}
