//! UTM parameters of a destination URL

use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtmParams {
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
}

/// Pull the `utm_*` query parameters from `destination`.
///
/// Unparsable URLs yield an empty set. When a parameter repeats, the first
/// occurrence is kept.
pub fn extract_utm_params(destination: &str) -> UtmParams {
    let Ok(url) = Url::parse(destination) else {
        return UtmParams::default();
    };

    let mut params = UtmParams::default();
    for (key, value) in url.query_pairs() {
        let slot = match key.as_ref() {
            "utm_source" => &mut params.utm_source,
            "utm_medium" => &mut params.utm_medium,
            "utm_campaign" => &mut params.utm_campaign,
            "utm_term" => &mut params.utm_term,
            "utm_content" => &mut params.utm_content,
            _ => continue,
        };
        if slot.is_none() {
            *slot = Some(value.into_owned());
        }
    }
    params
}
