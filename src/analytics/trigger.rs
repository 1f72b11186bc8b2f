//! Trigger channel classification (organic click, QR scan, API)

use axum::http::{HeaderMap, Uri};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::analytics::bot::header_str;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    #[default]
    Link,
    Qr,
    Api,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::Link => "link",
            Trigger::Qr => "qr",
            Trigger::Api => "api",
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Trigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "link" => Ok(Trigger::Link),
            "qr" => Ok(Trigger::Qr),
            "api" => Ok(Trigger::Api),
            other => Err(format!("unknown trigger '{other}'")),
        }
    }
}

const QR_REFERRER_HINTS: &[&str] = &["qr", "scan", "barcode", "zxing"];
const QR_USER_AGENT_HINTS: &[&str] = &["qr", "scan"];

/// Inputs consulted when deciding the trigger
#[derive(Debug, Clone, Default)]
pub struct TriggerSignals {
    /// Caller-supplied trigger; always wins
    pub explicit: Option<Trigger>,
    /// Value of the `qr` query parameter, `Some("")` when present without a value
    pub qr_param: Option<String>,
    /// Value of the `trigger` query parameter
    pub trigger_param: Option<String>,
    pub referrer: Option<String>,
    pub user_agent: Option<String>,
}

impl TriggerSignals {
    pub fn from_request(uri: &Uri, headers: &HeaderMap, explicit: Option<Trigger>) -> Self {
        let mut signals = TriggerSignals {
            explicit,
            referrer: header_str(headers, "referer").map(str::to_string),
            user_agent: header_str(headers, "user-agent").map(str::to_string),
            ..Default::default()
        };

        if let Some(query) = uri.query() {
            for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
                match key.as_ref() {
                    "qr" if signals.qr_param.is_none() => {
                        signals.qr_param = Some(value.into_owned())
                    }
                    "trigger" if signals.trigger_param.is_none() => {
                        signals.trigger_param = Some(value.into_owned())
                    }
                    _ => {}
                }
            }
        }

        signals
    }

    fn qr_flag(&self) -> bool {
        self.qr_param.as_deref().is_some_and(|v| {
            matches!(v.trim().to_lowercase().as_str(), "" | "1" | "true" | "yes")
        })
    }

    fn contains_any(value: Option<&str>, hints: &[&str]) -> bool {
        value.is_some_and(|v| {
            let lowered = v.to_lowercase();
            hints.iter().any(|hint| lowered.contains(hint))
        })
    }

    pub fn is_qr(&self) -> bool {
        self.qr_flag()
            || self
                .trigger_param
                .as_deref()
                .is_some_and(|t| t.eq_ignore_ascii_case("qr"))
            || Self::contains_any(self.referrer.as_deref(), QR_REFERRER_HINTS)
            || Self::contains_any(self.user_agent.as_deref(), QR_USER_AGENT_HINTS)
    }
}

pub fn classify_trigger(signals: &TriggerSignals) -> Trigger {
    if let Some(explicit) = signals.explicit {
        return explicit;
    }
    if signals.is_qr() {
        Trigger::Qr
    } else {
        Trigger::Link
    }
}
