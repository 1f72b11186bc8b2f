//! Automated-traffic detection
//!
//! Checks run in a fixed order and the first hit wins:
//! exact signature, substring, too-short agent, upstream bot score.

use axum::http::HeaderMap;
use serde::Deserialize;
use std::sync::LazyLock;
use tracing::debug;

/// Non-browser HTTP client signatures matched verbatim
pub const EXACT_BOT_USER_AGENTS: &[&str] = &[
    "Go-http-client/1.1",
    "Go-http-client/2.0",
    "Mozilla/5.0",
    "Java",
    "Ruby",
    "PycURL",
    "libwww-perl",
];

/// Lower-case fragments that mark an agent as automated
pub const BOT_USER_AGENT_SUBSTRINGS: &[&str] = &[
    // crawlers
    "bot",
    "crawler",
    "spider",
    "slurp",
    "archiver",
    // http libraries
    "curl",
    "wget",
    "python-requests",
    "python-urllib",
    "aiohttp",
    "httpx",
    "go-http-client",
    "java/",
    "okhttp",
    "apache-httpclient",
    "axios",
    "node-fetch",
    "undici",
    "libwww",
    "httpie",
    "postman",
    "insomnia",
    // headless browsers
    "headlesschrome",
    "phantomjs",
    "puppeteer",
    "playwright",
    "selenium",
    "webdriver",
    // seo and monitoring
    "lighthouse",
    "pagespeed",
    "gtmetrix",
    "pingdom",
    "uptimerobot",
    "statuscake",
    "site24x7",
    "ahrefs",
    "semrush",
    "mj12",
    "screaming frog",
    // social previews
    "facebookexternalhit",
    "facebookcatalog",
    "whatsapp",
    "skypeuripreview",
    "embedly",
    "vkshare",
    "redditbot",
    "pinterest",
    // search engines
    "googlebot",
    "google-inspectiontool",
    "bingpreview",
    "yandex",
    "baiduspider",
    "duckduckgo",
    "applebot",
    "petalbot",
    "sogou",
    // generic
    "test",
    "fetch",
    "probe",
    "scrape",
    "monitor",
    "check",
];

/// Agents shorter than this are treated as automated
pub const MIN_USER_AGENT_LENGTH: usize = 10;

/// Upstream scores below this are treated as automated
pub const BOT_SCORE_THRESHOLD: f64 = 30.0;

pub const BOT_MANAGEMENT_HEADER: &str = "cf-bot-management";

/// Pattern data consulted by [`BotClassifier`]
#[derive(Debug, Clone)]
pub struct BotRules {
    pub exact: Vec<String>,
    pub substrings: Vec<String>,
    pub min_length: usize,
    pub score_threshold: f64,
}

impl Default for BotRules {
    fn default() -> Self {
        Self {
            exact: EXACT_BOT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            substrings: BOT_USER_AGENT_SUBSTRINGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_length: MIN_USER_AGENT_LENGTH,
            score_threshold: BOT_SCORE_THRESHOLD,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BotManagement {
    #[serde(default, alias = "verifiedBot")]
    verified_bot: Option<bool>,
    #[serde(default)]
    score: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct BotClassifier {
    rules: BotRules,
}

impl BotClassifier {
    pub fn new(rules: BotRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &BotRules {
        &self.rules
    }

    /// Verdict from the agent string alone (exact, substring, length)
    pub fn is_bot_user_agent(&self, user_agent: &str) -> bool {
        if self.rules.exact.iter().any(|sig| sig == user_agent) {
            return true;
        }

        let lowered = user_agent.to_lowercase();
        if self
            .rules
            .substrings
            .iter()
            .any(|needle| lowered.contains(needle.as_str()))
        {
            return true;
        }

        user_agent.chars().count() < self.rules.min_length
    }

    /// Verdict from the upstream bot-management JSON header.
    /// Unparsable JSON carries no signal.
    pub fn is_bot_by_score(&self, bot_management: &str) -> bool {
        match serde_json::from_str::<BotManagement>(bot_management) {
            Ok(signal) => {
                signal.verified_bot == Some(true)
                    || signal
                        .score
                        .is_some_and(|score| score < self.rules.score_threshold)
            }
            Err(err) => {
                debug!(error = %err, "ignoring malformed bot management header");
                false
            }
        }
    }

    pub fn is_bot(&self, user_agent: Option<&str>, bot_management: Option<&str>) -> bool {
        if self.is_bot_user_agent(user_agent.unwrap_or_default()) {
            return true;
        }
        bot_management.is_some_and(|header| self.is_bot_by_score(header))
    }

    pub fn detect(&self, headers: &HeaderMap) -> bool {
        let user_agent = header_str(headers, "user-agent");
        let bot_management = header_str(headers, BOT_MANAGEMENT_HEADER);
        self.is_bot(user_agent, bot_management)
    }
}

/// Header value as text; non-UTF-8 values read as absent
pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

static DEFAULT_CLASSIFIER: LazyLock<BotClassifier> = LazyLock::new(BotClassifier::default);

/// Classify request headers with the built-in rules
pub fn detect_bot(headers: &HeaderMap) -> bool {
    DEFAULT_CLASSIFIER.detect(headers)
}
