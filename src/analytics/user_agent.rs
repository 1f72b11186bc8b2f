//! User-Agent parsing
//!
//! Each stage (device, browser/engine, OS, CPU) is an ordered rule table
//! evaluated first-match-wins. The tables are plain data held by
//! [`UserAgentRules`], so precedence can be inspected and tested per rule
//! without going through the full parser.
//!
//! Parsing is total: any input, including the empty string, yields a complete
//! [`ParsedUserAgent`] with `"unknown"` / empty / `None` fallbacks.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::analytics::bot::BotClassifier;

/// Coarse device class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    #[default]
    Desktop,
    Mobile,
    Tablet,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Desktop => "desktop",
            DeviceType::Mobile => "mobile",
            DeviceType::Tablet => "tablet",
        }
    }
}

/// Rendering engine family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Engine {
    Blink,
    WebKit,
    Gecko,
    Trident,
}

impl Engine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Engine::Blink => "Blink",
            Engine::WebKit => "WebKit",
            Engine::Gecko => "Gecko",
            Engine::Trident => "Trident",
        }
    }

    /// Version token consulted for this engine's version number
    fn version_pattern(&self) -> &'static Regex {
        match self {
            Engine::Blink | Engine::WebKit => &*WEBKIT_VERSION,
            Engine::Gecko => &*GECKO_VERSION,
            Engine::Trident => &*TRIDENT_VERSION,
        }
    }
}

/// Structured facts derived from a single User-Agent string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedUserAgent {
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
    pub is_bot: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DeviceInfo {
    pub device: DeviceType,
    pub vendor: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BrowserInfo {
    pub name: String,
    pub version: String,
    pub engine: Option<Engine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OsInfo {
    pub name: String,
    pub version: String,
}

/// One row of a decision table: if `pattern` matches (and `exclude` does not),
/// `build` produces the stage result.
pub struct Rule<T> {
    pub name: &'static str,
    pattern: Regex,
    exclude: Option<Regex>,
    build: fn(&str, &Captures<'_>) -> T,
}

impl<T> Rule<T> {
    fn new(name: &'static str, pattern: &str, build: fn(&str, &Captures<'_>) -> T) -> Self {
        Self {
            name,
            pattern: Regex::new(pattern).expect("user agent rule pattern must compile"),
            exclude: None,
            build,
        }
    }

    fn unless(mut self, exclude: &str) -> Self {
        self.exclude = Some(Regex::new(exclude).expect("user agent rule exclusion must compile"));
        self
    }

    /// Apply this rule alone, returning its result when it matches
    pub fn apply(&self, ua: &str) -> Option<T> {
        if self.exclude.as_ref().is_some_and(|re| re.is_match(ua)) {
            return None;
        }
        self.pattern.captures(ua).map(|caps| (self.build)(ua, &caps))
    }
}

/// Evaluate rules in order and return the first match
pub fn first_match<T>(rules: &[Rule<T>], ua: &str) -> Option<T> {
    rules.iter().find_map(|rule| rule.apply(ua))
}

/// Windows NT kernel version to marketing name
pub const WINDOWS_VERSIONS: &[(&str, &str)] = &[
    ("10.0", "10/11"),
    ("6.3", "8.1"),
    ("6.2", "8"),
    ("6.1", "7"),
    ("6.0", "Vista"),
    ("5.1", "XP"),
];

/// Android vendor detection: (vendor, match pattern, token stripped from the model)
const ANDROID_VENDORS: &[(&str, &str, &str)] = &[
    ("Samsung", r"(?i)samsung|\bSM-|\bGT-", r"(?i)samsung[\s_-]*"),
    ("Google", r"(?i)pixel|\bgoogle\b", r"(?i)google[\s_-]*"),
    ("OnePlus", r"(?i)oneplus", r"(?i)oneplus[\s_-]*"),
    ("Xiaomi", r"(?i)xiaomi|redmi|\bmi\s|poco", r"(?i)xiaomi[\s_-]*"),
    ("Huawei", r"(?i)huawei|honor", r"(?i)huawei[\s_-]*"),
];

static ANDROID_VENDOR_RULES: LazyLock<Vec<(&'static str, Regex, Regex)>> = LazyLock::new(|| {
    ANDROID_VENDORS
        .iter()
        .map(|(vendor, pattern, strip)| {
            (
                *vendor,
                Regex::new(pattern).expect("vendor pattern must compile"),
                Regex::new(strip).expect("vendor strip pattern must compile"),
            )
        })
        .collect()
});

static ANDROID_MODEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r";\s*([^;]*?)\s*Build/").expect("android model regex"));
static ANDROID_MOBILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)mobile").expect("android mobile regex"));
static SAFARI_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)version/([\d.]+)").expect("safari version regex"));
static WEBKIT_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)applewebkit/([\d.]+)").expect("webkit version regex"));
static GECKO_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)gecko/([\d.]+)").expect("gecko version regex"));
static TRIDENT_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)trident/([\d.]+)").expect("trident version regex"));

fn capture(caps: &Captures<'_>, index: usize) -> Option<String> {
    caps.get(index)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn android_device(ua: &str, _caps: &Captures<'_>) -> DeviceInfo {
    let device = if ANDROID_MOBILE.is_match(ua) {
        DeviceType::Mobile
    } else {
        DeviceType::Tablet
    };

    let Some(raw_model) = ANDROID_MODEL.captures(ua).and_then(|c| capture(&c, 1)) else {
        return DeviceInfo {
            device,
            ..Default::default()
        };
    };

    for (vendor, pattern, strip) in ANDROID_VENDOR_RULES.iter() {
        if pattern.is_match(&raw_model) {
            let model = strip.replace_all(&raw_model, "").trim().to_string();
            return DeviceInfo {
                device,
                vendor: Some((*vendor).to_string()),
                model: Some(model).filter(|m| !m.is_empty()),
            };
        }
    }

    DeviceInfo {
        device,
        vendor: None,
        model: Some(raw_model),
    }
}

fn apple(device: DeviceType, model: &str) -> DeviceInfo {
    DeviceInfo {
        device,
        vendor: Some("Apple".to_string()),
        model: Some(model.to_string()),
    }
}

fn default_device_rules() -> Vec<Rule<DeviceInfo>> {
    vec![
        Rule::new("iphone", r"(?i)iphone\s*(\d+)?", |_, caps| {
            let model = match capture(caps, 1) {
                Some(number) => format!("iPhone {number}"),
                None => "iPhone".to_string(),
            };
            apple(DeviceType::Mobile, &model)
        }),
        Rule::new("ipad", r"(?i)ipad", |_, _| apple(DeviceType::Tablet, "iPad")),
        Rule::new("android", r"(?i)android", android_device),
        Rule::new("ipod", r"(?i)ipod", |_, _| apple(DeviceType::Mobile, "iPod")),
        Rule::new("tablet", r"(?i)tablet|kindle|silk/|playbook", |_, _| DeviceInfo {
            device: DeviceType::Tablet,
            ..Default::default()
        }),
        Rule::new(
            "mobile",
            r"(?i)mobile|phone|blackberry|opera mini|iemobile",
            |_, _| DeviceInfo {
                device: DeviceType::Mobile,
                ..Default::default()
            },
        ),
        Rule::new("macos", r"(?i)macintosh|mac os x", |_, _| {
            apple(DeviceType::Desktop, "Mac")
        }),
        Rule::new("windows", r"(?i)windows", |_, _| DeviceInfo {
            device: DeviceType::Desktop,
            vendor: Some("Microsoft".to_string()),
            model: Some("PC".to_string()),
        }),
    ]
}

fn browser(name: &str, caps: &Captures<'_>, engine: Engine) -> BrowserInfo {
    BrowserInfo {
        name: name.to_string(),
        version: capture(caps, 1).unwrap_or_default(),
        engine: Some(engine),
    }
}

fn default_browser_rules() -> Vec<Rule<BrowserInfo>> {
    vec![
        Rule::new("edge", r"(?i)\b(?:edg|edge|edga|edgios)/([\d.]+)", |_, caps| {
            browser("Edge", caps, Engine::Blink)
        }),
        Rule::new("opera", r"(?i)\b(?:opr|opera)[/ ]([\d.]+)", |_, caps| {
            browser("Opera", caps, Engine::Blink)
        }),
        Rule::new("chrome", r"(?i)\b(?:chrome|crios)/([\d.]+)", |_, caps| {
            browser("Chrome", caps, Engine::Blink)
        })
        .unless(r"(?i)chromium"),
        Rule::new("safari", r"(?i)safari/", |ua, _| BrowserInfo {
            name: "Safari".to_string(),
            version: SAFARI_VERSION
                .captures(ua)
                .and_then(|c| capture(&c, 1))
                .unwrap_or_default(),
            engine: Some(Engine::WebKit),
        })
        .unless(r"(?i)chrome|crios|chromium"),
        Rule::new("firefox", r"(?i)\b(?:firefox|fxios)/([\d.]+)", |_, caps| {
            browser("Firefox", caps, Engine::Gecko)
        }),
        Rule::new("ie", r"(?i)(?:msie\s|trident/.*rv:)([\d.]+)", |_, caps| {
            browser("IE", caps, Engine::Trident)
        }),
        Rule::new("chromium", r"(?i)chromium/([\d.]+)", |_, caps| {
            browser("Chromium", caps, Engine::Blink)
        }),
    ]
}

fn os(name: &str, version: String) -> OsInfo {
    OsInfo {
        name: name.to_string(),
        version,
    }
}

/// Map a Windows NT number to its marketing name, passing unknown numbers through
pub fn windows_version_name(nt_version: &str) -> String {
    WINDOWS_VERSIONS
        .iter()
        .find(|(nt, _)| *nt == nt_version)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| nt_version.to_string())
}

fn dotted(caps: &Captures<'_>) -> String {
    capture(caps, 1)
        .map(|v| v.replace('_', "."))
        .unwrap_or_default()
}

fn default_os_rules() -> Vec<Rule<OsInfo>> {
    vec![
        Rule::new("windows-nt", r"(?i)windows nt ([\d.]+)", |_, caps| {
            os(
                "Windows",
                capture(caps, 1)
                    .map(|v| windows_version_name(&v))
                    .unwrap_or_default(),
            )
        }),
        Rule::new("windows", r"(?i)windows", |_, _| os("Windows", String::new())),
        // iOS must precede macOS: iOS agents carry "like Mac OS X"
        Rule::new("ios", r"(?i)(?:iphone os|cpu os) ([\d_]+)", |_, caps| {
            os("iOS", dotted(caps))
        }),
        Rule::new("ios-bare", r"(?i)iphone|ipad|ipod", |_, _| os("iOS", String::new())),
        Rule::new("macos", r"(?i)mac os x ([\d_.]+)", |_, caps| os("macOS", dotted(caps))),
        Rule::new("macos-bare", r"(?i)macintosh|mac os x", |_, _| {
            os("macOS", String::new())
        }),
        Rule::new("android", r"(?i)android[\s/]*([\d.]+)?", |_, caps| {
            os("Android", capture(caps, 1).unwrap_or_default())
        }),
        Rule::new("chromeos", r"(?i)\bcros\s+\S+\s+([\d.]+)?", |_, caps| {
            os("ChromeOS", capture(caps, 1).unwrap_or_default())
        }),
        Rule::new("ubuntu", r"(?i)ubuntu(?:/([\d.]+))?", |_, caps| {
            os("Ubuntu", capture(caps, 1).unwrap_or_default())
        }),
        Rule::new("fedora", r"(?i)fedora(?:/([\d.\-]+))?", |_, caps| {
            os("Fedora", capture(caps, 1).unwrap_or_default())
        }),
        Rule::new("linux", r"(?i)linux", |_, _| os("Linux", String::new())),
    ]
}

fn default_cpu_rules() -> Vec<Rule<&'static str>> {
    vec![
        Rule::new("amd64", r"(?i)x86_64|x86-64|\bx64\b|amd64|win64|wow64", |_, _| "amd64"),
        Rule::new("arm64", r"(?i)arm64|aarch64", |_, _| "arm64"),
        Rule::new("arm", r"(?i)\barm", |_, _| "arm"),
        Rule::new("x86", r"(?i)i[3-6]86|\bx86\b|win32", |_, _| "x86"),
    ]
}

/// Ordered rule tables driving [`UserAgentParser`]
pub struct UserAgentRules {
    pub device: Vec<Rule<DeviceInfo>>,
    pub browser: Vec<Rule<BrowserInfo>>,
    pub os: Vec<Rule<OsInfo>>,
    pub cpu: Vec<Rule<&'static str>>,
}

impl Default for UserAgentRules {
    fn default() -> Self {
        Self {
            device: default_device_rules(),
            browser: default_browser_rules(),
            os: default_os_rules(),
            cpu: default_cpu_rules(),
        }
    }
}

pub struct UserAgentParser {
    rules: UserAgentRules,
    bots: BotClassifier,
}

impl Default for UserAgentParser {
    fn default() -> Self {
        Self::new(UserAgentRules::default(), BotClassifier::default())
    }
}

impl UserAgentParser {
    pub fn new(rules: UserAgentRules, bots: BotClassifier) -> Self {
        Self { rules, bots }
    }

    pub fn rules(&self) -> &UserAgentRules {
        &self.rules
    }

    pub fn parse(&self, ua: &str) -> ParsedUserAgent {
        let device = first_match(&self.rules.device, ua).unwrap_or_default();

        let browser = first_match(&self.rules.browser, ua).unwrap_or(BrowserInfo {
            name: "unknown".to_string(),
            version: String::new(),
            engine: None,
        });

        let engine_version = browser.engine.and_then(|engine| {
            engine
                .version_pattern()
                .captures(ua)
                .and_then(|c| capture(&c, 1))
        });

        let os = first_match(&self.rules.os, ua).unwrap_or(OsInfo {
            name: "unknown".to_string(),
            version: String::new(),
        });

        let cpu_architecture = first_match(&self.rules.cpu, ua).map(str::to_string);

        ParsedUserAgent {
            device: device.device,
            device_vendor: device.vendor,
            device_model: device.model,
            browser: browser.name,
            browser_version: browser.version,
            engine: browser.engine.map(|e| e.as_str().to_string()),
            engine_version,
            os: os.name,
            os_version: os.version,
            cpu_architecture,
            is_bot: self.bots.is_bot_user_agent(ua),
        }
    }
}

static DEFAULT_PARSER: LazyLock<UserAgentParser> = LazyLock::new(UserAgentParser::default);

/// Parse with the built-in rule tables
pub fn parse_user_agent(ua: &str) -> ParsedUserAgent {
    DEFAULT_PARSER.parse(ua)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CHROME_WINDOWS: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
    const SAFARI_IPHONE: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 17_1_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1.2 Mobile/15E148 Safari/604.1";
    const SAMSUNG_ANDROID: &str = "Mozilla/5.0 (Linux; Android 13; SAMSUNG SM-S911B Build/TP1A.220624.014) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/116.0.0.0 Mobile Safari/537.36";
    const FIREFOX_UBUNTU: &str = "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";
    const EDGE_MAC: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.2210.91";

    #[test]
    fn test_parse_chrome_on_windows() {
        let parsed = parse_user_agent(CHROME_WINDOWS);
        assert_eq!(parsed.device, DeviceType::Desktop);
        assert_eq!(parsed.device_vendor.as_deref(), Some("Microsoft"));
        assert_eq!(parsed.device_model.as_deref(), Some("PC"));
        assert_eq!(parsed.browser, "Chrome");
        assert_eq!(parsed.browser_version, "120.0.0.0");
        assert_eq!(parsed.engine.as_deref(), Some("Blink"));
        assert_eq!(parsed.engine_version.as_deref(), Some("537.36"));
        assert_eq!(parsed.os, "Windows");
        assert_eq!(parsed.os_version, "10/11");
        assert_eq!(parsed.cpu_architecture.as_deref(), Some("amd64"));
        assert!(!parsed.is_bot);
    }

    #[test]
    fn test_parse_safari_on_iphone() {
        let parsed = parse_user_agent(SAFARI_IPHONE);
        assert_eq!(parsed.device, DeviceType::Mobile);
        assert_eq!(parsed.device_vendor.as_deref(), Some("Apple"));
        assert_eq!(parsed.device_model.as_deref(), Some("iPhone"));
        assert_eq!(parsed.browser, "Safari");
        assert_eq!(parsed.browser_version, "17.1.2");
        assert_eq!(parsed.engine.as_deref(), Some("WebKit"));
        assert_eq!(parsed.os, "iOS");
        assert_eq!(parsed.os_version, "17.1.2");
    }

    #[test]
    fn test_parse_samsung_android_strips_vendor_token() {
        let parsed = parse_user_agent(SAMSUNG_ANDROID);
        assert_eq!(parsed.device, DeviceType::Mobile);
        assert_eq!(parsed.device_vendor.as_deref(), Some("Samsung"));
        assert_eq!(parsed.device_model.as_deref(), Some("SM-S911B"));
        assert_eq!(parsed.browser, "Chrome");
        assert_eq!(parsed.os, "Android");
        assert_eq!(parsed.os_version, "13");
    }

    #[test]
    fn test_unknown_android_vendor_keeps_raw_model() {
        let ua = "Mozilla/5.0 (Linux; Android 12; Nokia G20 Build/SP1A.210812.016) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/114.0.0.0 Mobile Safari/537.36";
        let parsed = parse_user_agent(ua);
        assert_eq!(parsed.device_vendor, None);
        assert_eq!(parsed.device_model.as_deref(), Some("Nokia G20"));
    }

    #[test]
    fn test_android_without_mobile_is_tablet() {
        let ua = "Mozilla/5.0 (Linux; Android 11; Lenovo TB-X606F Build/RP1A) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/110.0.0.0 Safari/537.36";
        assert_eq!(parse_user_agent(ua).device, DeviceType::Tablet);
    }

    #[test]
    fn test_parse_firefox_on_ubuntu() {
        let parsed = parse_user_agent(FIREFOX_UBUNTU);
        assert_eq!(parsed.browser, "Firefox");
        assert_eq!(parsed.browser_version, "121.0");
        assert_eq!(parsed.engine.as_deref(), Some("Gecko"));
        assert_eq!(parsed.engine_version.as_deref(), Some("20100101"));
        assert_eq!(parsed.os, "Ubuntu");
        assert_eq!(parsed.device, DeviceType::Desktop);
        assert_eq!(parsed.cpu_architecture.as_deref(), Some("amd64"));
    }

    #[test]
    fn test_edge_wins_over_chrome() {
        let parsed = parse_user_agent(EDGE_MAC);
        assert_eq!(parsed.browser, "Edge");
        assert_eq!(parsed.browser_version, "120.0.2210.91");
        assert_eq!(parsed.os, "macOS");
        assert_eq!(parsed.os_version, "10.15.7");
        assert_eq!(parsed.device_model.as_deref(), Some("Mac"));
    }

    #[test]
    fn test_internet_explorer_via_trident() {
        let ua = "Mozilla/5.0 (Windows NT 6.1; WOW64; Trident/7.0; rv:11.0) like Gecko";
        let parsed = parse_user_agent(ua);
        assert_eq!(parsed.browser, "IE");
        assert_eq!(parsed.browser_version, "11.0");
        assert_eq!(parsed.engine.as_deref(), Some("Trident"));
        assert_eq!(parsed.engine_version.as_deref(), Some("7.0"));
        assert_eq!(parsed.os_version, "7");
    }

    #[test]
    fn test_windows_version_table_passthrough() {
        assert_eq!(windows_version_name("6.3"), "8.1");
        assert_eq!(windows_version_name("5.1"), "XP");
        assert_eq!(windows_version_name("4.0"), "4.0");
    }

    #[test]
    fn test_chrome_rule_excludes_chromium() {
        let rules = UserAgentRules::default();
        let chrome = rules.browser.iter().find(|r| r.name == "chrome").unwrap();
        assert!(chrome
            .apply("Mozilla/5.0 (X11; Linux) Chromium/119.0 Chrome/119.0 Safari/537.36")
            .is_none());
        let parsed = parse_user_agent("Mozilla/5.0 (X11; Linux i686) Chromium/119.0.6045.0");
        assert_eq!(parsed.browser, "Chromium");
        assert_eq!(parsed.cpu_architecture.as_deref(), Some("x86"));
    }

    #[test]
    fn test_empty_and_garbage_input_is_total() {
        for ua in ["", "   ", ";;;Build/", "\u{0}\u{ffff}", "(((((((((("] {
            let parsed = parse_user_agent(ua);
            assert_eq!(parsed.device, DeviceType::Desktop);
            assert_eq!(parsed.browser, "unknown");
            assert_eq!(parsed.os, "unknown");
            assert_eq!(parsed.browser_version, "");
            assert!(parsed.engine.is_none());
        }
        assert!(parse_user_agent("").is_bot);
    }

    #[test]
    fn test_cpu_arm_variants() {
        assert_eq!(
            parse_user_agent("Mozilla/5.0 (X11; Linux aarch64)").cpu_architecture.as_deref(),
            Some("arm64")
        );
        assert_eq!(
            parse_user_agent("Mozilla/5.0 (X11; Linux armv7l)").cpu_architecture.as_deref(),
            Some("arm")
        );
    }

    #[test]
    fn test_opera_rule_precedes_chrome() {
        let ua = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 OPR/106.0.0.0";
        let rules = UserAgentRules::default();
        let opera = rules.browser.iter().find(|r| r.name == "opera").unwrap();
        let chrome = rules.browser.iter().find(|r| r.name == "chrome").unwrap();
        assert_eq!(opera.apply(ua).unwrap().version, "106.0.0.0");
        assert!(chrome.apply(ua).is_some());

        let parsed = parse_user_agent(ua);
        assert_eq!(parsed.browser, "Opera");
        assert_eq!(parsed.browser_version, "106.0.0.0");
        assert_eq!(parsed.engine.as_deref(), Some("Blink"));
    }

    #[test]
    fn test_chromeos_rule() {
        let ua = "Mozilla/5.0 (X11; CrOS x86_64 14541.0.0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36";
        let parsed = parse_user_agent(ua);
        assert_eq!(parsed.os, "ChromeOS");
        assert_eq!(parsed.os_version, "14541.0.0");
        assert_eq!(parsed.device, DeviceType::Desktop);
        assert_eq!(parsed.cpu_architecture.as_deref(), Some("amd64"));
    }

    #[test]
    fn test_fedora_rule() {
        let ua = "Mozilla/5.0 (X11; Fedora; Linux x86_64; rv:120.0) Gecko/20100101 Firefox/120.0";
        let rules = UserAgentRules::default();
        let fedora = rules.os.iter().find(|r| r.name == "fedora").unwrap();
        assert_eq!(fedora.apply(ua).unwrap().name, "Fedora");

        let parsed = parse_user_agent(ua);
        assert_eq!(parsed.os, "Fedora");
        assert_eq!(parsed.os_version, "");
        assert_eq!(parsed.browser, "Firefox");
    }

    #[test]
    fn test_ipad_rule() {
        let ua = "Mozilla/5.0 (iPad; CPU OS 16_6 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.6 Mobile/15E148 Safari/604.1";
        let parsed = parse_user_agent(ua);
        assert_eq!(parsed.device, DeviceType::Tablet);
        assert_eq!(parsed.device_vendor.as_deref(), Some("Apple"));
        assert_eq!(parsed.device_model.as_deref(), Some("iPad"));
        assert_eq!(parsed.os, "iOS");
        assert_eq!(parsed.os_version, "16.6");
    }

    #[test]
    fn test_ipod_rule() {
        let ua = "Mozilla/5.0 (iPod; CPU OS 12_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Mobile/15E148";
        let parsed = parse_user_agent(ua);
        assert_eq!(parsed.device, DeviceType::Mobile);
        assert_eq!(parsed.device_model.as_deref(), Some("iPod"));
        assert_eq!(parsed.os, "iOS");
    }

    #[test]
    fn test_numbered_iphone_model() {
        let ua = "Mozilla/5.0 (iPhone14,2; U; CPU iPhone OS 15_0 like Mac OS X) AppleWebKit/602.1.50 (KHTML, like Gecko) Version/10.0 Mobile/19A346 Safari/602.1";
        let parsed = parse_user_agent(ua);
        assert_eq!(parsed.device, DeviceType::Mobile);
        assert_eq!(parsed.device_model.as_deref(), Some("iPhone 14"));
        assert_eq!(parsed.os_version, "15.0");
    }

    fn android_with_model(model: &str) -> String {
        format!(
            "Mozilla/5.0 (Linux; Android 14; {model} Build/UD1A.230803.041) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36"
        )
    }

    #[test]
    fn test_android_vendor_rows() {
        let cases = [
            ("Pixel 8 Pro", "Google", "Pixel 8 Pro"),
            ("Google Pixel 7", "Google", "Pixel 7"),
            ("ONEPLUS A6013", "OnePlus", "A6013"),
            ("Xiaomi 13", "Xiaomi", "13"),
            ("Redmi Note 12", "Xiaomi", "Redmi Note 12"),
            ("HUAWEI P30 Pro", "Huawei", "P30 Pro"),
        ];
        for (model, vendor, expected) in cases {
            let parsed = parse_user_agent(&android_with_model(model));
            assert_eq!(parsed.device, DeviceType::Mobile, "{model}");
            assert_eq!(parsed.device_vendor.as_deref(), Some(vendor), "{model}");
            assert_eq!(parsed.device_model.as_deref(), Some(expected), "{model}");
        }
    }

    #[test]
    fn test_windows_nt_rows() {
        assert_eq!(windows_version_name("10.0"), "10/11");
        assert_eq!(windows_version_name("6.2"), "8");
        assert_eq!(windows_version_name("6.0"), "Vista");

        for (nt, name) in [("6.2", "8"), ("6.0", "Vista"), ("10.0", "10/11")] {
            let parsed = parse_user_agent(&format!("Mozilla/5.0 (Windows NT {nt}; Win64; x64)"));
            assert_eq!(parsed.os, "Windows");
            assert_eq!(parsed.os_version, name, "NT {nt}");
        }
    }
}
