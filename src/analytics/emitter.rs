//! Columnar analytics records
//!
//! The sink schema is positional and fixed: 20 string columns, 6 numeric
//! columns and a single index. Unknown values are written as `""` or `0`,
//! never omitted.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::analytics::metadata::{truncate_chars, ClickMetadata};
use crate::analytics::sink::AnalyticsSink;

pub const BLOB_COLUMNS: usize = 20;
pub const DOUBLE_COLUMNS: usize = 6;
pub const MAX_DESTINATION_LEN: usize = 500;

/// One row for the analytics sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    pub blobs: Vec<String>,
    pub doubles: Vec<f64>,
    pub indexes: Vec<String>,
}

impl DataPoint {
    pub fn link_id(&self) -> &str {
        self.indexes.first().map(String::as_str).unwrap_or_default()
    }

    pub fn timestamp_ms(&self) -> i64 {
        self.doubles.first().copied().unwrap_or_default() as i64
    }
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Map a click onto the sink's column order
pub fn to_data_point(click: &ClickMetadata) -> DataPoint {
    let blobs = vec![
        click.link_id.clone(),
        click.slug.clone(),
        click.domain.clone(),
        truncate_chars(&click.destination_url, MAX_DESTINATION_LEN),
        opt(&click.country),
        opt(&click.city),
        opt(&click.region),
        click.device.as_str().to_string(),
        click.browser.clone(),
        click.os.clone(),
        click.referrer_domain.clone(),
        click.trigger.as_str().to_string(),
        opt(&click.ab_variant),
        opt(&click.continent),
        opt(&click.device_vendor),
        opt(&click.engine),
        opt(&click.identity_hash),
        opt(&click.user_id),
        opt(&click.organization_id),
        click.click_id.clone(),
    ];

    let doubles = vec![
        click.timestamp.timestamp_millis() as f64,
        click.longitude.unwrap_or(0.0),
        click.latitude.unwrap_or(0.0),
        flag(click.is_bot),
        flag(click.is_qr),
        flag(click.is_unique),
    ];

    DataPoint {
        blobs,
        doubles,
        indexes: vec![click.link_id.clone()],
    }
}

/// Writes click records to a sink. Fire and forget: no result, no retry.
#[derive(Clone)]
pub struct AnalyticsEmitter {
    sink: Arc<dyn AnalyticsSink>,
}

impl AnalyticsEmitter {
    pub fn new(sink: Arc<dyn AnalyticsSink>) -> Self {
        Self { sink }
    }

    pub fn emit(&self, click: &ClickMetadata) {
        self.sink.write_data_point(to_data_point(click));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::geo::EdgeGeo;
    use crate::analytics::metadata::{ClickContext, ClickMetadataAssembler, RequestSignals};
    use crate::analytics::sink::MemorySink;

    fn click() -> ClickMetadata {
        let link = ClickContext {
            link_id: "lnk_42".to_string(),
            domain: "go2.gg".to_string(),
            slug: "launch".to_string(),
            destination_url: format!("https://d.example/{}", "a".repeat(600)),
            ab_variant: Some("control".to_string()),
            ..Default::default()
        };
        let request = RequestSignals {
            user_agent: Some("curl/8.4.0".to_string()),
            client_ip: Some("198.51.100.4".to_string()),
            geo: EdgeGeo {
                country: Some("GB".to_string()),
                latitude: Some(51.5),
                ..Default::default()
            },
            ..Default::default()
        };
        ClickMetadataAssembler::default().assemble(&link, &request, true)
    }

    #[test]
    fn test_column_layout() {
        let click = click();
        let point = to_data_point(&click);

        assert_eq!(point.blobs.len(), BLOB_COLUMNS);
        assert_eq!(point.doubles.len(), DOUBLE_COLUMNS);
        assert_eq!(point.indexes, vec!["lnk_42".to_string()]);

        assert_eq!(point.blobs[0], "lnk_42");
        assert_eq!(point.blobs[1], "launch");
        assert_eq!(point.blobs[2], "go2.gg");
        assert_eq!(point.blobs[3].chars().count(), MAX_DESTINATION_LEN);
        assert_eq!(point.blobs[4], "GB");
        assert_eq!(point.blobs[5], "");
        assert_eq!(point.blobs[7], "desktop");
        assert_eq!(point.blobs[10], "(direct)");
        assert_eq!(point.blobs[11], "link");
        assert_eq!(point.blobs[12], "control");
        assert_eq!(point.blobs[16], click.identity_hash.clone().unwrap());
        assert_eq!(point.blobs[17], "");
        assert_eq!(point.blobs[19], click.click_id);

        assert_eq!(point.doubles[0], click.timestamp.timestamp_millis() as f64);
        assert_eq!(point.doubles[1], 0.0);
        assert_eq!(point.doubles[2], 51.5);
        assert_eq!(point.doubles[3], 1.0);
        assert_eq!(point.doubles[4], 0.0);
        assert_eq!(point.doubles[5], 1.0);
        assert_eq!(point.timestamp_ms(), click.timestamp.timestamp_millis());
    }

    #[test]
    fn test_emit_writes_once() {
        let sink = Arc::new(MemorySink::default());
        let emitter = AnalyticsEmitter::new(sink.clone());
        emitter.emit(&click());
        let points = sink.points();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].link_id(), "lnk_42");
    }
}
