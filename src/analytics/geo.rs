//! Request geolocation
//!
//! Edge metadata arrives as Cloudflare visitor-location headers. When those
//! carry no country, an optional MaxMind City database fills the gaps.
//! Every field is optional and a missing or malformed value reads as `None`.

use anyhow::{Context, Result};
use axum::http::HeaderMap;
use maxminddb::{geoip2, Mmap, Reader};
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;

use crate::analytics::bot::header_str;

/// Geographic and network facts about the requesting client
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeGeo {
    pub continent: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
    pub postal_code: Option<String>,
    /// Edge data-center code serving the request
    pub colo: Option<String>,
}

fn text(headers: &HeaderMap, name: &str) -> Option<String> {
    header_str(headers, name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn coordinate(headers: &HeaderMap, name: &str) -> Option<f64> {
    header_str(headers, name)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

impl EdgeGeo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        // "XX" and "T1" are Cloudflare's unknown / Tor markers
        let country =
            text(headers, "cf-ipcountry").filter(|c| !matches!(c.as_str(), "XX" | "T1"));

        // cf-ray is "<ray id>-<COLO>"
        let colo = header_str(headers, "cf-ray")
            .and_then(|ray| ray.rsplit_once('-'))
            .map(|(_, colo)| colo.trim().to_string())
            .filter(|c| !c.is_empty());

        Self {
            continent: text(headers, "cf-ipcontinent"),
            country,
            region: text(headers, "cf-region"),
            city: text(headers, "cf-ipcity"),
            latitude: coordinate(headers, "cf-iplatitude"),
            longitude: coordinate(headers, "cf-iplongitude"),
            timezone: text(headers, "cf-timezone"),
            postal_code: text(headers, "cf-postal-code"),
            colo,
        }
    }

    /// Fill unset location fields from `other`, leaving `colo` untouched
    pub fn fill_from(&mut self, other: EdgeGeo) {
        self.continent = self.continent.take().or(other.continent);
        self.country = self.country.take().or(other.country);
        self.region = self.region.take().or(other.region);
        self.city = self.city.take().or(other.city);
        self.latitude = self.latitude.or(other.latitude);
        self.longitude = self.longitude.or(other.longitude);
        self.timezone = self.timezone.take().or(other.timezone);
        self.postal_code = self.postal_code.take().or(other.postal_code);
    }
}

/// GeoIP fallback backed by a memory-mapped MaxMind City database
#[derive(Clone)]
pub struct GeoIpService {
    city_reader: Arc<Reader<Mmap>>,
}

impl GeoIpService {
    pub fn new(city_path: &str) -> Result<Self> {
        let reader = unsafe { Reader::open_mmap(city_path) }
            .with_context(|| format!("Failed to open GeoIP City database at {}", city_path))?;
        Ok(Self {
            city_reader: Arc::new(reader),
        })
    }

    pub fn lookup(&self, ip: IpAddr) -> EdgeGeo {
        let mut geo = EdgeGeo::default();

        if let Ok(result) = self.city_reader.lookup(ip) {
            if let Ok(Some(city)) = result.decode::<geoip2::City>() {
                geo.continent = city.continent.code.map(|s| s.to_string());
                geo.country = city.country.iso_code.map(|s| s.to_string());
                geo.region = city
                    .subdivisions
                    .first()
                    .and_then(|s| s.names.english)
                    .map(|s| s.to_string());
                geo.city = city.city.names.english.map(|s| s.to_string());
                geo.latitude = city.location.latitude;
                geo.longitude = city.location.longitude;
                geo.timezone = city.location.time_zone.map(|s| s.to_string());
                geo.postal_code = city.postal.code.map(|s| s.to_string());
            }
        }

        geo
    }
}

/// Edge headers first, GeoIP only when the edge supplied no country
pub fn resolve_geo(
    headers: &HeaderMap,
    client_ip: Option<IpAddr>,
    geoip: Option<&GeoIpService>,
) -> EdgeGeo {
    let mut geo = EdgeGeo::from_headers(headers);
    if geo.country.is_none() {
        if let (Some(service), Some(ip)) = (geoip, client_ip) {
            geo.fill_from(service.lookup(ip));
        }
    }
    geo
}
