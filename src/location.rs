//! Coarse location lookup for the PDF cover page.
//!
//! One `GET https://ipinfo.io` call, formatted as `"City, Region"`. The
//! lookup is best-effort only: the rest of the tool is local-first and a
//! missing or offline geolocation service must never fail the batch, so
//! every error path collapses to [`UNKNOWN_LOCATION`].

use serde::Deserialize;
use tracing::debug;

/// Placeholder used whenever the lookup fails or is disabled.
pub const UNKNOWN_LOCATION: &str = "Unknown Location";

const IPINFO_URL: &str = "https://ipinfo.io";

#[derive(Debug, Deserialize)]
struct IpInfo {
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    region: Option<String>,
}

/// Look up the caller's coarse location via ipinfo.io.
///
/// Returns `"City, Region"` on success and [`UNKNOWN_LOCATION`] on any
/// failure (no network, non-JSON answer, timeout).
pub async fn detect_location(client: &reqwest::Client) -> String {
    match fetch(client).await {
        Some(loc) => loc,
        None => {
            debug!("Location lookup failed; using placeholder");
            UNKNOWN_LOCATION.to_string()
        }
    }
}

async fn fetch(client: &reqwest::Client) -> Option<String> {
    let response = client
        .get(IPINFO_URL)
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .ok()?;

    if !response.status().is_success() {
        return None;
    }

    let info: IpInfo = response.json().await.ok()?;
    Some(format_location(info.city.as_deref(), info.region.as_deref()))
}

/// Join city and region, tolerating either being absent.
fn format_location(city: Option<&str>, region: Option<&str>) -> String {
    let city = city.unwrap_or("").trim();
    let region = region.unwrap_or("").trim();
    match (city.is_empty(), region.is_empty()) {
        (true, true) => UNKNOWN_LOCATION.to_string(),
        (false, true) => city.to_string(),
        (true, false) => region.to_string(),
        (false, false) => format!("{city}, {region}"),
    }
}
