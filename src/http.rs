//! HTTP client for fetching activities from a Strava-compatible API.
//!
//! Pages through the athlete's activity list with a ready bearer token and
//! decodes each activity's summary polyline into geographic coordinates.
//! Token acquisition and refresh are the caller's concern; this module only
//! consumes an access token. Transient failures and 429 responses are
//! retried with exponential backoff, other non-success statuses surface as
//! [`StreetMatchError::HttpError`]. The geometric core never retries.

use std::time::Duration;

use log::{debug, info, warn};
use reqwest::Client;
use serde::Deserialize;

use crate::geo_utils::LocalProjection;
use crate::{Result, StreetMatchError, Track};

const DEFAULT_BASE_URL: &str = "https://www.strava.com/api/v3";
const PER_PAGE: usize = 100;
const MAX_RETRIES: u32 = 3;

/// One fetched activity, decoded to geographic (lng, lat) coordinates.
#[derive(Debug, Clone)]
pub struct RawActivity {
    pub id: String,
    pub activity_type: String,
    /// Geographic (lng, lat) pairs decoded from the summary polyline
    pub coords: Vec<(f64, f64)>,
}

impl RawActivity {
    /// Project into the local CRS as a [`Track`].
    pub fn to_track(&self, projection: &LocalProjection) -> Result<Track> {
        Track::new(
            self.id.clone(),
            self.activity_type.clone(),
            projection.project_line(&self.coords),
        )
    }
}

/// Activity list entry as returned by the API.
#[derive(Debug, Deserialize)]
struct ApiActivity {
    id: i64,
    #[serde(rename = "type")]
    activity_type: String,
    map: Option<ApiMap>,
}

#[derive(Debug, Deserialize)]
struct ApiMap {
    summary_polyline: Option<String>,
}

/// Paginated activity fetcher.
pub struct ActivityFetcher {
    client: Client,
    base_url: String,
    auth_header: String,
}

impl ActivityFetcher {
    /// Create a fetcher against the default API with the given access token.
    pub fn new(access_token: &str) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, access_token)
    }

    /// Create a fetcher against a custom base URL (used by tests).
    pub fn with_base_url(base_url: &str, access_token: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| StreetMatchError::HttpError {
                message: format!("failed to create HTTP client: {}", e),
                status_code: None,
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header: format!("Bearer {}", access_token),
        })
    }

    /// Fetch the athlete's complete activity list.
    ///
    /// Pages of `PER_PAGE` until a short page is returned. Activities with no
    /// summary polyline (e.g. indoor workouts) are skipped.
    pub async fn fetch_activities(&self) -> Result<Vec<RawActivity>> {
        let mut activities = Vec::new();
        let mut page = 1u32;

        loop {
            let batch = self.fetch_page(page).await?;
            let batch_len = batch.len();
            debug!("[ActivityFetcher] Page {} returned {} activities", page, batch_len);

            for activity in batch {
                let Some(encoded) = activity
                    .map
                    .as_ref()
                    .and_then(|m| m.summary_polyline.as_deref())
                    .filter(|p| !p.is_empty())
                else {
                    debug!(
                        "[ActivityFetcher] Activity {} has no polyline, skipping",
                        activity.id
                    );
                    continue;
                };

                match decode_summary(encoded) {
                    Ok(coords) => activities.push(RawActivity {
                        id: activity.id.to_string(),
                        activity_type: activity.activity_type,
                        coords,
                    }),
                    Err(e) => {
                        warn!(
                            "[ActivityFetcher] Failed to decode polyline for {}: {}",
                            activity.id, e
                        );
                    }
                }
            }

            if batch_len < PER_PAGE {
                break;
            }
            page += 1;
        }

        info!(
            "[ActivityFetcher] Fetched {} activities across {} pages",
            activities.len(),
            page
        );
        Ok(activities)
    }

    async fn fetch_page(&self, page: u32) -> Result<Vec<ApiActivity>> {
        let url = format!("{}/athlete/activities", self.base_url);
        let mut retries = 0;

        loop {
            let response = self
                .client
                .get(&url)
                .header("Authorization", &self.auth_header)
                .query(&[("per_page", PER_PAGE as u32), ("page", page)])
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS
                        || status.is_server_error()
                    {
                        retries += 1;
                        if retries > MAX_RETRIES {
                            return Err(StreetMatchError::HttpError {
                                message: format!("max retries exceeded fetching page {}", page),
                                status_code: Some(status.as_u16()),
                            });
                        }
                        let backoff = Duration::from_millis(500 * (1 << retries));
                        warn!(
                            "[ActivityFetcher] {} on page {}, retry {} after {:?}",
                            status, page, retries, backoff
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }

                    if !status.is_success() {
                        return Err(StreetMatchError::HttpError {
                            message: format!("activities fetch failed for page {}", page),
                            status_code: Some(status.as_u16()),
                        });
                    }

                    return resp.json::<Vec<ApiActivity>>().await.map_err(|e| {
                        StreetMatchError::HttpError {
                            message: format!("parse error on page {}: {}", page, e),
                            status_code: None,
                        }
                    });
                }
                Err(e) => {
                    retries += 1;
                    if retries > MAX_RETRIES {
                        return Err(StreetMatchError::HttpError {
                            message: format!("request error on page {}: {}", page, e),
                            status_code: None,
                        });
                    }
                    let backoff = Duration::from_millis(500 * (1 << retries));
                    warn!(
                        "[ActivityFetcher] Error on page {}: {}, retry {} after {:?}",
                        page, e, retries, backoff
                    );
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }
}

/// Decode an encoded summary polyline into geographic (lng, lat) pairs.
fn decode_summary(encoded: &str) -> Result<Vec<(f64, f64)>> {
    let line = polyline::decode_polyline(encoded, 5).map_err(|e| StreetMatchError::HttpError {
        message: format!("polyline decode failed: {}", e),
        status_code: None,
    })?;
    Ok(line.0.into_iter().map(|c| (c.x, c.y)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_summary_lng_lat_order() {
        // Reference polyline: (38.5, -120.2), (40.7, -120.95), (43.252, -126.453)
        let coords = decode_summary("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
        assert_eq!(coords.len(), 3);
        assert!((coords[0].0 - -120.2).abs() < 1e-5);
        assert!((coords[0].1 - 38.5).abs() < 1e-5);
    }

    #[test]
    fn test_decode_summary_rejects_garbage() {
        assert!(decode_summary("\u{1}\u{2}").is_err());
    }

    #[test]
    fn test_api_activity_deserialization() {
        let json = r#"{
            "id": 1234567890,
            "type": "Run",
            "map": {"summary_polyline": "_p~iF~ps|U"}
        }"#;
        let activity: ApiActivity = serde_json::from_str(json).unwrap();
        assert_eq!(activity.id, 1234567890);
        assert_eq!(activity.activity_type, "Run");
        assert!(activity.map.unwrap().summary_polyline.is_some());
    }

    #[tokio::test]
    async fn test_unreachable_host_surfaces_http_error() {
        // Nothing listens on this port; the request errors out after retries.
        let fetcher = ActivityFetcher::with_base_url("http://127.0.0.1:9", "token").unwrap();
        let result = fetcher.fetch_activities().await;
        assert!(matches!(
            result,
            Err(StreetMatchError::HttpError { .. })
        ));
    }

    #[test]
    fn test_raw_activity_to_track() {
        let raw = RawActivity {
            id: "42".to_string(),
            activity_type: "Ride".to_string(),
            coords: vec![(-71.10, 42.39), (-71.099, 42.39)],
        };
        let projection = LocalProjection::new(42.39, -71.10);
        let track = raw.to_track(&projection).unwrap();
        assert_eq!(track.id, "42");
        assert_eq!(track.line.0.len(), 2);
    }
}
