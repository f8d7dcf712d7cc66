use crate::http::get_with_retry;
use crate::point_data::error::PointDataError;
use crate::types::location::Location;
use crate::types::ordinal_date::DateRange;
use crate::utils::{float_repr, round_decimals};
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const DAILY_POINT_PATH: &str = "/api/temporal/daily/point";

/// Error body returned by the point API alongside a 4xx/5xx status.
#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    header: Option<String>,
    #[serde(default)]
    messages: Vec<String>,
}

/// A persistent session against the NASA POWER daily point endpoint.
///
/// Each fetch worker owns one, so connections are reused across the points it handles.
pub struct PowerClient {
    client: Client,
    endpoint: String,
    connect_retries: u32,
}

impl PowerClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        connect_retries: u32,
    ) -> Result<Self, PointDataError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PointDataError::ClientBuild)?;
        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), DAILY_POINT_PATH),
            connect_retries,
        })
    }

    /// Query parameters for one point; coordinates are rounded to 4 decimals.
    pub fn query_for(point: &Location, range: &DateRange) -> Vec<(&'static str, String)> {
        vec![
            ("parameters", "T2M".to_string()),
            ("community", "AG".to_string()),
            ("longitude", float_repr(round_decimals(point.point_longitude, 4))),
            ("latitude", float_repr(round_decimals(point.point_latitude, 4))),
            ("start", range.start_param()),
            ("end", range.end_param()),
            ("format", "ICASA".to_string()),
        ]
    }

    /// Downloads the raw ICASA document for one point.
    pub async fn daily_point(
        &self,
        point: &Location,
        range: &DateRange,
    ) -> Result<String, PointDataError> {
        let query = Self::query_for(point, range);
        debug!("GET {} {:?}", self.endpoint, query);

        let response = get_with_retry(&self.client, &self.endpoint, &query, self.connect_retries)
            .await
            .map_err(|e| PointDataError::NetworkRequest(self.endpoint.clone(), e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = describe_error_body(&body);
            warn!(
                "Point {} rejected by {} with status {}: {}",
                point.external_point_id, self.endpoint, status, detail
            );
            return Err(PointDataError::HttpStatus {
                url: self.endpoint.clone(),
                status,
                detail,
            });
        }

        response
            .text()
            .await
            .map_err(|e| PointDataError::NetworkRequest(self.endpoint.clone(), e))
    }
}

fn describe_error_body(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.messages.is_empty() => parsed.messages.join("; "),
        Ok(ApiErrorBody {
            header: Some(header),
            ..
        }) => header,
        _ => body.chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn point() -> Location {
        Location {
            id: 1,
            external_point_id: 100,
            latitude: 10.5,
            longitude: -84.2,
            point_latitude: 10.250049,
            point_longitude: -84.0,
        }
    }

    #[test]
    fn test_query_rounds_coordinates() {
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2023, 1, 31).unwrap(),
        )
        .unwrap();
        let query = PowerClient::query_for(&point(), &range);
        assert!(query.contains(&("latitude", "10.25".to_string())));
        assert!(query.contains(&("longitude", "-84.0".to_string())));
        assert!(query.contains(&("start", "20230101".to_string())));
        assert!(query.contains(&("format", "ICASA".to_string())));
    }

    #[test]
    fn test_error_body_messages_are_extracted() {
        let body = r#"{"header": "Bad request", "messages": ["Latitude out of range"]}"#;
        assert_eq!(describe_error_body(body), "Latitude out of range");
        assert_eq!(describe_error_body(r#"{"header": "Oops"}"#), "Oops");
        assert_eq!(describe_error_body("plain text"), "plain text");
    }
}
