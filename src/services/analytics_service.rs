use reqwest::Client;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use url::Url;

use crate::error::{Error, Result};
use crate::models::analytics::{AnalyticsOverview, Breakdown, ChartPoint, SessionAnalytics};

pub const DEFAULT_PERIOD_DAYS: u32 = 30;
pub const MAX_PERIOD_DAYS: u32 = 365;

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<Vec<JsonValue>>,
}

/// Proxies HogQL queries to the product-analytics backend.
#[derive(Clone)]
pub struct AnalyticsService {
    client: Client,
    endpoint: Url,
    api_key: String,
}

impl AnalyticsService {
    pub fn new(host: &Url, project_id: &str, api_key: String, client: Client) -> Result<Self> {
        let endpoint = host
            .join(&format!("api/projects/{}/query/", project_id))
            .map_err(|e| Error::Config(format!("Invalid analytics endpoint: {}", e)))?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    pub async fn overview(&self, period: u32) -> Result<AnalyticsOverview> {
        let pageviews_in = format!(
            "FROM events WHERE event = '$pageview' AND timestamp >= NOW() - toIntervalDay({})",
            period
        );
        let breakdown = |property: &str, label: &str| {
            format!(
                "SELECT properties.{} as {}, COUNT(*) as count {} GROUP BY {} ORDER BY count DESC",
                property, label, pageviews_in, label
            )
        };

        let (pages, devices, browsers, countries, referrers, oss) = tokio::try_join!(
            self.run(breakdown("$pathname", "page")),
            self.run(breakdown("$device_type", "device")),
            self.run(breakdown("$browser", "browser")),
            self.run(breakdown("$geoip_country_name", "country")),
            self.run(breakdown("$referrer", "referrer")),
            self.run(breakdown("$os", "os")),
        )?;

        let (visitors, pageviews, bounce_rate, chart) = tokio::try_join!(
            self.run(format!(
                "SELECT COUNT(DISTINCT person_id) as visitors FROM events WHERE timestamp >= NOW() - toIntervalDay({})",
                period
            )),
            self.run(format!("SELECT COUNT(*) as pageviews {}", pageviews_in)),
            self.run(format!(
                "WITH session_pageviews AS (SELECT properties.$session_id as session_id, COUNT(*) as views {} GROUP BY session_id) \
                 SELECT ROUND(100.0 * SUM(CASE WHEN views = 1 THEN 1 ELSE 0 END) / COUNT(*), 2) as bounce_rate FROM session_pageviews",
                pageviews_in
            )),
            self.run(format!(
                "SELECT dateTrunc('day', timestamp) as date, COUNT(DISTINCT person_id) as visitors, \
                 countIf(event = '$pageview') as pageviews FROM events \
                 WHERE timestamp >= NOW() - toIntervalDay({}) GROUP BY date ORDER BY date",
                period
            )),
        )?;

        Ok(AnalyticsOverview {
            pages: to_breakdown(pages),
            devices: to_breakdown(devices),
            browsers: to_breakdown(browsers),
            countries: to_breakdown(countries),
            referrers: to_breakdown(referrers),
            oss: to_breakdown(oss),
            visitors: first_cell(&visitors),
            pageviews: first_cell(&pageviews),
            bounce_rate: first_cell(&bounce_rate),
            chart: chart
                .into_iter()
                .map(|row| {
                    let mut cells = row.into_iter();
                    ChartPoint {
                        date: cells.next().unwrap_or(JsonValue::Null),
                        visitors: cells.next().unwrap_or_else(|| JsonValue::from(0)),
                        pageviews: cells.next().unwrap_or_else(|| JsonValue::from(0)),
                    }
                })
                .collect(),
        })
    }

    pub async fn sessions(&self, period: u32) -> Result<SessionAnalytics> {
        let pageviews_in = format!(
            "FROM events WHERE event = '$pageview' AND timestamp >= NOW() - toIntervalDay({})",
            period
        );
        let ranked = |order: &str| {
            format!(
                "WITH ranked_pages AS (SELECT properties.$session_id as session_id, properties.$pathname as page, \
                 row_number() OVER (PARTITION BY properties.$session_id ORDER BY timestamp {}) as rn {}) \
                 SELECT page, COUNT(*) as count FROM ranked_pages WHERE rn = 1 GROUP BY page ORDER BY count DESC",
                order, pageviews_in
            )
        };

        let (duration, per_session, landing, exit) = tokio::try_join!(
            self.run(format!(
                "WITH session_times AS (SELECT properties.$session_id as session_id, MIN(timestamp) as session_start, \
                 MAX(timestamp) as session_end {} GROUP BY session_id) \
                 SELECT ROUND(AVG(dateDiff('second', session_start, session_end)), 0) FROM session_times",
                pageviews_in
            )),
            self.run(format!(
                "WITH session_pageviews AS (SELECT properties.$session_id as session_id, COUNT(*) as views {} GROUP BY session_id) \
                 SELECT ROUND(AVG(views), 2) FROM session_pageviews",
                pageviews_in
            )),
            self.run(ranked("ASC")),
            self.run(ranked("DESC")),
        )?;

        Ok(SessionAnalytics {
            avg_session_duration: first_cell(&duration),
            pages_per_session: first_cell(&per_session),
            landing_pages: to_breakdown(landing),
            exit_pages: to_breakdown(exit),
        })
    }

    async fn run(&self, query: String) -> Result<Vec<Vec<JsonValue>>> {
        let payload = serde_json::json!({
            "query": { "kind": "HogQLQuery", "query": query }
        });
        let res = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            tracing::error!(%status, "Analytics query failed: {}", text);
            return Err(Error::Upstream(format!("Analytics API error {}", status)));
        }

        let body: QueryResponse = res.json().await?;
        Ok(body.results)
    }
}

/// Parses the `period` query parameter (days).
pub fn parse_period(raw: Option<&str>) -> Result<u32> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(DEFAULT_PERIOD_DAYS);
    };
    match raw.parse::<u32>() {
        Ok(days) if (1..=MAX_PERIOD_DAYS).contains(&days) => Ok(days),
        _ => Err(Error::BadRequest(format!(
            "period must be a whole number of days between 1 and {}",
            MAX_PERIOD_DAYS
        ))),
    }
}

fn first_cell(rows: &[Vec<JsonValue>]) -> JsonValue {
    rows.first()
        .and_then(|row| row.first())
        .filter(|v| !v.is_null())
        .cloned()
        .unwrap_or_else(|| JsonValue::from(0))
}

fn to_breakdown(rows: Vec<Vec<JsonValue>>) -> Breakdown {
    rows.into_iter()
        .map(|row| {
            let mut cells = row.into_iter();
            (
                cells.next().unwrap_or(JsonValue::Null),
                cells.next().unwrap_or_else(|| JsonValue::from(0)),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn period_defaults_and_bounds() {
        assert_eq!(parse_period(None).unwrap(), 30);
        assert_eq!(parse_period(Some("7")).unwrap(), 7);
        assert!(parse_period(Some("0")).is_err());
        assert!(parse_period(Some("366")).is_err());
        assert!(parse_period(Some("7) OR 1=1 --")).is_err());
    }

    #[test]
    fn first_cell_falls_back_to_zero() {
        assert_eq!(first_cell(&[]), json!(0));
        assert_eq!(first_cell(&[vec![JsonValue::Null]]), json!(0));
        assert_eq!(first_cell(&[vec![json!(42)]]), json!(42));
    }

    #[test]
    fn builds_project_query_endpoint() {
        let host = Url::parse("https://eu.posthog.com").unwrap();
        let svc = AnalyticsService::new(&host, "123", "key".into(), Client::new()).unwrap();
        assert_eq!(
            svc.endpoint.as_str(),
            "https://eu.posthog.com/api/projects/123/query/"
        );
    }
}
