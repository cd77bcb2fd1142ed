use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// `[label, count]` rows as returned by the query endpoint.
pub type Breakdown = Vec<(JsonValue, JsonValue)>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    pub pages: Breakdown,
    pub devices: Breakdown,
    pub browsers: Breakdown,
    pub countries: Breakdown,
    pub referrers: Breakdown,
    pub oss: Breakdown,
    pub visitors: JsonValue,
    pub pageviews: JsonValue,
    pub bounce_rate: JsonValue,
    pub chart: Vec<ChartPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartPoint {
    pub date: JsonValue,
    pub visitors: JsonValue,
    pub pageviews: JsonValue,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAnalytics {
    pub avg_session_duration: JsonValue,
    pub pages_per_session: JsonValue,
    pub landing_pages: Breakdown,
    pub exit_pages: Breakdown,
}
