use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A video on the trending chart.
/// Field aliases cover the camelCase spelling the upstream video API uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendingVideo {
    #[serde(alias = "videoId")]
    pub video_id: String,
    pub title: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default, alias = "viewCount")]
    pub view_count: Option<i64>,
    #[serde(default, alias = "likeCount")]
    pub like_count: Option<i64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, alias = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

/// Stored result of one trend analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub id: i64,
    pub user_id: i64,
    pub category: String,
    pub region: String,
    pub analyzed_at: DateTime<Utc>,
    /// Statistics and matched videos; the shape is backend-defined.
    pub results: Value,
    #[serde(default)]
    pub criteria: Value,
}

/// Filters for the trending endpoints.
#[derive(Debug, Clone, Default)]
pub struct TrendQuery {
    pub region: Option<String>,
    pub category: Option<String>,
    pub limit: Option<u32>,
}

impl TrendQuery {
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query-string pairs for the trending endpoints.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(ref region) = self.region {
            query.push(("region".to_string(), region.clone()));
        }
        if let Some(ref category) = self.category {
            query.push(("category".to_string(), category.clone()));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        query
    }
}
