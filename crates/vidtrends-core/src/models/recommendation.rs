use serde::{Deserialize, Serialize};

/// A video the backend recommends for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendedVideo {
    #[serde(alias = "videoId")]
    pub video_id: String,
    pub title: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Why this video was picked, when the backend says.
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

/// Viewing preferences that drive recommendations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserPreferences {
    pub user_id: i64,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_duration: Option<i64>,
    /// Seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<i64>,
}

/// One watched-video event reported to the recommendation engine.
#[derive(Debug, Clone, Serialize)]
pub struct ViewRecord {
    pub user_id: i64,
    pub video_id: String,
    pub title: String,
    /// Seconds actually watched
    pub view_duration: i64,
    pub completed: bool,
}
