use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A video saved to a user's favorites list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FavoriteVideo {
    pub id: i64,
    pub user_id: i64,
    pub video_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub url: String,
    #[serde(default, alias = "thumbnailUrl")]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default, alias = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub added_at: Option<DateTime<Utc>>,
}

/// Payload for saving a new favorite.
#[derive(Debug, Clone, Serialize)]
pub struct NewFavorite {
    pub user_id: i64,
    pub video_id: String,
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl NewFavorite {
    pub fn new(user_id: i64, video_id: impl Into<String>, title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            user_id,
            video_id: video_id.into(),
            title: title.into(),
            url: url.into(),
            thumbnail: None,
            channel: None,
            notes: None,
            tags: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_favorite_with_missing_optionals() {
        let json = r#"{
            "id": 3,
            "user_id": 7,
            "video_id": "dQw4w9WgXcQ",
            "title": "Some video",
            "url": "https://youtube.com/watch?v=dQw4w9WgXcQ"
        }"#;

        let favorite: FavoriteVideo =
            serde_json::from_str(json).expect("failed to parse favorite");
        assert_eq!(favorite.video_id, "dQw4w9WgXcQ");
        assert!(favorite.tags.is_empty());
        assert!(favorite.thumbnail.is_none());
        assert!(favorite.added_at.is_none());
    }

    #[test]
    fn test_new_favorite_skips_empty_fields() {
        let favorite = NewFavorite::new(7, "abc123", "Title", "https://example.com/v/abc123");
        let encoded = serde_json::to_value(&favorite).unwrap();
        assert!(encoded.get("notes").is_none());
        assert!(encoded.get("tags").is_none());
        assert_eq!(encoded["user_id"], 7);
    }
}
