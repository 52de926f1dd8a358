use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Content Type
// ============================================================================

/// Kind of aggregated material. Opaque to the store; presentation picks badges from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    News,
    Movie,
    Music,
    Social,
}

impl ContentType {
    pub fn name(self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Movie => "movie",
            Self::Music => "music",
            Self::Social => "social",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Content Item
// ============================================================================

/// A single piece of aggregated content.
///
/// Identity is `id`, assigned by the upstream source. Copies of the same item
/// can live in several collections at once; they are independent values, so
/// flipping `is_favorite` on one copy does not touch the others.
///
/// The wire shape uses camelCase (`publishedAt`, `isFavorite`) and `type` for
/// the content kind. A missing `isFavorite` decodes as `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub category: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
}

impl ContentItem {
    /// Build an item with the required fields; optional fields start empty.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        content_type: ContentType,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            image: None,
            url: None,
            category: category.into(),
            content_type,
            published_at: None,
            is_favorite: false,
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_published_at(mut self, published_at: impl Into<String>) -> Self {
        self.published_at = Some(published_at.into());
        self
    }

    /// Case-insensitive substring match against title or description.
    ///
    /// `needle_lower` must already be lowercased so a search over many items
    /// lowercases the query once.
    pub fn matches_lowercase(&self, needle_lower: &str) -> bool {
        self.title.to_lowercase().contains(needle_lower)
            || self.description.to_lowercase().contains(needle_lower)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_name_matches_wire_value() {
        for kind in [
            ContentType::News,
            ContentType::Movie,
            ContentType::Music,
            ContentType::Social,
        ] {
            let value = serde_json::to_value(kind).unwrap();
            assert_eq!(value, kind.name());
            assert_eq!(kind.to_string(), kind.name());
        }
    }

    #[test]
    fn test_decode_provider_wire_shape() {
        let json = r#"{
            "id": "1",
            "title": "Tech Innovation Breakthrough",
            "description": "Latest developments",
            "image": "https://images.example.com/a.jpg",
            "category": "technology",
            "type": "news",
            "publishedAt": "2024-01-01T00:00:00Z"
        }"#;

        let item: ContentItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.id, "1");
        assert_eq!(item.content_type, ContentType::News);
        assert_eq!(item.published_at.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert!(item.url.is_none());
        assert!(!item.is_favorite, "missing isFavorite must decode as false");
    }

    #[test]
    fn test_encode_uses_camel_case_and_type() {
        let mut item = ContentItem::new("9", "T", "D", "sci-fi", ContentType::Movie);
        item.is_favorite = true;

        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "movie");
        assert_eq!(value["isFavorite"], true);
        assert!(value.get("image").is_none());
        assert!(value.get("publishedAt").is_none());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let json = r#"{"id":"1","title":"t","description":"d","category":"c","type":"podcast"}"#;
        assert!(serde_json::from_str::<ContentItem>(json).is_err());
    }

    #[test]
    fn test_matches_lowercase() {
        let item = ContentItem::new(
            "3",
            "The Matrix Resurrections",
            "Neo must choose between reality and the Matrix once again",
            "action",
            ContentType::Movie,
        );
        assert!(item.matches_lowercase("matrix"));
        assert!(item.matches_lowercase("reality"));
        assert!(!item.matches_lowercase("dune"));
        // Caller is responsible for lowercasing the needle
        assert!(!item.matches_lowercase("Matrix"));
    }
}
