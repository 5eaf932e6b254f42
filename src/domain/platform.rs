//! Target platforms and content classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A social or ad platform content can be published to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Facebook,
    Instagram,
    Twitter,
    Linkedin,
    Tiktok,
    Youtube,
    Pinterest,
    GoogleAds,
    MetaAds,
}

impl Platform {
    pub const ALL: [Platform; 9] = [
        Platform::Facebook,
        Platform::Instagram,
        Platform::Twitter,
        Platform::Linkedin,
        Platform::Tiktok,
        Platform::Youtube,
        Platform::Pinterest,
        Platform::GoogleAds,
        Platform::MetaAds,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::Twitter => "twitter",
            Platform::Linkedin => "linkedin",
            Platform::Tiktok => "tiktok",
            Platform::Youtube => "youtube",
            Platform::Pinterest => "pinterest",
            Platform::GoogleAds => "google_ads",
            Platform::MetaAds => "meta_ads",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Platform::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == normalized || (normalized == "x" && *p == Platform::Twitter))
            .ok_or_else(|| format!("unknown platform: {}", s))
    }
}

/// Kind of content, used for timing advice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Text,
    Image,
    Video,
    Carousel,
    Story,
    Link,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Text => "text",
            ContentType::Image => "image",
            ContentType::Video => "video",
            ContentType::Carousel => "carousel",
            ContentType::Story => "story",
            ContentType::Link => "link",
        }
    }
}

impl FromStr for ContentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(ContentType::Text),
            "image" => Ok(ContentType::Image),
            "video" => Ok(ContentType::Video),
            "carousel" => Ok(ContentType::Carousel),
            "story" => Ok(ContentType::Story),
            "link" => Ok(ContentType::Link),
            other => Err(format!("unknown content type: {}", other)),
        }
    }
}

/// Media attachment kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Gif,
    Document,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Gif => "gif",
            MediaKind::Document => "document",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_round_trips_through_str() {
        for platform in Platform::ALL {
            assert_eq!(platform.as_str().parse::<Platform>().unwrap(), platform);
        }
    }

    #[test]
    fn test_platform_parse_aliases() {
        assert_eq!("X".parse::<Platform>().unwrap(), Platform::Twitter);
        assert_eq!("google-ads".parse::<Platform>().unwrap(), Platform::GoogleAds);
        assert!("myspace".parse::<Platform>().is_err());
    }

    #[test]
    fn test_platform_serde_snake_case() {
        let json = serde_json::to_string(&Platform::MetaAds).unwrap();
        assert_eq!(json, "\"meta_ads\"");
    }

    #[test]
    fn test_content_type_parse() {
        assert_eq!("Video".parse::<ContentType>().unwrap(), ContentType::Video);
        assert!("podcast".parse::<ContentType>().is_err());
    }
}
