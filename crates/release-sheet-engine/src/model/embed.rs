use std::sync::OnceLock;

use regex::Regex;

/// Social platforms an embed block can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Platform {
    Instagram,
    Tiktok,
    Youtube,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Instagram, Platform::Tiktok, Platform::Youtube];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
            Platform::Youtube => "youtube",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(name.trim()))
    }

    /// Recognise the platform a URL belongs to
    pub fn detect(url: &str) -> Option<Self> {
        static HOST_REGEX: OnceLock<Regex> = OnceLock::new();
        let host_regex = HOST_REGEX.get_or_init(|| {
            Regex::new(
                r"(?i)^https?://(?:[a-z0-9-]+\.)*(instagram\.com|instagr\.am|tiktok\.com|youtube\.com|youtu\.be)(?:[/?#:]|$)",
            )
            .expect("Invalid platform regex")
        });

        let captures = host_regex.captures(url.trim())?;
        match captures.get(1)?.as_str().to_ascii_lowercase().as_str() {
            "instagram.com" | "instagr.am" => Some(Platform::Instagram),
            "tiktok.com" => Some(Platform::Tiktok),
            _ => Some(Platform::Youtube),
        }
    }
}

/// Inline reference to a post on a social platform.
///
/// Whether the preview is shown is view state owned by the edit session,
/// never part of the block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialEmbed {
    pub platform: Platform,
    pub url: String,
}

impl SocialEmbed {
    /// Build an embed from a bare URL, if it belongs to a known platform
    pub fn from_url(url: &str) -> Option<Self> {
        Platform::detect(url).map(|platform| Self {
            platform,
            url: url.trim().to_string(),
        })
    }
}
