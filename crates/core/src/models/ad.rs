//! Ads and the process-wide app configuration record

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::SupportMessage;

/// A promotional unit shown to free-tier users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ad {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Image or video reference (URL or data URI)
    pub media_url: String,
    pub link: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

/// Fields supplied by the administrator when creating an ad
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewAd {
    pub title: String,
    pub description: String,
    pub media_url: String,
    pub link: String,
}

impl Ad {
    pub fn new(new_ad: NewAd) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: new_ad.title,
            description: new_ad.description,
            media_url: new_ad.media_url,
            link: new_ad.link,
            is_active: true,
        }
    }
}

/// Ad rotation interval, ad list and support log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub ad_interval_seconds: u32,
    #[serde(default)]
    pub ads: Vec<Ad>,
    #[serde(default)]
    pub support_messages: Vec<SupportMessage>,
}

impl AppConfig {
    pub fn with_interval(ad_interval_seconds: u32) -> Self {
        Self {
            ad_interval_seconds,
            ads: Vec::new(),
            support_messages: Vec::new(),
        }
    }

    pub fn active_ads(&self) -> impl Iterator<Item = &Ad> {
        self.ads.iter().filter(|ad| ad.is_active)
    }
}
