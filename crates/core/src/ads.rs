//! Ad management and rotation

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Ad, AppConfig, NewAd};
use crate::storage::SettingsRepository;

/// Administrator operations on the ad list and rotation interval
pub struct AdBoard<'a, R: ?Sized> {
    repo: &'a R,
    default_interval: u32,
}

impl<'a, R> AdBoard<'a, R>
where
    R: SettingsRepository + ?Sized,
{
    pub fn new(repo: &'a R, default_interval: u32) -> Self {
        Self {
            repo,
            default_interval,
        }
    }

    pub fn config(&self) -> Result<AppConfig> {
        self.repo.load_app_config(self.default_interval)
    }

    #[instrument(skip(self, new_ad), fields(title = %new_ad.title))]
    pub fn add(&self, new_ad: NewAd) -> Result<Ad> {
        if new_ad.title.trim().is_empty() {
            return Err(Error::InvalidInput("Give the ad a title.".into()));
        }
        if new_ad.media_url.trim().is_empty() {
            return Err(Error::InvalidInput("Attach an image or video.".into()));
        }
        let ad = Ad::new(new_ad);
        self.repo.insert_ad(&ad)?;
        info!(id = %ad.id, "Ad created");
        Ok(ad)
    }

    pub fn delete(&self, id: Uuid) -> Result<bool> {
        let removed = self.repo.delete_ad(id)?;
        if removed {
            info!(%id, "Ad deleted");
        }
        Ok(removed)
    }

    /// Pause or resume an ad without deleting it
    pub fn set_active(&self, id: Uuid, active: bool) -> Result<bool> {
        let found = self.repo.set_ad_active(id, active)?;
        if found {
            info!(%id, active, "Ad visibility changed");
        }
        Ok(found)
    }

    pub fn set_interval(&self, seconds: u32) -> Result<()> {
        if seconds == 0 {
            return Err(Error::InvalidInput("Interval must be at least one second.".into()));
        }
        self.repo.set_ad_interval(seconds)
    }
}

/// Picks an ad every `interval` elapsed seconds of a free session
#[derive(Debug, Clone)]
pub struct AdRotation {
    interval: u32,
    ads: Vec<Ad>,
}

impl AdRotation {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            interval: config.ad_interval_seconds.max(1),
            ads: config.active_ads().cloned().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ads.is_empty()
    }

    /// Uniformly random ad when `elapsed` lands on an interval boundary
    pub fn on_elapsed<G: Rng + ?Sized>(&self, elapsed: u32, rng: &mut G) -> Option<Ad> {
        if elapsed == 0 || elapsed % self.interval != 0 {
            return None;
        }
        self.ads.choose(rng).cloned()
    }
}
