//! App-wide settings and ad persistence
//!
//! The ad interval lives in `app_settings`; ads keep their insertion order via
//! a `position` column so the admin list is stable.

use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::parse::{parse_uuid, OptionalExt};
use super::SupportStore;
use crate::error::Result;
use crate::models::{Ad, AppConfig};

const AD_INTERVAL_KEY: &str = "ad_interval_seconds";

pub struct SettingsStore<'a> {
    conn: &'a Connection,
}

impl<'a> SettingsStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Ad interval, writing `default_interval` if never set
    pub fn ad_interval_or_init(&self, default_interval: u32) -> Result<u32> {
        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM app_settings WHERE key = ?1",
                params![AD_INTERVAL_KEY],
                |row| row.get(0),
            )
            .optional()?;

        match stored.and_then(|v| v.parse::<u32>().ok()).filter(|v| *v > 0) {
            Some(interval) => Ok(interval),
            None => {
                self.set_ad_interval(default_interval)?;
                Ok(default_interval)
            }
        }
    }

    pub fn set_ad_interval(&self, seconds: u32) -> Result<()> {
        self.conn.execute(
            "INSERT INTO app_settings (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![AD_INTERVAL_KEY, seconds.to_string()],
        )?;
        Ok(())
    }

    /// Full config record including the support log
    pub fn load(&self, default_interval: u32) -> Result<AppConfig> {
        Ok(AppConfig {
            ad_interval_seconds: self.ad_interval_or_init(default_interval)?,
            ads: self.list_ads()?,
            support_messages: SupportStore::new(self.conn).list_all()?,
        })
    }

    pub fn insert_ad(&self, ad: &Ad) -> Result<()> {
        self.conn.execute(
            "INSERT INTO ads (id, title, description, media_url, link, is_active, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6,
                     (SELECT COALESCE(MAX(position), 0) + 1 FROM ads))",
            params![
                ad.id.to_string(),
                ad.title,
                ad.description,
                ad.media_url,
                ad.link,
                ad.is_active as i32,
            ],
        )?;
        Ok(())
    }

    pub fn delete_ad(&self, id: Uuid) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM ads WHERE id = ?1", params![id.to_string()])?;
        Ok(removed > 0)
    }

    /// Show or hide an ad; returns whether it exists
    pub fn set_ad_active(&self, id: Uuid, active: bool) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE ads SET is_active = ?2 WHERE id = ?1",
            params![id.to_string(), active as i32],
        )?;
        Ok(changed > 0)
    }

    pub fn list_ads(&self) -> Result<Vec<Ad>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, description, media_url, link, is_active
             FROM ads ORDER BY position ASC",
        )?;

        let ads = stmt
            .query_map([], map_ad)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ads)
    }

    pub(crate) fn clear_ads(&self) -> Result<()> {
        self.conn.execute("DELETE FROM ads", [])?;
        Ok(())
    }
}

fn map_ad(row: &Row<'_>) -> rusqlite::Result<Ad> {
    Ok(Ad {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        title: row.get(1)?,
        description: row.get(2)?,
        media_url: row.get(3)?,
        link: row.get(4)?,
        is_active: row.get::<_, i32>(5)? != 0,
    })
}
