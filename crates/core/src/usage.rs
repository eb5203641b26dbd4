//! Free-tier usage metering
//!
//! One tick per elapsed second. Ticks accumulate in memory and are written in
//! batches of `flush_interval_ticks`; reaching the ceiling flushes whatever is
//! pending so the stored total lands exactly on the ceiling.

use tracing::{debug, info, warn};

use crate::config::UsagePolicy;
use crate::error::Result;
use crate::models::User;
use crate::storage::AccountRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Counted in memory only
    Counted { elapsed: u32 },
    /// Counted and the batch was written
    Flushed { elapsed: u32 },
    /// Ceiling reached; the meter no longer counts
    Exhausted { elapsed: u32 },
}

#[derive(Debug, Clone)]
pub struct UsageMeter {
    email: String,
    policy: UsagePolicy,
    persisted: u32,
    pending: u32,
    exhausted: bool,
}

impl UsageMeter {
    /// Meter for a session; `None` for paid plans, which are never metered
    pub fn start(user: &User, policy: UsagePolicy) -> Option<Self> {
        if !user.is_free() {
            return None;
        }
        Some(Self {
            email: user.email.clone(),
            policy,
            persisted: user.usage_seconds,
            pending: 0,
            exhausted: user.usage_seconds >= policy.free_ceiling_seconds,
        })
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Persisted plus unflushed seconds
    pub fn elapsed(&self) -> u32 {
        (self.persisted + self.pending).min(self.policy.free_ceiling_seconds.max(self.persisted))
    }

    pub fn remaining(&self) -> u32 {
        self.policy.free_ceiling_seconds.saturating_sub(self.elapsed())
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn pending(&self) -> u32 {
        self.pending
    }

    /// Count one second of usage
    pub fn tick<R>(&mut self, repo: &R) -> Result<TickOutcome>
    where
        R: AccountRepository + ?Sized,
    {
        if self.exhausted {
            return Ok(TickOutcome::Exhausted {
                elapsed: self.elapsed(),
            });
        }

        self.pending += 1;

        if self.persisted + self.pending >= self.policy.free_ceiling_seconds {
            self.flush(repo)?;
            self.exhausted = true;
            info!(email = %self.email, elapsed = self.elapsed(), "Free usage ceiling reached");
            return Ok(TickOutcome::Exhausted {
                elapsed: self.elapsed(),
            });
        }

        if self.pending >= self.policy.flush_interval_ticks {
            self.flush(repo)?;
            return Ok(TickOutcome::Flushed {
                elapsed: self.elapsed(),
            });
        }

        Ok(TickOutcome::Counted {
            elapsed: self.elapsed(),
        })
    }

    /// Write pending seconds to storage
    pub fn flush<R>(&mut self, repo: &R) -> Result<()>
    where
        R: AccountRepository + ?Sized,
    {
        if self.pending == 0 {
            return Ok(());
        }

        match repo.add_usage(&self.email, self.pending, self.policy.free_ceiling_seconds)? {
            Some(total) => {
                debug!(email = %self.email, added = self.pending, total, "Usage flushed");
                self.persisted = total;
            }
            None => warn!(email = %self.email, "Usage flush for missing account dropped"),
        }
        self.pending = 0;
        Ok(())
    }
}

/// Render seconds as `m:ss`
pub fn format_remaining(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Plan;
    use crate::storage::Database;

    fn setup(usage: u32) -> (Database, User) {
        let db = Database::open_in_memory().unwrap();
        let mut user = User::new("ana@example.com".into(), "h".into());
        user.usage_seconds = usage;
        db.create_account(&user).unwrap();
        (db, user)
    }

    fn stored_usage(db: &Database) -> u32 {
        db.find_account("ana@example.com").unwrap().unwrap().usage_seconds
    }

    #[test]
    fn paid_plans_are_not_metered() {
        let mut user = User::new("ana@example.com".into(), "h".into());
        user.plan = Plan::Basic;
        assert!(UsageMeter::start(&user, UsagePolicy::default()).is_none());
    }

    #[test]
    fn flushes_every_ten_ticks() {
        let (db, user) = setup(0);
        let mut meter = UsageMeter::start(&user, UsagePolicy::default()).unwrap();

        for _ in 0..9 {
            assert!(matches!(meter.tick(&db).unwrap(), TickOutcome::Counted { .. }));
        }
        assert_eq!(stored_usage(&db), 0);

        assert_eq!(meter.tick(&db).unwrap(), TickOutcome::Flushed { elapsed: 10 });
        assert_eq!(stored_usage(&db), 10);
    }

    #[test]
    fn six_hundred_ticks_hit_the_ceiling_exactly() {
        let (db, user) = setup(0);
        let mut meter = UsageMeter::start(&user, UsagePolicy::default()).unwrap();

        let mut last = None;
        for _ in 0..600 {
            last = Some(meter.tick(&db).unwrap());
        }

        assert_eq!(last, Some(TickOutcome::Exhausted { elapsed: 600 }));
        assert_eq!(stored_usage(&db), 600);

        // Clamped: more ticks change nothing
        meter.tick(&db).unwrap();
        assert_eq!(stored_usage(&db), 600);
        assert_eq!(meter.remaining(), 0);
    }

    #[test]
    fn usage_is_cumulative_across_sessions() {
        let (db, user) = setup(0);
        let mut first = UsageMeter::start(&user, UsagePolicy::default()).unwrap();
        for _ in 0..25 {
            first.tick(&db).unwrap();
        }
        first.flush(&db).unwrap();
        assert_eq!(stored_usage(&db), 25);

        let reloaded = db.find_account("ana@example.com").unwrap().unwrap();
        let mut second = UsageMeter::start(&reloaded, UsagePolicy::default()).unwrap();
        assert_eq!(second.elapsed(), 25);
        second.tick(&db).unwrap();
        assert_eq!(second.remaining(), 574);
    }

    #[test]
    fn starting_at_the_ceiling_is_exhausted() {
        let (db, user) = setup(600);
        let mut meter = UsageMeter::start(&user, UsagePolicy::default()).unwrap();
        assert!(meter.is_exhausted());
        assert_eq!(meter.tick(&db).unwrap(), TickOutcome::Exhausted { elapsed: 600 });
        assert_eq!(stored_usage(&db), 600);
    }

    #[test]
    fn remaining_time_format() {
        assert_eq!(format_remaining(600), "10:00");
        assert_eq!(format_remaining(61), "1:01");
        assert_eq!(format_remaining(0), "0:00");
    }
}
