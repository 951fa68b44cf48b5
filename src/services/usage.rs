//! Per-user daily AI usage, counted in UTC days.
//!
//! Counters live in process memory and reset on restart.

use crate::models::UsageSnapshot;
use chrono::{DateTime, Days, NaiveDate, Utc};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug, Default, Clone, Copy)]
struct DayUsage {
    requests: u32,
    tokens: u64,
}

/// Daily request and token counters keyed by user
#[derive(Clone)]
pub struct UsageTracker {
    daily_limit: u32,
    days: Arc<Mutex<HashMap<(Uuid, NaiveDate), DayUsage>>>,
}

/// Seconds from `now` until the next UTC midnight, at least 1
pub fn seconds_until_utc_midnight(now: DateTime<Utc>) -> u64 {
    let next_midnight = now
        .date_naive()
        .checked_add_days(Days::new(1))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc());
    match next_midnight {
        Some(midnight) => (midnight - now).num_seconds().max(1) as u64,
        None => 1,
    }
}

impl UsageTracker {
    pub fn new(daily_limit: u32) -> Self {
        Self {
            daily_limit,
            days: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn snapshot(&self, user_id: Uuid) -> UsageSnapshot {
        self.snapshot_at(user_id, Utc::now()).await
    }

    pub async fn snapshot_at(&self, user_id: Uuid, now: DateTime<Utc>) -> UsageSnapshot {
        let days = self.days.lock().await;
        let usage = days
            .get(&(user_id, now.date_naive()))
            .copied()
            .unwrap_or_default();
        self.to_snapshot(usage)
    }

    /// Reserve one request for today
    ///
    /// Fails with the seconds until the counters reset when the limit is reached.
    pub async fn try_begin(&self, user_id: Uuid) -> Result<(), u64> {
        self.try_begin_at(user_id, Utc::now()).await
    }

    pub async fn try_begin_at(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<(), u64> {
        let today = now.date_naive();
        let mut days = self.days.lock().await;
        days.retain(|(_, day), _| *day == today);

        let usage = days.entry((user_id, today)).or_default();
        if usage.requests >= self.daily_limit {
            return Err(seconds_until_utc_midnight(now));
        }
        usage.requests += 1;
        Ok(())
    }

    /// Give back a reservation whose upstream call failed
    pub async fn release(&self, user_id: Uuid) {
        let today = Utc::now().date_naive();
        if let Some(usage) = self.days.lock().await.get_mut(&(user_id, today)) {
            usage.requests = usage.requests.saturating_sub(1);
        }
    }

    /// Add the tokens of a completed call and return today's totals
    pub async fn record_tokens(&self, user_id: Uuid, tokens: u64) -> UsageSnapshot {
        let today = Utc::now().date_naive();
        let mut days = self.days.lock().await;
        let usage = days.entry((user_id, today)).or_default();
        usage.tokens = usage.tokens.saturating_add(tokens);
        let usage = *usage;
        self.to_snapshot(usage)
    }

    fn to_snapshot(&self, usage: DayUsage) -> UsageSnapshot {
        UsageSnapshot {
            requests_today: usage.requests,
            tokens_today: usage.tokens,
            daily_limit: self.daily_limit,
        }
    }
}
