//! Daily token/cost allowance.
//!
//! Counters are bumped only after a dispatch completes, so concurrent
//! `can_dispatch` checks may over-admit by at most the batches in flight.

use chrono::{DateTime, Duration, Utc};
use std::sync::{Mutex, MutexGuard};
use tracing::info;

#[derive(Debug, Clone)]
pub struct BudgetState {
    pub tokens_used_today: u64,
    pub cost_used_today: f64,
    /// Start of the current 24h accounting window.
    pub day_boundary: DateTime<Utc>,
}

pub struct BudgetGuard {
    state: Mutex<BudgetState>,
    daily_token_limit: u64,
    daily_cost_limit: f64,
}

impl BudgetGuard {
    pub fn new(daily_token_limit: u64, daily_cost_limit: f64) -> Self {
        Self::starting_at(daily_token_limit, daily_cost_limit, Utc::now())
    }

    /// Guard whose first window opens at `boundary`.
    pub fn starting_at(daily_token_limit: u64, daily_cost_limit: f64, boundary: DateTime<Utc>) -> Self {
        Self {
            state: Mutex::new(BudgetState {
                tokens_used_today: 0,
                cost_used_today: 0.0,
                day_boundary: boundary,
            }),
            daily_token_limit,
            daily_cost_limit,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BudgetState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// True iff both the token and cost totals are under their ceilings.
    pub fn can_dispatch(&self) -> bool {
        let state = self.lock();
        state.tokens_used_today < self.daily_token_limit
            && state.cost_used_today < self.daily_cost_limit
    }

    pub fn record_usage(&self, tokens: u64, cost: f64) {
        let mut state = self.lock();
        state.tokens_used_today = state.tokens_used_today.saturating_add(tokens);
        state.cost_used_today += cost.max(0.0);
    }

    /// Reset the counters if a full day has passed since the boundary.
    pub fn reset_if_new_day(&self) -> bool {
        self.reset_if_new_day_at(Utc::now())
    }

    /// Same as [`reset_if_new_day`](Self::reset_if_new_day) with an explicit clock.
    ///
    /// The boundary advances by whole days, so a guard that sat idle for
    /// three days resets once and stays aligned to its original time of day.
    pub fn reset_if_new_day_at(&self, now: DateTime<Utc>) -> bool {
        let mut state = self.lock();
        let elapsed = now - state.day_boundary;
        if elapsed < Duration::days(1) {
            return false;
        }
        let days = elapsed.num_days();
        state.day_boundary += Duration::days(days);
        info!(
            tokens = state.tokens_used_today,
            cost = state.cost_used_today,
            "daily budget reset"
        );
        state.tokens_used_today = 0;
        state.cost_used_today = 0.0;
        true
    }

    pub fn snapshot(&self) -> BudgetState {
        self.lock().clone()
    }

    pub fn daily_token_limit(&self) -> u64 {
        self.daily_token_limit
    }

    pub fn daily_cost_limit(&self) -> f64 {
        self.daily_cost_limit
    }
}
