//! Queue pipeline: fetch -> project -> reap -> derive
//!
//! All polling state lives in an explicit [`PollContext`] handed to each
//! cycle. Planning a cycle ([`plan_cycle`]) is pure; the only side effects
//! of [`QueuePipeline::run_cycle`] are the trusted-time call, the store query
//! and the reap deletes.
//!
//! # Base time anchor
//!
//! Projections start from an anchor: the trusted time at which the current
//! head of the queue began its turn. The anchor is taken from `now` the
//! first time a head is seen (or when the head changes for a reason this
//! client did not cause), and advanced past the allotments of entries this
//! client reaps. Projections are still recomputed from scratch every cycle.

use crate::application::fetcher::QueueFetcher;
use crate::application::reaper::{partition_elapsed, ReapOutcome, Reaper};
use crate::application::trusted_time::{TimeSource, TrustedTimeProvider};
use crate::application::projection::project;
use crate::application::view::QueueView;
use crate::domain::{Category, EntryId, EpochMillis, ProjectedEntry, QueueEntry};
use crate::error::Result;
use crate::port::UserIdentity;
use std::sync::Arc;
use tracing::{debug, info};

/// Polling state carried between cycles
#[derive(Debug, Clone)]
pub struct PollContext {
    category: Category,
    user: Option<UserIdentity>,
    anchor: Option<EpochMillis>,
    anchored_head: Option<EntryId>,
    last_turn: bool,
    last_view: Option<QueueView>,
}

impl PollContext {
    pub fn new(category: Category, user: Option<UserIdentity>) -> Self {
        Self {
            category,
            user,
            anchor: None,
            anchored_head: None,
            last_turn: false,
            last_view: None,
        }
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn user(&self) -> Option<&UserIdentity> {
        self.user.as_ref()
    }

    pub fn nickname(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.nickname.as_str())
    }

    pub fn anchor(&self) -> Option<EpochMillis> {
        self.anchor
    }

    /// Last successfully derived view (for stale display after a failure)
    pub fn last_view(&self) -> Option<&QueueView> {
        self.last_view.as_ref()
    }

    /// Switch category; resets everything derived from the old queue.
    /// Returns false when `category` was already selected.
    pub fn select_category(&mut self, category: Category) -> bool {
        if self.category == category {
            return false;
        }
        self.category = category;
        self.anchor = None;
        self.anchored_head = None;
        self.last_turn = false;
        self.last_view = None;
        true
    }

    /// Replace the signed-in user; turn tracking restarts only when the
    /// nickname actually changes.
    pub fn set_user(&mut self, user: Option<UserIdentity>) {
        let same_nickname =
            self.nickname() == user.as_ref().map(|u| u.nickname.as_str());
        self.user = user;
        if !same_nickname {
            self.last_turn = false;
        }
    }

    /// Base time for projecting `entries` at `now`
    fn base_for(&self, entries: &[QueueEntry], now: EpochMillis) -> EpochMillis {
        let head = entries.first().map(|e| e.entry_id.as_str());
        match (self.anchor, self.anchored_head.as_deref()) {
            (Some(anchor), Some(anchored)) if Some(anchored) == head => anchor,
            _ => now,
        }
    }
}

/// Pure outcome of one cycle, before any store mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePlan {
    pub base: EpochMillis,
    pub now: EpochMillis,
    pub outcome: ReapOutcome,
}

impl CyclePlan {
    /// Store deletes this plan requires
    pub fn deletes(&self) -> Vec<EntryId> {
        self.outcome
            .removed
            .iter()
            .map(|e| e.entry.entry_id.clone())
            .collect()
    }
}

/// Project and partition a fetched snapshot (no side effects)
pub fn plan_cycle(entries: Vec<QueueEntry>, ctx: &PollContext, now: EpochMillis) -> CyclePlan {
    let base = ctx.base_for(&entries, now);
    let outcome = partition_elapsed(project(entries, base), now);
    CyclePlan { base, now, outcome }
}

/// Result of one full pipeline pass
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub view: QueueView,
    pub removed: Vec<ProjectedEntry>,
    pub delete_failures: usize,
    pub time_source: TimeSource,
    /// `is_users_turn` went from false to true in this cycle
    pub turn_arrived: bool,
}

/// Apply a plan's retained half to the context and derive the view
///
/// Returns the view and whether the user's turn just arrived.
pub fn commit_cycle(ctx: &mut PollContext, retained: Vec<ProjectedEntry>, now: EpochMillis) -> (QueueView, bool) {
    match retained.first() {
        Some(head) => {
            ctx.anchor = Some(head.projected_start);
            ctx.anchored_head = Some(head.entry.entry_id.clone());
        }
        None => {
            ctx.anchor = None;
            ctx.anchored_head = None;
        }
    }

    let view = QueueView::derive(retained, ctx.nickname(), now);
    let turn_arrived = view.is_users_turn && !ctx.last_turn;
    ctx.last_turn = view.is_users_turn;
    ctx.last_view = Some(view.clone());
    (view, turn_arrived)
}

pub struct QueuePipeline {
    clock: Arc<TrustedTimeProvider>,
    fetcher: QueueFetcher,
    reaper: Reaper,
}

impl QueuePipeline {
    pub fn new(clock: Arc<TrustedTimeProvider>, fetcher: QueueFetcher, reaper: Reaper) -> Self {
        Self {
            clock,
            fetcher,
            reaper,
        }
    }

    /// Run one full pass for the context's category
    ///
    /// Fetch failures and malformed allotments propagate; the context is
    /// left untouched so the last good view stays available.
    pub async fn run_cycle(&self, ctx: &mut PollContext) -> Result<CycleReport> {
        // One trusted-time sample per cycle
        let now = self.clock.now().await;
        let entries = self.fetcher.fetch(ctx.category).await?;

        let plan = plan_cycle(entries, ctx, now.millis);
        debug!(
            category = %ctx.category,
            base = plan.base,
            now = plan.now,
            removed = plan.outcome.removed.len(),
            "Cycle planned"
        );

        let ReapOutcome { retained, removed } = plan.outcome;
        let (_, failures) = self.reaper.delete_removed(&removed).await;

        let (view, turn_arrived) = commit_cycle(ctx, retained, now.millis);
        if turn_arrived {
            info!(
                category = %ctx.category,
                nickname = ctx.nickname().unwrap_or_default(),
                "User's turn has arrived"
            );
        }

        Ok(CycleReport {
            view,
            removed,
            delete_failures: failures.len(),
            time_source: now.source,
            turn_arrived,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{WaitAllotment, MILLIS_PER_MINUTE};

    const MIN: i64 = MILLIS_PER_MINUTE;
    const T: i64 = 1_700_000_000_000;

    fn entry(id: &str, minutes: i64, enqueued_at: i64) -> QueueEntry {
        QueueEntry::new(
            id,
            Category::Pcs,
            id,
            WaitAllotment::from_minutes(minutes),
            enqueued_at,
        )
    }

    fn ab() -> Vec<QueueEntry> {
        vec![entry("A", 10, T - 1_000), entry("B", 5, T)]
    }

    #[test]
    fn test_first_plan_anchors_at_now() {
        let ctx = PollContext::new(Category::Pcs, None);
        let plan = plan_cycle(ab(), &ctx, T);
        assert_eq!(plan.base, T);
        assert!(plan.outcome.removed.is_empty());
        assert_eq!(plan.outcome.retained[1].projected_start, T + 10 * MIN);
    }

    #[test]
    fn test_anchor_is_kept_while_head_is_unchanged() {
        let mut ctx = PollContext::new(Category::Pcs, None);
        let plan = plan_cycle(ab(), &ctx, T);
        commit_cycle(&mut ctx, plan.outcome.retained, T);

        let later = plan_cycle(ab(), &ctx, T + 3 * MIN);
        assert_eq!(later.base, T);
        assert_eq!(later.outcome.retained[1].projected_start, T + 10 * MIN);
    }

    #[test]
    fn test_reap_advances_anchor_to_next_head() {
        let mut ctx = PollContext::new(Category::Pcs, None);
        let plan = plan_cycle(ab(), &ctx, T);
        commit_cycle(&mut ctx, plan.outcome.retained, T);

        let now = T + 10 * MIN + 1_000;
        let plan = plan_cycle(ab(), &ctx, now);
        assert_eq!(plan.deletes(), vec!["A".to_string()]);
        assert_eq!(plan.outcome.retained[0].projected_start, T + 10 * MIN);
        commit_cycle(&mut ctx, plan.outcome.retained, now);
        assert_eq!(ctx.anchor(), Some(T + 10 * MIN));

        // Next pass: store no longer holds A; B stays anchored at T+10min
        let next = plan_cycle(vec![entry("B", 5, T)], &ctx, now + 10_000);
        assert_eq!(next.base, T + 10 * MIN);
        assert!(next.outcome.removed.is_empty());
    }

    #[test]
    fn test_foreign_head_change_reanchors_at_now() {
        let mut ctx = PollContext::new(Category::Pcs, None);
        let plan = plan_cycle(ab(), &ctx, T);
        commit_cycle(&mut ctx, plan.outcome.retained, T);

        // A left explicitly; B is head without this client reaping anything
        let plan = plan_cycle(vec![entry("B", 5, T)], &ctx, T + MIN);
        assert_eq!(plan.base, T + MIN);
    }

    #[test]
    fn test_empty_queue_clears_anchor() {
        let mut ctx = PollContext::new(Category::Pcs, None);
        let plan = plan_cycle(ab(), &ctx, T);
        commit_cycle(&mut ctx, plan.outcome.retained, T);

        let plan = plan_cycle(Vec::new(), &ctx, T + MIN);
        commit_cycle(&mut ctx, plan.outcome.retained, T + MIN);
        assert_eq!(ctx.anchor(), None);
    }

    #[test]
    fn test_turn_arrival_is_edge_triggered() {
        let user = UserIdentity::new("uid-b", "B");
        let mut ctx = PollContext::new(Category::Pcs, Some(user));

        let plan = plan_cycle(ab(), &ctx, T);
        let (view, arrived) = commit_cycle(&mut ctx, plan.outcome.retained, T);
        assert!(!view.is_users_turn);
        assert!(!arrived);

        let now = T + 10 * MIN;
        let plan = plan_cycle(ab(), &ctx, now);
        let (view, arrived) = commit_cycle(&mut ctx, plan.outcome.retained, now);
        assert!(view.is_users_turn);
        assert!(arrived);

        let now = now + MIN;
        let plan = plan_cycle(vec![entry("B", 5, T)], &ctx, now);
        let (view, arrived) = commit_cycle(&mut ctx, plan.outcome.retained, now);
        assert!(view.is_users_turn);
        assert!(!arrived, "notification fires once per transition");
    }

    #[test]
    fn test_refreshing_the_same_user_keeps_turn_state() {
        let mut ctx = PollContext::new(Category::Pcs, Some(UserIdentity::new("uid-a", "A")));
        let plan = plan_cycle(ab(), &ctx, T);
        let (_, arrived) = commit_cycle(&mut ctx, plan.outcome.retained, T);
        assert!(arrived);

        ctx.set_user(Some(UserIdentity::new("uid-a", "A")));
        let plan = plan_cycle(ab(), &ctx, T + MIN);
        let (view, arrived) = commit_cycle(&mut ctx, plan.outcome.retained, T + MIN);
        assert!(view.is_users_turn);
        assert!(!arrived);

        ctx.set_user(Some(UserIdentity::new("uid-b", "B")));
        let now = T + 10 * MIN;
        let plan = plan_cycle(ab(), &ctx, now);
        let (_, arrived) = commit_cycle(&mut ctx, plan.outcome.retained, now);
        assert!(arrived, "a different user gets a fresh notification");
    }

    #[test]
    fn test_huge_allotment_at_head_does_not_overflow() {
        let ctx = PollContext::new(Category::Pcs, None);
        let entries = vec![entry("A", i64::MAX / MIN + 1, T - 1_000), entry("B", 5, T)];

        let plan = plan_cycle(entries, &ctx, T);

        assert!(plan.outcome.removed.is_empty());
        assert_eq!(plan.outcome.retained[0].projected_start, T);
        assert_eq!(plan.outcome.retained[0].projected_end(), i64::MAX);
        assert_eq!(plan.outcome.retained[1].projected_start, i64::MAX);
    }

    #[test]
    fn test_category_change_resets_derived_state() {
        let mut ctx = PollContext::new(Category::Pcs, None);
        let plan = plan_cycle(ab(), &ctx, T);
        commit_cycle(&mut ctx, plan.outcome.retained, T);
        assert!(ctx.last_view().is_some());

        assert!(!ctx.select_category(Category::Pcs));
        assert!(ctx.select_category(Category::Vrs));
        assert_eq!(ctx.anchor(), None);
        assert!(ctx.last_view().is_none());
    }
}
