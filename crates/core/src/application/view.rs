// Derived View Computation - what the acting user sees

use crate::domain::{EpochMillis, ProjectedEntry};
use serde::Serialize;

/// Queue as seen by one user at one instant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueView {
    pub entries: Vec<ProjectedEntry>,
    /// Entries strictly before the user's entry (0 if not queued)
    pub people_ahead: usize,
    /// Effective allotments strictly before the user's entry (0 if not queued)
    pub total_wait_minutes: i64,
    /// 1-based position of the user's entry
    pub position: Option<usize>,
    pub is_users_turn: bool,
    /// Trusted time the view was derived at
    pub as_of: EpochMillis,
}

impl QueueView {
    /// Derive the view from the retained, projected queue
    pub fn derive(entries: Vec<ProjectedEntry>, nickname: Option<&str>, now: EpochMillis) -> Self {
        let index = nickname.and_then(|nick| entries.iter().position(|e| e.entry.is_owned_by(nick)));

        let (people_ahead, total_wait_minutes, is_users_turn) = match index {
            Some(i) => (
                i,
                entries[..i]
                    .iter()
                    .map(|e| e.entry.wait_allotment.effective_minutes())
                    .fold(0i64, i64::saturating_add),
                entries[i].projected_start <= now,
            ),
            None => (0, 0, false),
        };

        Self {
            entries,
            people_ahead,
            total_wait_minutes,
            position: index.map(|i| i + 1),
            is_users_turn,
            as_of: now,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The acting user's own entry, if queued
    pub fn own_entry(&self) -> Option<&ProjectedEntry> {
        self.position.map(|p| &self.entries[p - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::projection::project;
    use crate::domain::{Category, QueueEntry, WaitAllotment, MILLIS_PER_MINUTE};

    const MIN: i64 = MILLIS_PER_MINUTE;
    const T: i64 = 1_000_000_000;

    fn queue(lineup: &[(&str, i64)]) -> Vec<ProjectedEntry> {
        let entries = lineup
            .iter()
            .enumerate()
            .map(|(i, (nick, minutes))| {
                QueueEntry::new(
                    format!("id-{i}"),
                    Category::Consoles,
                    *nick,
                    WaitAllotment::from_minutes(*minutes),
                    i as i64,
                )
            })
            .collect();
        project(entries, T)
    }

    #[test]
    fn test_people_ahead_and_total_wait() {
        let view = QueueView::derive(
            queue(&[("ana", 10), ("bia", 5), ("carla", 20)]),
            Some("carla"),
            T,
        );
        assert_eq!(view.people_ahead, 2);
        assert_eq!(view.total_wait_minutes, 15);
        assert_eq!(view.position, Some(3));
        assert!(!view.is_users_turn);
        assert!(view.people_ahead + 1 <= view.len());
    }

    #[test]
    fn test_absent_user_sees_zeroes() {
        let view = QueueView::derive(queue(&[("ana", 10), ("bia", 5)]), Some("zeca"), T);
        assert_eq!(view.people_ahead, 0);
        assert_eq!(view.total_wait_minutes, 0);
        assert_eq!(view.position, None);
        assert!(!view.is_users_turn);
        assert!(view.own_entry().is_none());

        let anonymous = QueueView::derive(queue(&[("ana", 10)]), None, T);
        assert_eq!(anonymous.position, None);
    }

    #[test]
    fn test_head_of_queue_has_turn_at_base_time() {
        let view = QueueView::derive(queue(&[("ana", 10), ("bia", 5)]), Some("ana"), T);
        assert!(view.is_users_turn);
        assert_eq!(view.people_ahead, 0);
        assert_eq!(view.own_entry().unwrap().entry.display_name, "ana");
    }

    #[test]
    fn test_turn_depends_only_on_own_start() {
        // bia starts at T+10min regardless of how the allotment is split ahead
        let a = QueueView::derive(queue(&[("ana", 10), ("bia", 5)]), Some("bia"), T + 10 * MIN);
        let b = QueueView::derive(
            queue(&[("ana", 3), ("zeca", 0), ("rui", 7), ("bia", 5)]),
            Some("bia"),
            T + 10 * MIN,
        );
        assert!(a.is_users_turn);
        assert!(b.is_users_turn);

        let early = QueueView::derive(queue(&[("ana", 10), ("bia", 5)]), Some("bia"), T + 10 * MIN - 1);
        assert!(!early.is_users_turn);
    }

    #[test]
    fn test_negative_allotment_ahead_does_not_reduce_wait() {
        let view = QueueView::derive(queue(&[("ana", -10), ("bia", 5), ("carla", 1)]), Some("carla"), T);
        assert_eq!(view.total_wait_minutes, 5);
    }
}
