//! Project completion percentage, derived on read from the task statuses.

use crate::models::task::TaskStatus;

/// Percentage of done tasks in `[0, 100]`, truncating division. Zero tasks
/// means zero progress, not an undefined value. Computed over the project's
/// entire task set; progress is a team-wide statistic, not a per-viewer one.
pub fn compute_progress(statuses: &[TaskStatus]) -> i32 {
    let total = statuses.len() as i64;
    if total == 0 {
        return 0;
    }

    let done = statuses
        .iter()
        .filter(|status| **status == TaskStatus::Done)
        .count() as i64;

    (done * 100 / total) as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use TaskStatus::{Done, InProgress, Todo};

    #[test]
    fn empty_project_has_zero_progress() {
        assert_eq!(compute_progress(&[]), 0);
    }

    #[test]
    fn two_of_three_done_floors_to_66() {
        assert_eq!(compute_progress(&[Done, Done, Todo]), 66);
    }

    #[test]
    fn single_done_task_is_complete() {
        assert_eq!(compute_progress(&[Done]), 100);
    }

    #[test]
    fn in_progress_does_not_count_as_done() {
        assert_eq!(compute_progress(&[Done, InProgress, InProgress, Todo]), 25);
    }
}
