use crate::model::{Priority, Task};
use chrono::NaiveDate;
use regex::RegexBuilder;
use std::collections::HashMap;

/// A workspace's tasks as an id-indexed arena. Parent/child links are ids, never references.
#[derive(Debug, Clone, Default)]
pub struct TaskTree {
    tasks: HashMap<i64, Task>,
    roots: Vec<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskStats {
    pub completed: usize,
    pub open: usize,
    pub blocked: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardStats {
    pub total: usize,
    pub completed: usize,
    pub due_today: usize,
    pub overdue: usize,
    pub high_priority: usize,
    pub blocked: usize,
    pub today_titles: Vec<String>,
}

impl DashboardStats {
    pub fn progress_percent(&self) -> usize {
        if self.total == 0 { 0 } else { self.completed * 100 / self.total }
    }
}

impl TaskTree {
    /// Links a flat task list into a forest, siblings by `(order, id)`.
    /// A task whose parent is missing from the list is treated as a root.
    pub fn from_tasks(mut tasks: Vec<Task>) -> Self {
        tasks.sort_by_key(|t| (t.order, t.id));
        let order: Vec<(i64, Option<i64>)> = tasks.iter().map(|t| (t.id, t.parent_id)).collect();
        let mut map: HashMap<i64, Task> = tasks
            .into_iter()
            .map(|mut task| {
                task.children.clear();
                (task.id, task)
            })
            .collect();

        let mut roots = Vec::new();
        for (id, parent_id) in order {
            match parent_id {
                Some(parent_id) if map.contains_key(&parent_id) => {
                    if let Some(parent) = map.get_mut(&parent_id) {
                        parent.children.push(id);
                    }
                }
                _ => roots.push(id),
            }
        }

        TaskTree { tasks: map, roots }
    }

    pub fn roots(&self) -> &[i64] {
        &self.roots
    }

    pub fn get(&self, id: i64) -> Option<&Task> {
        self.tasks.get(&id)
    }

    pub fn children(&self, id: i64) -> &[i64] {
        self.tasks.get(&id).map(|t| t.children.as_slice()).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Blocked tasks are never complete; leaves use their own flag;
    /// anything else is complete iff every child is.
    pub fn is_complete(&self, id: i64) -> bool {
        let Some(task) = self.tasks.get(&id) else {
            return false;
        };
        if task.is_blocked() {
            return false;
        }
        if task.children.is_empty() {
            return task.completed;
        }
        task.children.iter().all(|&child| self.is_complete(child))
    }

    pub fn completed_children(&self, id: i64) -> usize {
        self.children(id)
            .iter()
            .filter(|&&child| self.is_complete(child))
            .count()
    }

    /// `(completed children, total children)` for tasks with children.
    pub fn progress(&self, id: i64) -> Option<(usize, usize)> {
        let children = self.children(id);
        if children.is_empty() {
            None
        } else {
            Some((self.completed_children(id), children.len()))
        }
    }

    /// True when `candidate` is `ancestor` itself or anywhere in its subtree.
    pub fn is_descendant(&self, ancestor: i64, candidate: i64) -> bool {
        if ancestor == candidate {
            return true;
        }
        self.children(ancestor)
            .iter()
            .any(|&child| self.is_descendant(child, candidate))
    }

    /// `id` followed by all of its descendants, pre-order.
    pub fn subtree_ids(&self, id: i64) -> Vec<i64> {
        let mut ids = Vec::new();
        self.collect_subtree(id, &mut ids);
        ids
    }

    fn collect_subtree(&self, id: i64, ids: &mut Vec<i64>) {
        if !self.tasks.contains_key(&id) {
            return;
        }
        ids.push(id);
        for &child in self.children(id) {
            self.collect_subtree(child, ids);
        }
    }

    /// Completion writes for toggling `id`. A leaf flips itself; a group sets
    /// itself and every descendant to the opposite of its aggregate state.
    pub fn completion_updates(&self, id: i64) -> Vec<(i64, bool)> {
        let Some(task) = self.tasks.get(&id) else {
            return Vec::new();
        };
        if task.children.is_empty() {
            return vec![(id, !task.completed)];
        }
        let target = !self.is_complete(id);
        self.subtree_ids(id)
            .into_iter()
            .map(|task_id| (task_id, target))
            .collect()
    }

    /// Structural copy keeping tasks whose title or tags contain `query`
    /// (case-insensitive), plus every ancestor of such a task.
    pub fn filtered(&self, query: &str) -> TaskTree {
        let query = query.trim();
        if query.is_empty() {
            return self.clone();
        }
        let Ok(pattern) = RegexBuilder::new(&regex::escape(query))
            .case_insensitive(true)
            .build()
        else {
            return TaskTree::default();
        };

        let mut filtered = TaskTree::default();
        let roots: Vec<i64> = self
            .roots
            .iter()
            .copied()
            .filter(|&id| self.keep_matching(id, &pattern, &mut filtered))
            .collect();
        filtered.roots = roots;
        filtered
    }

    fn keep_matching(&self, id: i64, pattern: &regex::Regex, out: &mut TaskTree) -> bool {
        let Some(task) = self.tasks.get(&id) else {
            return false;
        };
        let kept_children: Vec<i64> = task
            .children
            .iter()
            .copied()
            .filter(|&child| self.keep_matching(child, pattern, out))
            .collect();
        let matches =
            pattern.is_match(&task.title) || task.tags.iter().any(|tag| pattern.is_match(tag));
        if !matches && kept_children.is_empty() {
            return false;
        }
        let mut clone = task.clone();
        clone.children = kept_children;
        out.tasks.insert(id, clone);
        true
    }

    /// Pre-order iteration over every task.
    pub fn iter(&self) -> impl Iterator<Item = &Task> + '_ {
        self.roots
            .iter()
            .flat_map(move |&root| self.subtree_ids(root))
            .filter_map(move |id| self.tasks.get(&id))
    }

    pub fn stats(&self) -> TaskStats {
        let mut stats = TaskStats::default();
        for task in self.iter() {
            if task.is_blocked() {
                stats.blocked += 1;
            } else if self.is_complete(task.id) {
                stats.completed += 1;
            } else {
                stats.open += 1;
            }
        }
        stats
    }

    pub fn dashboard(&self, today: NaiveDate) -> DashboardStats {
        let today = today.format("%Y-%m-%d").to_string();
        let mut stats = DashboardStats::default();
        for task in self.iter() {
            stats.total += 1;
            if self.is_complete(task.id) {
                stats.completed += 1;
                continue;
            }
            if task.due_date == today {
                stats.due_today += 1;
                if stats.today_titles.len() < 3 {
                    stats.today_titles.push(task.title.clone());
                }
            } else if !task.due_date.is_empty() && task.due_date < today {
                stats.overdue += 1;
            }
            match task.priority {
                Priority::High => stats.high_priority += 1,
                Priority::Blocked => stats.blocked += 1,
                _ => {}
            }
        }
        stats
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    pub(crate) fn task(id: i64, parent_id: Option<i64>, title: &str) -> Task {
        Task {
            id,
            parent_id,
            workspace_id: 1,
            title: title.to_string(),
            completed: false,
            tags: Vec::new(),
            due_date: String::new(),
            priority: Priority::Normal,
            order: 0,
            created_at: Utc::now(),
            children: Vec::new(),
        }
    }

    /// 1 Groceries
    ///   2 milk
    ///   3 eggs
    ///     4 free-range
    /// 5 Taxes #finance
    pub(crate) fn sample_tree() -> TaskTree {
        let mut taxes = task(5, None, "Taxes");
        taxes.tags = vec!["finance".to_string()];
        TaskTree::from_tasks(vec![
            task(1, None, "Groceries"),
            task(2, Some(1), "milk"),
            task(3, Some(1), "eggs"),
            task(4, Some(3), "free-range"),
            taxes,
        ])
    }

    fn completed(mut task: Task) -> Task {
        task.completed = true;
        task
    }

    #[test]
    fn links_children_in_sibling_order() {
        let tree = sample_tree();
        assert_eq!(tree.roots(), &[1, 5]);
        assert_eq!(tree.children(1), &[2, 3]);
        assert_eq!(tree.children(3), &[4]);
        assert_eq!(tree.len(), 5);
    }

    #[test]
    fn parent_is_complete_only_when_all_children_are() {
        let tree = TaskTree::from_tasks(vec![
            task(1, None, "p"),
            completed(task(2, Some(1), "a")),
            task(3, Some(1), "b"),
        ]);
        assert!(!tree.is_complete(1));
        assert_eq!(tree.progress(1), Some((1, 2)));

        let tree = TaskTree::from_tasks(vec![
            task(1, None, "p"),
            completed(task(2, Some(1), "a")),
            completed(task(3, Some(1), "b")),
        ]);
        assert!(tree.is_complete(1));
    }

    #[test]
    fn blocked_tasks_are_never_complete() {
        let mut parent = task(1, None, "p");
        parent.priority = Priority::Blocked;
        let tree = TaskTree::from_tasks(vec![parent, completed(task(2, Some(1), "a"))]);
        assert!(!tree.is_complete(1));

        let mut leaf = completed(task(3, None, "leaf"));
        leaf.priority = Priority::Blocked;
        let tree = TaskTree::from_tasks(vec![leaf]);
        assert!(!tree.is_complete(3));
    }

    #[test]
    fn toggling_a_group_writes_every_descendant() {
        let tree = sample_tree();
        assert_eq!(
            tree.completion_updates(1),
            vec![(1, true), (2, true), (3, true), (4, true)]
        );

        let tree = TaskTree::from_tasks(vec![
            task(1, None, "p"),
            completed(task(2, Some(1), "a")),
            completed(task(3, Some(1), "b")),
        ]);
        assert_eq!(
            tree.completion_updates(1),
            vec![(1, false), (2, false), (3, false)]
        );
        assert_eq!(tree.completion_updates(2), vec![(2, false)]);
    }

    #[test]
    fn descendant_check_includes_self() {
        let tree = sample_tree();
        assert!(tree.is_descendant(1, 4));
        assert!(tree.is_descendant(3, 3));
        assert!(!tree.is_descendant(3, 1));
        assert!(!tree.is_descendant(5, 2));
    }

    #[test]
    fn filter_keeps_matches_and_ancestors_without_touching_source() {
        let tree = sample_tree();
        let filtered = tree.filtered("FREE");
        assert_eq!(filtered.roots(), &[1]);
        assert_eq!(filtered.children(1), &[3]);
        assert_eq!(filtered.children(3), &[4]);
        assert_eq!(tree.children(1), &[2, 3]);

        let by_tag = tree.filtered("fin");
        assert_eq!(by_tag.roots(), &[5]);

        assert!(tree.filtered("zzz").is_empty());
    }

    #[test]
    fn filter_treats_query_as_literal_text() {
        let tree = TaskTree::from_tasks(vec![task(1, None, "a.b"), task(2, None, "axb")]);
        assert_eq!(tree.filtered("a.b").roots(), &[1]);
    }

    #[test]
    fn stats_and_dashboard_counts() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).expect("valid date");
        let mut due = task(2, None, "due today");
        due.due_date = "2026-10-16".to_string();
        due.priority = Priority::High;
        let mut late = task(3, None, "late");
        late.due_date = "2026-10-01".to_string();
        let mut blocked = task(4, None, "blocked");
        blocked.priority = Priority::Blocked;
        let tree = TaskTree::from_tasks(vec![completed(task(1, None, "done")), due, late, blocked]);

        assert_eq!(
            tree.stats(),
            TaskStats {
                completed: 1,
                open: 2,
                blocked: 1
            }
        );
        let dash = tree.dashboard(today);
        assert_eq!(dash.total, 4);
        assert_eq!(dash.completed, 1);
        assert_eq!(dash.due_today, 1);
        assert_eq!(dash.overdue, 1);
        assert_eq!(dash.high_priority, 1);
        assert_eq!(dash.blocked, 1);
        assert_eq!(dash.today_titles, vec!["due today".to_string()]);
        assert_eq!(dash.progress_percent(), 25);
    }
}
