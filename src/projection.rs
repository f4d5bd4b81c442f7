use crate::tree::TaskTree;
use std::collections::HashSet;

/// One display line of the task list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatRow {
    pub task_id: i64,
    pub depth: usize,
    pub has_children: bool,
    /// Whether this row's children are emitted below it.
    pub expanded: bool,
    /// Box-drawing connectors for the row's tree position.
    pub prefix: String,
}

/// Flattened view of a workspace tree, with the filtered clone it was built
/// from when a search query is active.
#[derive(Debug, Clone, Default)]
pub struct Projection {
    filtered: Option<TaskTree>,
    rows: Vec<FlatRow>,
}

impl Projection {
    /// Depth-first pre-order walk. Roots are always expanded; other nodes are
    /// expanded when in `expanded` or while a query is active.
    pub fn build(tree: &TaskTree, expanded: &HashSet<i64>, query: &str) -> Self {
        let searching = !query.trim().is_empty();
        let filtered = searching.then(|| tree.filtered(query));
        let source = filtered.as_ref().unwrap_or(tree);

        let mut rows = Vec::new();
        let roots = source.roots();
        for (i, &root) in roots.iter().enumerate() {
            let walker = Walker {
                tree: source,
                expanded,
                searching,
            };
            walker.emit(root, 0, i == roots.len() - 1, &mut Vec::new(), &mut rows);
        }

        Projection { filtered, rows }
    }

    pub fn rows(&self) -> &[FlatRow] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&FlatRow> {
        self.rows.get(index)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn index_of(&self, task_id: i64) -> Option<usize> {
        self.rows.iter().position(|row| row.task_id == task_id)
    }

    /// The tree the rows were projected from: the filtered clone while searching.
    pub fn visible_tree<'a>(&'a self, source: &'a TaskTree) -> &'a TaskTree {
        self.filtered.as_ref().unwrap_or(source)
    }
}

struct Walker<'a> {
    tree: &'a TaskTree,
    expanded: &'a HashSet<i64>,
    searching: bool,
}

impl Walker<'_> {
    fn emit(
        &self,
        id: i64,
        depth: usize,
        is_last_sibling: bool,
        ancestor_continuations: &mut Vec<bool>,
        rows: &mut Vec<FlatRow>,
    ) {
        let Some(task) = self.tree.get(id) else {
            return;
        };
        let has_children = task.has_children();
        let is_root = task.parent_id.is_none() || depth == 0;
        let expanded = has_children && (is_root || self.searching || self.expanded.contains(&id));

        rows.push(FlatRow {
            task_id: id,
            depth,
            has_children,
            expanded,
            prefix: generate_prefix(ancestor_continuations, is_last_sibling, depth),
        });

        if expanded {
            if depth > 0 {
                ancestor_continuations.push(!is_last_sibling);
            }
            let children = self.tree.children(id);
            for (i, &child) in children.iter().enumerate() {
                self.emit(child, depth + 1, i == children.len() - 1, ancestor_continuations, rows);
            }
            if depth > 0 {
                ancestor_continuations.pop();
            }
        }
    }
}

fn generate_prefix(ancestor_continuations: &[bool], is_last_sibling: bool, depth: usize) -> String {
    let mut prefix = String::new();

    for &needs_continuation in ancestor_continuations {
        if needs_continuation {
            prefix.push_str("│   ");
        } else {
            prefix.push_str("    ");
        }
    }

    if depth > 0 {
        if is_last_sibling {
            prefix.push_str("└── ");
        } else {
            prefix.push_str("├── ");
        }
    }

    prefix
}

/// Cursor and scroll offset over a list of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub selected: usize,
    pub scroll: usize,
}

impl Viewport {
    /// Keeps `selected` within `[0, len - 1]`, or 0 for an empty list.
    /// Keeps both the cursor and the scroll offset inside `len` rows.
    pub fn clamp(&mut self, len: usize) {
        if len == 0 {
            self.selected = 0;
        } else if self.selected >= len {
            self.selected = len - 1;
        }
        self.scroll = self.scroll.min(len.saturating_sub(1));
    }

    pub fn move_by(&mut self, delta: isize, len: usize) {
        if len == 0 {
            self.selected = 0;
            return;
        }
        let target = self.selected as isize + delta;
        self.selected = target.clamp(0, len as isize - 1) as usize;
    }

    pub fn to_top(&mut self) {
        self.selected = 0;
        self.scroll = 0;
    }

    pub fn to_bottom(&mut self, len: usize) {
        self.selected = len.saturating_sub(1);
    }

    pub fn reset(&mut self) {
        *self = Viewport::default();
    }

    /// Scrolls so the selected row is inside a window of `visible` rows, then
    /// clamps the offset to `[0, max(0, len - visible)]`.
    pub fn scroll_into_view(&mut self, visible: usize, len: usize) {
        let visible = visible.max(1);
        if self.selected < self.scroll {
            self.scroll = self.selected;
        } else if self.selected >= self.scroll + visible {
            self.scroll = self.selected + 1 - visible;
        }
        let max_scroll = len.saturating_sub(visible);
        if self.scroll > max_scroll {
            self.scroll = max_scroll;
        }
    }
}

/// `(task, new parent)` for indenting the row at `index`: it becomes the last
/// child of the row above, which must sit at the same depth and must not be
/// inside the moved task's own subtree.
pub fn indent_target(rows: &[FlatRow], tree: &TaskTree, index: usize) -> Option<(i64, i64)> {
    if index == 0 {
        return None;
    }
    let current = rows.get(index)?;
    let previous = rows.get(index - 1)?;
    if previous.depth != current.depth {
        return None;
    }
    if tree.is_descendant(current.task_id, previous.task_id) {
        return None;
    }
    Some((current.task_id, previous.task_id))
}

/// `(task, new parent)` for promoting `task_id` one level. `None` for roots.
pub fn unindent_target(tree: &TaskTree, task_id: i64) -> Option<(i64, Option<i64>)> {
    let task = tree.get(task_id)?;
    let parent = tree.get(task.parent_id?)?;
    Some((task_id, parent.parent_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::tests::{sample_tree, task};
    use pretty_assertions::assert_eq;

    fn ids(projection: &Projection) -> Vec<(i64, usize)> {
        projection.rows().iter().map(|r| (r.task_id, r.depth)).collect()
    }

    #[test]
    fn roots_are_always_expanded_and_nested_nodes_follow_the_set() {
        let tree = sample_tree();
        let collapsed = Projection::build(&tree, &HashSet::new(), "");
        assert_eq!(ids(&collapsed), vec![(1, 0), (2, 1), (3, 1), (5, 0)]);
        assert!(collapsed.rows()[0].expanded);
        assert!(!collapsed.rows()[2].expanded);

        let expanded: HashSet<i64> = [3].into_iter().collect();
        let open = Projection::build(&tree, &expanded, "");
        assert_eq!(ids(&open), vec![(1, 0), (2, 1), (3, 1), (4, 2), (5, 0)]);
    }

    #[test]
    fn connectors_follow_tree_position() {
        let tree = sample_tree();
        let expanded: HashSet<i64> = [3].into_iter().collect();
        let projection = Projection::build(&tree, &expanded, "");
        let prefixes: Vec<&str> = projection.rows().iter().map(|r| r.prefix.as_str()).collect();
        assert_eq!(prefixes, vec!["", "├── ", "└── ", "    └── ", ""]);
    }

    #[test]
    fn search_force_expands_matching_branches() {
        let tree = sample_tree();
        let projection = Projection::build(&tree, &HashSet::new(), "range");
        assert_eq!(ids(&projection), vec![(1, 0), (3, 1), (4, 2)]);
        assert!(projection.rows()[1].expanded);
        assert_eq!(projection.visible_tree(&tree).children(1), &[3]);
        assert_eq!(tree.children(1), &[2, 3]);
    }

    #[test]
    fn clearing_search_restores_the_unfiltered_projection() {
        let tree = sample_tree();
        let expanded: HashSet<i64> = [3].into_iter().collect();
        let before = Projection::build(&tree, &expanded, "");

        let none = Projection::build(&tree, &expanded, "nothing matches this");
        assert!(none.is_empty());

        let after = Projection::build(&tree, &expanded, "");
        assert_eq!(before.rows(), after.rows());
    }

    #[test]
    fn viewport_clamps_selection() {
        let mut viewport = Viewport {
            selected: 9,
            scroll: 0,
        };
        viewport.clamp(4);
        assert_eq!(viewport.selected, 3);
        viewport.clamp(0);
        assert_eq!(viewport.selected, 0);

        viewport.move_by(-3, 5);
        assert_eq!(viewport.selected, 0);
        viewport.move_by(10, 5);
        assert_eq!(viewport.selected, 4);
    }

    #[test]
    fn clamp_pulls_the_scroll_offset_back_in_range() {
        let mut viewport = Viewport {
            selected: 29,
            scroll: 19,
        };
        viewport.clamp(5);
        assert_eq!(viewport, Viewport { selected: 4, scroll: 4 });
        viewport.clamp(0);
        assert_eq!(viewport, Viewport::default());
    }

    #[test]
    fn scroll_stays_at_zero_when_list_fits() {
        let mut viewport = Viewport::default();
        viewport.to_bottom(3);
        viewport.scroll_into_view(10, 3);
        assert_eq!(viewport, Viewport { selected: 2, scroll: 0 });
    }

    #[test]
    fn scroll_follows_selection_both_ways() {
        let mut viewport = Viewport::default();
        viewport.to_bottom(20);
        viewport.scroll_into_view(5, 20);
        assert_eq!(viewport.scroll, 15);

        viewport.selected = 3;
        viewport.scroll_into_view(5, 20);
        assert_eq!(viewport.scroll, 3);

        viewport.scroll = 18;
        viewport.selected = 19;
        viewport.scroll_into_view(5, 20);
        assert_eq!(viewport.scroll, 15);
    }

    #[test]
    fn indent_requires_same_depth_predecessor() {
        let tree = sample_tree();
        let projection = Projection::build(&tree, &HashSet::new(), "");
        // rows: 1, 2, 3, 5
        assert_eq!(indent_target(projection.rows(), &tree, 2), Some((3, 2)));
        assert_eq!(indent_target(projection.rows(), &tree, 1), None);
        assert_eq!(indent_target(projection.rows(), &tree, 0), None);
        assert_eq!(indent_target(projection.rows(), &tree, 3), None);
    }

    #[test]
    fn indent_rejects_moving_under_own_descendant() {
        // B (id 2) owns A (id 1); rows list A right above B at the same depth.
        let tree = TaskTree::from_tasks(vec![task(2, None, "B"), task(1, Some(2), "A")]);
        let rows = vec![
            FlatRow {
                task_id: 1,
                depth: 1,
                has_children: false,
                expanded: false,
                prefix: String::new(),
            },
            FlatRow {
                task_id: 2,
                depth: 1,
                has_children: true,
                expanded: false,
                prefix: String::new(),
            },
        ];
        assert_eq!(indent_target(&rows, &tree, 1), None);
        assert_eq!(tree.children(2), &[1]);
    }

    #[test]
    fn unindent_promotes_one_level() {
        let tree = sample_tree();
        assert_eq!(unindent_target(&tree, 4), Some((4, Some(1))));
        assert_eq!(unindent_target(&tree, 2), Some((2, None)));
        assert_eq!(unindent_target(&tree, 1), None);
    }
}
