use std::collections::HashSet;

// Selection over positions (indices into the result list), not item
// identities. Two representations: a contiguous Range is O(1) to store,
// test, and extend; a Discrete set carries arbitrary positions plus the
// last-touched anchor for subsequent range operations. An emptied Discrete
// collapses to Empty; Discrete never collapses back to Range.
//
// Precondition violations (double add, remove of an absent position) panic:
// they mean the selection and the result list have desynchronized.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    Empty,
    Range {
        root: usize,
        extend: usize,
    },
    Discrete {
        indices: HashSet<usize>,
        last_toggled: usize,
    },
}

fn span(a: usize, b: usize) -> std::ops::RangeInclusive<usize> {
    a.min(b)..=a.max(b)
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::Empty)
    }

    pub fn contains(&self, position: usize) -> bool {
        match self {
            Selection::Empty => false,
            Selection::Range { root, extend } => span(*root, *extend).contains(&position),
            Selection::Discrete { indices, .. } => indices.contains(&position),
        }
    }

    // Sorted, deduplicated list of selected positions.
    pub fn positions(&self) -> Vec<usize> {
        match self {
            Selection::Empty => Vec::new(),
            Selection::Range { root, extend } => span(*root, *extend).collect(),
            Selection::Discrete { indices, .. } => {
                let mut out: Vec<usize> = indices.iter().copied().collect();
                out.sort_unstable();
                out
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Selection::Empty => 0,
            Selection::Range { root, extend } => span(*root, *extend).count(),
            Selection::Discrete { indices, .. } => indices.len(),
        }
    }

    // Plain click, Home/End, unmodified arrows.
    pub fn isolate(&mut self, position: usize) {
        *self = Selection::Discrete {
            indices: HashSet::from([position]),
            last_toggled: position,
        };
    }

    // Ctrl-click on an unselected row. A Range predecessor converts to the
    // equivalent Discrete set first, so prior members are kept.
    pub fn add(&mut self, position: usize) {
        match self {
            Selection::Empty => self.isolate(position),
            Selection::Range { root, extend } => {
                let range = span(*root, *extend);
                assert!(
                    !range.contains(&position),
                    "selection: add of already-selected position {position}"
                );
                let mut indices: HashSet<usize> = range.collect();
                indices.insert(position);
                *self = Selection::Discrete {
                    indices,
                    last_toggled: position,
                };
            }
            Selection::Discrete {
                indices,
                last_toggled,
            } => {
                assert!(
                    indices.insert(position),
                    "selection: add of already-selected position {position}"
                );
                *last_toggled = position;
            }
        }
    }

    // Shift+ctrl-click: extend from the anchor and merge, keeping prior
    // members. Positions already selected are not duplicated.
    pub fn add_to(&mut self, end: usize) {
        match self {
            Selection::Empty => {
                *self = Selection::Range {
                    root: 0,
                    extend: end,
                };
            }
            Selection::Range { root, extend } => {
                let near = if end < *root.min(extend) {
                    *root.min(extend)
                } else {
                    *root.max(extend)
                };
                let mut indices: HashSet<usize> = span(*root, *extend).collect();
                indices.extend(span(near, end));
                *self = Selection::Discrete {
                    indices,
                    last_toggled: end,
                };
            }
            Selection::Discrete {
                indices,
                last_toggled,
            } => {
                indices.extend(span(*last_toggled, end));
                *last_toggled = end;
            }
        }
    }

    // Ctrl-click on a selected row. An emptied set becomes Empty, never an
    // empty Discrete.
    pub fn remove(&mut self, position: usize) {
        match self {
            Selection::Empty => panic!("selection: remove of position {position} while empty"),
            Selection::Range { root, extend } => {
                let range = span(*root, *extend);
                assert!(
                    range.contains(&position),
                    "selection: remove of unselected position {position}"
                );
                let mut indices: HashSet<usize> = range.collect();
                indices.remove(&position);
                *self = if indices.is_empty() {
                    Selection::Empty
                } else {
                    Selection::Discrete {
                        indices,
                        last_toggled: position,
                    }
                };
            }
            Selection::Discrete {
                indices,
                last_toggled,
            } => {
                assert!(
                    indices.remove(&position),
                    "selection: remove of unselected position {position}"
                );
                if indices.is_empty() {
                    *self = Selection::Empty;
                } else {
                    *last_toggled = position;
                }
            }
        }
    }

    // Shift-click: replace-extend from the anchor. After a discrete
    // multi-select this starts a fresh range from the last-touched position,
    // discarding the rest of the set.
    pub fn extend_to(&mut self, position: usize) {
        match self {
            Selection::Empty => {
                *self = Selection::Range {
                    root: 0,
                    extend: position,
                };
            }
            Selection::Range { extend, .. } => *extend = position,
            Selection::Discrete { last_toggled, .. } => {
                *self = Selection::Range {
                    root: *last_toggled,
                    extend: position,
                };
            }
        }
    }

    pub fn clear(&mut self) {
        *self = Selection::Empty;
    }

    pub fn select_all(&mut self, len: usize) {
        *self = if len == 0 {
            Selection::Empty
        } else {
            Selection::Range {
                root: 0,
                extend: len - 1,
            }
        };
    }

    // The reference position keyboard navigation moves from.
    pub fn focused(&self) -> Option<usize> {
        match self {
            Selection::Empty => None,
            Selection::Range { extend, .. } => Some(*extend),
            Selection::Discrete { last_toggled, .. } => Some(*last_toggled),
        }
    }

    pub fn isolate_down(&mut self, len: usize) {
        self.step(len, 1, Step::Isolate);
    }

    pub fn isolate_up(&mut self, len: usize) {
        self.step(len, -1, Step::Isolate);
    }

    pub fn extend_down(&mut self, len: usize) {
        self.step(len, 1, Step::Extend);
    }

    pub fn extend_up(&mut self, len: usize) {
        self.step(len, -1, Step::Extend);
    }

    fn step(&mut self, len: usize, delta: isize, kind: Step) {
        if len == 0 {
            return;
        }
        let last = len - 1;
        let target = match self.focused() {
            // From empty, down lands on the first row and up on the last.
            None => {
                if delta > 0 {
                    0
                } else {
                    last
                }
            }
            Some(focused) => {
                let next = (focused as isize + delta).clamp(0, last as isize) as usize;
                if next == focused {
                    // Already at the boundary; moving past it is a no-op,
                    // including representation-wise.
                    return;
                }
                next
            }
        };
        match kind {
            Step::Isolate => self.isolate(target),
            Step::Extend => self.extend_to(target),
        }
    }
}

#[derive(Clone, Copy)]
enum Step {
    Isolate,
    Extend,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn discrete(positions: &[usize], last: usize) -> Selection {
        Selection::Discrete {
            indices: positions.iter().copied().collect(),
            last_toggled: last,
        }
    }

    #[test]
    fn isolate_replaces_any_prior_state() {
        let mut sel = Selection::Range { root: 2, extend: 9 };
        sel.isolate(4);
        assert_eq!(sel, discrete(&[4], 4));
    }

    #[test]
    fn extend_after_isolate_covers_span_and_keeps_root() {
        // Result list [10, 11, 12, 13, 14].
        let mut sel = Selection::Empty;
        sel.isolate(1);
        sel.extend_to(3);
        assert_eq!(sel.positions(), vec![1, 2, 3]);
        sel.extend_to(0);
        assert_eq!(sel.positions(), vec![0, 1]);
        assert_eq!(sel, Selection::Range { root: 1, extend: 0 });
    }

    #[test]
    fn add_to_from_empty_ranges_from_zero_then_add_converts_to_discrete() {
        let mut sel = Selection::Empty;
        sel.add_to(2);
        assert_eq!(sel, Selection::Range { root: 0, extend: 2 });
        sel.add(4);
        assert_eq!(sel, discrete(&[0, 1, 2, 4], 4));
    }

    #[test]
    fn add_to_on_range_merges_from_nearer_boundary() {
        let mut sel = Selection::Range { root: 3, extend: 5 };
        sel.add_to(8);
        assert_eq!(sel.positions(), vec![3, 4, 5, 6, 7, 8]);
        let mut sel = Selection::Range { root: 3, extend: 5 };
        sel.add_to(1);
        assert_eq!(sel.positions(), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn add_to_on_discrete_spans_from_anchor_without_duplicates() {
        let mut sel = discrete(&[0, 4], 4);
        sel.add_to(6);
        assert_eq!(sel.positions(), vec![0, 4, 5, 6]);
        assert_eq!(sel.focused(), Some(6));
    }

    #[test]
    fn remove_converts_range_one_way() {
        let mut sel = Selection::Range { root: 1, extend: 3 };
        sel.remove(2);
        assert_eq!(sel.positions(), vec![1, 3]);
        // Re-adding the removed position does not restore the Range
        // representation; the conversion is one-directional.
        sel.add(2);
        assert_eq!(sel, discrete(&[1, 2, 3], 2));
    }

    #[test]
    fn remove_of_last_member_collapses_to_empty() {
        let mut sel = discrete(&[7], 7);
        sel.remove(7);
        assert_eq!(sel, Selection::Empty);

        let mut sel = Selection::Range { root: 5, extend: 5 };
        sel.remove(5);
        assert_eq!(sel, Selection::Empty);
    }

    #[test]
    #[should_panic(expected = "already-selected")]
    fn double_add_panics() {
        let mut sel = discrete(&[1, 2], 2);
        sel.add(1);
    }

    #[test]
    #[should_panic(expected = "unselected")]
    fn remove_of_absent_position_panics() {
        let mut sel = discrete(&[1, 2], 2);
        sel.remove(5);
    }

    #[test]
    fn discrete_after_shift_click_restarts_range_from_anchor() {
        let mut sel = discrete(&[0, 3, 7], 3);
        sel.extend_to(5);
        assert_eq!(sel, Selection::Range { root: 3, extend: 5 });
    }

    #[test]
    fn clear_is_idempotent() {
        let mut sel = discrete(&[1], 1);
        sel.clear();
        assert_eq!(sel, Selection::Empty);
        sel.clear();
        assert_eq!(sel, Selection::Empty);
    }

    #[test]
    fn select_all_covers_whole_list() {
        let mut sel = Selection::Empty;
        sel.select_all(5);
        assert_eq!(sel, Selection::Range { root: 0, extend: 4 });
        sel.select_all(0);
        assert_eq!(sel, Selection::Empty);
    }

    #[test]
    fn navigation_from_empty_picks_first_or_last() {
        let mut sel = Selection::Empty;
        sel.isolate_down(4);
        assert_eq!(sel.positions(), vec![0]);

        let mut sel = Selection::Empty;
        sel.isolate_up(4);
        assert_eq!(sel.positions(), vec![3]);
    }

    #[test]
    fn navigation_at_bounds_is_a_no_op() {
        let mut sel = Selection::Range { root: 1, extend: 3 };
        sel.isolate_down(4);
        // Already at the last row; even the representation stays put.
        assert_eq!(sel, Selection::Range { root: 1, extend: 3 });

        let mut sel = discrete(&[0, 2], 0);
        sel.isolate_up(4);
        assert_eq!(sel, discrete(&[0, 2], 0));
    }

    #[test]
    fn extend_down_grows_range_from_focus() {
        let mut sel = Selection::Empty;
        sel.isolate(1);
        sel.extend_down(5);
        sel.extend_down(5);
        assert_eq!(sel, Selection::Range { root: 1, extend: 3 });
        sel.extend_up(5);
        assert_eq!(sel, Selection::Range { root: 1, extend: 2 });
    }

    #[test]
    fn navigation_on_empty_list_does_nothing() {
        let mut sel = Selection::Empty;
        sel.isolate_down(0);
        sel.extend_up(0);
        assert_eq!(sel, Selection::Empty);
    }

    #[test]
    fn positions_never_duplicate_under_mixed_edits() {
        let mut sel = Selection::Empty;
        sel.isolate(2);
        sel.add_to(5);
        sel.add(0);
        sel.add_to(1);
        sel.remove(3);
        let positions = sel.positions();
        let mut dedup = positions.clone();
        dedup.dedup();
        assert_eq!(positions, dedup);
        assert!(positions.iter().all(|&p| p <= 5));
    }
}
