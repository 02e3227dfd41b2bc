// ============================================
// Dual-List Reorder Model
// ============================================
//
// Editing core for one user's ranking: a "ranked" and an "unranked" list that
// together always hold the user's whole catalog, each movie exactly once.
//
// Edits:
// 1. reorder_within      - move inside one list
// 2. move_between_lists  - promote / demote at a target index
// 3. drop_into_empty_list - id-based drop onto a list with no rows
//
// Indices may be stale (a drag outliving an external refresh), so every
// out-of-range index is a no-op rather than an error.
//
// The hover policy is a pure predicate; a UI layer only translates pointer
// events into `DragState::hover` calls.

use crate::models::{Movie, MovieId, UserRankingView};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Ranked,
    Unranked,
}

impl ListKind {
    pub fn other(self) -> Self {
        match self {
            ListKind::Ranked => ListKind::Unranked,
            ListKind::Unranked => ListKind::Ranked,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ListKind::Ranked => "ranked",
            ListKind::Unranked => "unranked",
        }
    }
}

/// A row position in one of the two lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub list: ListKind,
    pub index: usize,
}

impl Slot {
    pub fn new(list: ListKind, index: usize) -> Self {
        Self { list, index }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DualListReorderModel {
    ranked: Vec<Movie>,
    unranked: Vec<Movie>,
}

impl DualListReorderModel {
    pub fn new(ranked: Vec<Movie>, unranked: Vec<Movie>) -> Self {
        Self { ranked, unranked }
    }

    pub fn ranked(&self) -> &[Movie] {
        &self.ranked
    }

    pub fn unranked(&self) -> &[Movie] {
        &self.unranked
    }

    pub fn list(&self, kind: ListKind) -> &[Movie] {
        match kind {
            ListKind::Ranked => &self.ranked,
            ListKind::Unranked => &self.unranked,
        }
    }

    fn list_mut(&mut self, kind: ListKind) -> &mut Vec<Movie> {
        match kind {
            ListKind::Ranked => &mut self.ranked,
            ListKind::Unranked => &mut self.unranked,
        }
    }

    /// Total number of movies across both lists
    pub fn len(&self) -> usize {
        self.ranked.len() + self.unranked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranked.is_empty() && self.unranked.is_empty()
    }

    pub fn position(&self, kind: ListKind, movie_id: &MovieId) -> Option<usize> {
        self.list(kind).iter().position(|m| &m.id == movie_id)
    }

    /// Which list currently holds `movie_id`
    pub fn locate(&self, movie_id: &MovieId) -> Option<Slot> {
        [ListKind::Ranked, ListKind::Unranked]
            .into_iter()
            .find_map(|kind| self.position(kind, movie_id).map(|i| Slot::new(kind, i)))
    }

    /// Ids of the ranked list in order, ready for submission
    pub fn ranked_ids(&self) -> Vec<MovieId> {
        self.ranked.iter().map(|m| m.id.clone()).collect()
    }

    /// Move the item at `from` to `to` inside `kind`. Returns whether the list
    /// changed.
    pub fn reorder_within(&mut self, kind: ListKind, from: usize, to: usize) -> bool {
        let list = self.list_mut(kind);
        if from >= list.len() {
            debug!(
                list = kind.as_str(),
                from,
                len = list.len(),
                "Stale reorder index ignored"
            );
            return false;
        }

        let to = to.min(list.len() - 1);
        if from == to {
            return false;
        }

        let movie = list.remove(from);
        list.insert(to, movie);
        true
    }

    /// Move the item at `from` in `from_list` to `to` in `to_list`, clamping
    /// `to` to the target length. Same-list calls reorder in place.
    pub fn move_between_lists(
        &mut self,
        from_list: ListKind,
        to_list: ListKind,
        from: usize,
        to: usize,
    ) -> bool {
        if from_list == to_list {
            return self.reorder_within(from_list, from, to);
        }

        let source = self.list_mut(from_list);
        if from >= source.len() {
            debug!(
                list = from_list.as_str(),
                from,
                len = source.len(),
                "Stale move index ignored"
            );
            return false;
        }
        let movie = source.remove(from);

        let target = self.list_mut(to_list);
        let to = to.min(target.len());
        target.insert(to, movie);
        true
    }

    /// Drop `movie_id` onto `target` when it has no rows to hover between.
    /// The item is looked up in `from_hint` only.
    pub fn drop_into_empty_list(
        &mut self,
        movie_id: &MovieId,
        from_hint: ListKind,
        target: ListKind,
    ) -> bool {
        if from_hint == target {
            return false;
        }

        let Some(index) = self.position(from_hint, movie_id) else {
            debug!(
                movie_id = %movie_id,
                list = from_hint.as_str(),
                "Dropped movie not found in hinted list"
            );
            return false;
        };

        let movie = self.list_mut(from_hint).remove(index);
        self.list_mut(target).push(movie);
        true
    }
}

impl From<UserRankingView> for DualListReorderModel {
    fn from(view: UserRankingView) -> Self {
        Self::new(view.ranked_movies, view.unranked_movies)
    }
}

/// Whether hovering `hover` while dragging the item at `drag` should move it.
///
/// Cross-list hovers always move. Within a list, a downward drag moves only
/// once the pointer is past the hovered row's midpoint going down, and an
/// upward drag only once past it going up. Hovering the dragged row itself
/// never moves.
pub fn should_trigger_move(drag: Slot, hover: Slot, past_midpoint: bool) -> bool {
    if drag.list != hover.list {
        return true;
    }

    drag.index != hover.index && past_midpoint
}

/// Derive the midpoint flag from the hovered row's vertical bounds.
///
/// Dragging down, the pointer must be at or below the row middle; dragging up,
/// at or above it.
pub fn pointer_past_midpoint(
    drag_index: usize,
    hover_index: usize,
    row_top: f64,
    row_bottom: f64,
    pointer_y: f64,
) -> bool {
    let middle = (row_bottom - row_top) / 2.0;
    let offset = pointer_y - row_top;

    match drag_index.cmp(&hover_index) {
        std::cmp::Ordering::Less => offset >= middle,
        std::cmp::Ordering::Greater => offset <= middle,
        std::cmp::Ordering::Equal => true,
    }
}

/// The item under the pointer during a live drag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragState {
    pub movie_id: MovieId,
    pub slot: Slot,
}

impl DragState {
    /// Pick up the item at `slot`, if there is one.
    pub fn begin(model: &DualListReorderModel, slot: Slot) -> Option<Self> {
        model.list(slot.list).get(slot.index).map(|movie| Self {
            movie_id: movie.id.clone(),
            slot,
        })
    }

    /// Feed one hover frame. Moves the item when the policy allows and follows
    /// it to where it landed. Returns whether the model changed.
    pub fn hover(
        &mut self,
        model: &mut DualListReorderModel,
        hover: Slot,
        past_midpoint: bool,
    ) -> bool {
        if !should_trigger_move(self.slot, hover, past_midpoint) {
            return false;
        }

        let moved =
            model.move_between_lists(self.slot.list, hover.list, self.slot.index, hover.index);
        if moved {
            if let Some(index) = model.position(hover.list, &self.movie_id) {
                self.slot = Slot::new(hover.list, index);
            }
        }
        moved
    }

    /// Finish the drag on the empty drop zone of the opposite list.
    pub fn drop_on_empty(&self, model: &mut DualListReorderModel) -> bool {
        model.drop_into_empty_list(&self.movie_id, self.slot.list, self.slot.list.other())
    }
}
