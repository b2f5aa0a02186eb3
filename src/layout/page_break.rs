//! # Page Break Decisions
//!
//! Logic for deciding what happens to a block that may not fit in the
//! space left on the current page. A block is a list of item heights: for
//! a message, its header-plus-first-line and then each further body line;
//! for a summary row, the row and its hash line as a single item.

/// Decide what to do when a block doesn't fit on the current page.
#[derive(Debug, Clone, PartialEq)]
pub enum BreakDecision {
    /// Place the entire block on the current page (it fits).
    Place,
    /// Move the entire block to the next page.
    MoveToNextPage,
    /// Split the block: place some items here, continue on the next page.
    Split {
        /// How many items fit on the current page.
        items_on_current_page: usize,
    },
}

/// Given the remaining space on a page and a list of item heights,
/// decide how to break.
///
/// Unbreakable blocks are never split. Breakable blocks (only those taller
/// than a whole page) are split with orphan/widow control: at least
/// `min_orphan_items` stay behind and at least `min_widow_items` move on.
pub fn decide_break(
    remaining_height: f64,
    item_heights: &[f64],
    is_breakable: bool,
    min_orphan_items: usize,
    min_widow_items: usize,
) -> BreakDecision {
    let total: f64 = item_heights.iter().sum();

    if total <= remaining_height {
        return BreakDecision::Place;
    }

    if !is_breakable {
        return BreakDecision::MoveToNextPage;
    }

    let fit_count = fitting_prefix(remaining_height, item_heights);
    let total_items = item_heights.len();

    // Too few items would stay on this page (orphan)
    if fit_count < min_orphan_items && fit_count < total_items {
        return BreakDecision::MoveToNextPage;
    }

    // Too few items would start the next page (widow): pull some along
    let remaining_items = total_items - fit_count;
    if remaining_items < min_widow_items && remaining_items > 0 {
        let adjusted = fit_count.saturating_sub(min_widow_items - remaining_items);
        if adjusted == 0 {
            return BreakDecision::MoveToNextPage;
        }
        return BreakDecision::Split {
            items_on_current_page: adjusted,
        };
    }

    if fit_count == 0 {
        return BreakDecision::MoveToNextPage;
    }

    BreakDecision::Split {
        items_on_current_page: fit_count,
    }
}

/// Number of leading items whose cumulative height fits in `available`.
pub fn fitting_prefix(available: f64, item_heights: &[f64]) -> usize {
    let mut running = 0.0;
    let mut fit_count = 0;
    for &h in item_heights {
        if running + h > available {
            break;
        }
        running += h;
        fit_count += 1;
    }
    fit_count
}
