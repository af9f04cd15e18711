//! Shift planning for dense 1..N partition ordering.
//!
//! Every mutation of an ordered partition moves a contiguous run of siblings
//! by exactly one position. [`ShiftPlan`] describes that run; the repository
//! executes it as a single `UPDATE` inside the mutation's transaction.

use crate::error::{Error, Result};

/// A contiguous run of sibling positions shifted by `delta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftPlan {
    /// Lowest affected position (inclusive)
    pub from: i64,
    /// Highest affected position (inclusive); `None` means "to the end"
    pub to: Option<i64>,
    /// `+1` or `-1`
    pub delta: i64,
}

impl ShiftPlan {
    /// Siblings at or after the insert position move down one place.
    #[must_use]
    pub const fn for_insert(order: i64) -> Self {
        Self {
            from: order,
            to: None,
            delta: 1,
        }
    }

    /// Siblings between the old and new position close the gap.
    ///
    /// Returns `None` when the position is unchanged.
    #[must_use]
    pub const fn for_move(old_order: i64, new_order: i64) -> Option<Self> {
        if old_order == new_order {
            None
        } else if new_order > old_order {
            Some(Self {
                from: old_order + 1,
                to: Some(new_order),
                delta: -1,
            })
        } else {
            Some(Self {
                from: new_order,
                to: Some(old_order - 1),
                delta: 1,
            })
        }
    }

    /// Siblings after the removed position move up one place.
    #[must_use]
    pub const fn for_delete(order: i64) -> Self {
        Self {
            from: order + 1,
            to: None,
            delta: -1,
        }
    }

    /// Whether a sibling at `order` is part of the shifted run.
    #[must_use]
    pub const fn contains(&self, order: i64) -> bool {
        order >= self.from
            && match self.to {
                Some(to) => order <= to,
                None => true,
            }
    }

    /// Position of a sibling after the plan is applied.
    #[must_use]
    pub const fn apply(&self, order: i64) -> i64 {
        if self.contains(order) {
            order + self.delta
        } else {
            order
        }
    }
}

/// A new item may take any position from 1 to one past the end.
pub fn validate_insert(count: i64, requested: i64) -> Result<()> {
    check_range(requested, count + 1)
}

/// An existing item may move to any occupied position.
pub fn validate_move(count: i64, requested: i64) -> Result<()> {
    check_range(requested, count)
}

fn check_range(requested: i64, max: i64) -> Result<()> {
    if requested >= 1 && requested <= max {
        Ok(())
    } else {
        Err(Error::InvalidOrder { requested, max })
    }
}
