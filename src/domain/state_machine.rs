//! Order status transitions and edit locks.
//!
//! ```text
//! PENDING_REVIEW ─┬─> ACCEPTED ─┬─> PROCESSING ──> SHIPPED ──> DELIVERED
//!                 └─> REJECTED ─┘
//! CANCELLED is reachable from PENDING_REVIEW, ACCEPTED, REJECTED and PROCESSING.
//! ```

use super::errors::DomainError;
use super::order::OrderStatus;

impl OrderStatus {
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (PendingReview, Accepted | Rejected | Cancelled)
                | (Accepted, Processing | Cancelled)
                | (Rejected, Processing | Cancelled)
                | (Processing, Shipped | Cancelled)
                | (Shipped, Delivered)
        )
    }

    /// Contents (items, address, charges, discount) are frozen in these states.
    pub fn is_edit_locked(self) -> bool {
        matches!(
            self,
            OrderStatus::Shipped | OrderStatus::Delivered | OrderStatus::Cancelled
        )
    }

    pub fn is_final(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

pub fn check_transition(current: OrderStatus, next: OrderStatus) -> Result<(), DomainError> {
    if current.can_transition_to(next) {
        return Ok(());
    }
    if current.is_final() {
        return Err(DomainError::validation(format!(
            "Order is {} and can no longer change status",
            current
        )));
    }
    Err(DomainError::validation(format!(
        "Cannot move order from {} to {}",
        current, next
    )))
}

pub fn ensure_editable(current: OrderStatus) -> Result<(), DomainError> {
    if current.is_edit_locked() {
        return Err(DomainError::validation(format!(
            "Order is {} and can no longer be edited",
            current
        )));
    }
    Ok(())
}

pub fn history_comment(next: OrderStatus, comment: Option<String>) -> String {
    comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| format!("Status changed to {}", next))
}
