use crate::db_types::{Disposition, OrderId};

/// A guarded status change: applies only if the order is still in `expected`.
#[derive(Debug, Clone)]
pub struct DispositionUpdate {
    pub order_id: OrderId,
    pub expected: Disposition,
    pub new: Disposition,
    /// User id of whoever asked for the change
    pub actor: String,
    pub reason: Option<String>,
}
