//! Notification keys and fixed identifiers.
//!
//! Keys are stable strings a presentation layer can translate or style; the
//! accompanying message is a plain English fallback.

// Storage -------------------------------------------------------------------
/// Fixed identifier under which a session is saved.
pub const SAVE_KEY: &str = "pressroom.save";

// Order events --------------------------------------------------------------
pub(crate) const NOTE_ORDER_ACCEPTED: &str = "order.accepted";
pub(crate) const NOTE_ORDER_MANAGER_ACCEPTED: &str = "order.manager-accepted";
pub(crate) const NOTE_ORDER_COMPLETED: &str = "order.completed";
pub(crate) const NOTE_ORDER_COMPLETED_LATE: &str = "order.completed-late";
pub(crate) const NOTE_ORDER_EXPIRED: &str = "order.expired";
pub(crate) const NOTE_ORDERS_ARRIVED: &str = "order.arrived";

// Staff events --------------------------------------------------------------
pub(crate) const NOTE_WORKER_HIRED: &str = "employee.worker-hired";
pub(crate) const NOTE_MANAGER_HIRED: &str = "employee.manager-hired";
pub(crate) const NOTE_WORKER_ASSIGNED: &str = "employee.assigned";
pub(crate) const NOTE_WORKER_UNASSIGNED: &str = "employee.unassigned";
pub(crate) const NOTE_NO_FREE_WORKER: &str = "employee.no-free-worker";

// Calendar events -----------------------------------------------------------
pub(crate) const NOTE_DAY_START: &str = "system.day-start";
pub(crate) const NOTE_RARE_DAY: &str = "system.rare-day";
pub(crate) const NOTE_DAY_END: &str = "system.day-end";
