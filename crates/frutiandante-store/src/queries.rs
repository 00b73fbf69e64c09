//! # Catalogue and Order Queries
//!
//! Prebuilt queries used by the storefront and the admin console. Field
//! names are the camelCase names stored in documents.

use frutiandante_core::{Category, Order, OrderStatus, Product, UserProfile, UserRole};

use crate::target::{Direction, Query};

/// Default page size of the admin order list.
pub const RECENT_ORDERS_LIMIT: usize = 50;

/// Products shown in the storefront, alphabetically.
pub fn active_products() -> Query {
    Query::of::<Product>()
        .where_eq("isActive", true)
        .order_by("name", Direction::Ascending)
}

/// Every product, active or not (admin catalogue).
pub fn all_products() -> Query {
    Query::of::<Product>().order_by("name", Direction::Ascending)
}

pub fn products_in_category(category_id: &str) -> Query {
    Query::of::<Product>()
        .where_eq("categoryId", category_id)
        .where_eq("isActive", true)
        .order_by("name", Direction::Ascending)
}

/// Categories in menu order.
pub fn categories() -> Query {
    Query::of::<Category>().order_by("sortOrder", Direction::Ascending)
}

/// Newest orders first.
pub fn recent_orders(limit: usize) -> Query {
    Query::of::<Order>()
        .order_by("createdAt", Direction::Descending)
        .limit(limit)
}

pub fn orders_with_status(status: OrderStatus) -> Query {
    Query::of::<Order>()
        .where_eq("status", status.as_str())
        .order_by("createdAt", Direction::Descending)
}

/// A customer's order history, newest first.
pub fn orders_for_user(uid: &str) -> Query {
    Query::of::<Order>()
        .where_eq("userId", uid)
        .order_by("createdAt", Direction::Descending)
}

/// Orders that count towards the loyalty discount.
pub fn completed_orders_for_user(uid: &str) -> Query {
    Query::of::<Order>()
        .where_eq("userId", uid)
        .where_eq("status", OrderStatus::Completed.as_str())
}

/// Registered customers (admin console).
pub fn customers() -> Query {
    Query::of::<UserProfile>()
        .where_eq("role", UserRole::Customer.as_str())
        .order_by("email", Direction::Ascending)
}
