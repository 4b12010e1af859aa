//! # Repository Module
//!
//! One repository per entity. Each holds a pool handle and hides its SQL.
//!
//! ## Atomic Writers
//! Functions that must share a unit of work take `&mut SqliteConnection`
//! instead of using the pool:
//!
//! - [`inventory::apply_stock_change`] - guarded stock update plus movement
//! - `discount::redeem` - guarded `used_count` increment
//! - `customer::record_purchase` - purchase aggregates
//! - `transaction::insert_transaction` / `insert_item`
//!
//! The Checkout Engine and [`inventory::InventoryLedger`] call them with an
//! open `sqlx::Transaction`.
//!
//! ## Available Repositories
//!
//! - [`user::UserRepository`] - Operators and revoked session tokens
//! - [`category::CategoryRepository`] - Categories with product counts
//! - [`product::ProductRepository`] - Catalog
//! - [`inventory::InventoryLedger`] - Stock adjustments and audit trail
//! - [`customer::CustomerRepository`] - Customers and purchase aggregates
//! - [`discount::DiscountRepository`] - Discount rules and code checks
//! - [`transaction::TransactionRepository`] - Completed sales
//! - [`feedback::FeedbackRepository`] - Ratings and statistics
//! - [`report::ReportRepository`] - Period reports and dashboard

pub mod category;
pub mod customer;
pub mod discount;
pub mod feedback;
pub mod inventory;
pub mod product;
pub mod report;
pub mod transaction;
pub mod user;
