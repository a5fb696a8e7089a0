//! Route modules for the API server
//!
//! - auth: login, logout and the current session
//! - payouts: pending payouts, process, confirm and settle
//! - transfers: manual transfers
//! - closures: cash closure listing and approval
//! - revenue: platform revenue report
//! - ledger: ledger history and active balances

pub mod auth;
pub mod closures;
pub mod ledger;
pub mod payouts;
pub mod revenue;
pub mod transfers;
