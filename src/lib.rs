//! Outage SLA reporting engine.
//!
//! Reconciles an alarm/event log, the canonical site inventory, the prior
//! period's redeem summary and a power-availability extract into one report
//! table per tenant.
pub mod alias;
pub mod availability;
pub mod config;
pub mod duration;
pub mod error;
pub mod events;
pub mod inventory;
pub mod loader;
pub mod output;
pub mod redeem;
pub mod reports;
pub mod types;
pub mod util;
