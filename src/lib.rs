pub mod accounts;
pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod metrics;
pub mod models;
pub mod referral;
pub mod schema;
pub mod tasks;

#[macro_use]
extern crate diesel;
