//! Substack Feed - latest posts for a personal site
//!
//! This crate fetches a newsletter feed (through an RSS-to-JSON proxy or as
//! raw RSS), normalizes its entries, keeps a single time-boxed cache entry
//! with stale fallback, and pages through the result for a "load more" widget.

pub mod cache;
pub mod config;
pub mod db;
pub mod fetcher;
pub mod post;
pub mod routes;
pub mod viewmodel;
