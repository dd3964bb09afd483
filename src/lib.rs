//! Hjertebro - donation session gateway for Støt med Hjerte
//!
//! This library provides the core functionality for the donation gateway,
//! including the Airtable record-store client, the Frisbii billing client,
//! the HTTP handlers, and the reconciliation poller.

pub mod billing;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod id;
pub mod models;
pub mod poller;
pub mod rate_limit;
pub mod state;
pub mod store;
