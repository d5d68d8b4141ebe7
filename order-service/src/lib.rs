//! Order Service - sales-agent order composition, document numbering and prefill.

pub mod config;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;
pub mod store;
