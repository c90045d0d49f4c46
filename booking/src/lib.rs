pub mod availability;
pub mod config;
pub mod db;
pub mod flow;
pub mod metrics;
pub mod model;
pub mod payment;
pub mod pricing;
pub mod repository;

pub mod error;
pub mod logger;
pub mod time;
