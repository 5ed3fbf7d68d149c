// Library for tests to access modules

pub mod actions;
pub mod aggregator;
pub mod config;
pub mod error;
pub mod models;
pub mod registry;
pub mod routes;
pub mod stats;
pub mod supervisor;
pub mod tail;
pub mod view;
