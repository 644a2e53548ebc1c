//! src/lib.rs
pub mod configuration;
pub mod error;
pub mod executors;
pub mod fileserver;
pub mod job;
pub mod mappers;
pub mod master;
pub mod merger;
pub mod naming;
pub mod partition;
pub mod reducers;
pub mod splitter;
pub mod startup;
pub mod store;
pub mod telemetry;
pub mod worker;
