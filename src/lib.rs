//! Factory Planner Library
//!
//! Resolves production chains for a target item and rate, lays the machines
//! out on a plane, inserts splitters and mergers and routes the belts
//! between them.

pub mod calculator;
pub mod catalog;
pub mod config;
pub mod db;
pub mod edges;
pub mod entity;
pub mod error;
pub mod geometry;
pub mod import;
pub mod junction;
pub mod lanes;
pub mod layout;
pub mod models;
pub mod planner;
pub mod routing;
pub mod sample;
pub mod throughput;
