//! Encore DB Library
//!
//! Relational-store access for the review core: store traits consumed by the services,
//! their PostgreSQL repositories, pool setup and transaction utilities.

pub mod db;
