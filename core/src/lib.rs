//! Core library for the cadence productivity tracker.
//!
//! Everything stateful lives behind [`service::CadenceService`]: typed
//! records and validation in [`models`], the pure engines in [`streak`],
//! [`stats`], and [`pomodoro`], SQLite persistence in [`db`], and the live
//! snapshot fan-out in [`feed`].

pub mod db;
pub mod feed;
pub mod models;
pub mod pomodoro;
pub mod service;
pub mod stats;
pub mod streak;
