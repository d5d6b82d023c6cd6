//! KidSchedule library
//!
//! Local-first store for a household's weekly class schedules, the daily
//! packing lists derived from them, and a cache of item images.

pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod schedule;
pub mod services;
pub mod storage;
