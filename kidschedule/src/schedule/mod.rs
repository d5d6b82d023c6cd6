//! Schedule model
//!
//! Pure value types and algorithms for the weekly class schedule:
//! - `time`: weekday and time-of-day values
//! - `conflict`: overlap detection and slot validation
//! - `packing`: per-day slot views and the packing list
//!
//! Nothing in this module performs I/O.

pub mod conflict;
pub mod packing;
pub mod time;

pub use conflict::{check_slot, find_conflict, has_conflict, validate_time_order};
pub use packing::{daily_packing_list, display_name, find_template, is_book, slots_for_day};
pub use time::{DayOfWeek, TimeOfDay};
