//! Per-day views of a kid's schedule and the derived packing list

use super::time::DayOfWeek;
use crate::config::BOOK_PREFIX;
use crate::database::{ClassTemplate, Kid, ScheduleSlot};
use std::collections::HashSet;

pub fn find_template<'a>(templates: &'a [ClassTemplate], id: &str) -> Option<&'a ClassTemplate> {
    templates.iter().find(|t| t.id == id)
}

/// Slots on `day`, earliest first
pub fn slots_for_day(kid: &Kid, day: DayOfWeek) -> Vec<&ScheduleSlot> {
    let mut slots: Vec<&ScheduleSlot> = kid
        .schedule
        .iter()
        .filter(|s| s.day_of_week == day)
        .collect();
    slots.sort_by_key(|s| s.start_time);
    slots
}

/// Everything the kid needs to bring on `day`.
///
/// Items are collected in the order the day's slots are stored in the
/// schedule (not by start time) and deduplicated by exact name, keeping the
/// first occurrence. Slots whose template has been deleted contribute nothing.
pub fn daily_packing_list(kid: &Kid, day: DayOfWeek, templates: &[ClassTemplate]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut items = Vec::new();

    for slot in kid.schedule.iter().filter(|s| s.day_of_week == day) {
        let Some(template) = find_template(templates, &slot.template_id) else {
            tracing::debug!(
                "Skipping slot {} with dangling template {}",
                slot.id,
                slot.template_id
            );
            continue;
        };

        for item in &template.items_to_bring {
            if item.trim().is_empty() {
                continue;
            }
            if seen.insert(item.as_str()) {
                items.push(item.clone());
            }
        }
    }

    items
}

pub fn is_book(item: &str) -> bool {
    item.get(..BOOK_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(BOOK_PREFIX))
}

/// Name to show for an item: book titles lose their marker
pub fn display_name(item: &str) -> &str {
    if is_book(item) {
        item[BOOK_PREFIX.len()..].trim()
    } else {
        item
    }
}
