//! Overlap detection for weekly slots
//!
//! Slots occupy the half-open interval `[start, end)`: a class ending at 09:00
//! and another starting at 09:00 do not conflict.

use super::packing::find_template;
use super::time::TimeOfDay;
use crate::config::UNKNOWN_CLASS_NAME;
use crate::database::{ClassTemplate, Kid, ScheduleSlot};
use crate::error::{AppError, Result};

/// Returns the first slot in `existing` that overlaps `candidate` on the same day.
/// A slot never conflicts with itself (same id), so edits in place are allowed.
pub fn find_conflict<'a>(
    existing: &'a [ScheduleSlot],
    candidate: &ScheduleSlot,
) -> Option<&'a ScheduleSlot> {
    existing.iter().find(|slot| {
        slot.day_of_week == candidate.day_of_week
            && slot.id != candidate.id
            && candidate.start_time < slot.end_time
            && candidate.end_time > slot.start_time
    })
}

pub fn has_conflict(existing: &[ScheduleSlot], candidate: &ScheduleSlot) -> bool {
    find_conflict(existing, candidate).is_some()
}

pub fn validate_time_order(start: TimeOfDay, end: TimeOfDay) -> Result<()> {
    if start >= end {
        return Err(AppError::InvalidRange { start, end });
    }
    Ok(())
}

/// Validate a candidate slot against a kid's current schedule.
///
/// # Errors
/// - `InvalidRange` when the slot does not end after it starts.
/// - `Conflict` naming the first overlapping slot.
pub fn check_slot(kid: &Kid, candidate: &ScheduleSlot, templates: &[ClassTemplate]) -> Result<()> {
    validate_time_order(candidate.start_time, candidate.end_time)?;

    if let Some(existing) = find_conflict(&kid.schedule, candidate) {
        let class_name = find_template(templates, &existing.template_id)
            .map(|t| t.name.clone())
            .unwrap_or_else(|| UNKNOWN_CLASS_NAME.to_string());

        return Err(AppError::Conflict {
            slot_id: existing.id.clone(),
            class_name,
            start: existing.start_time,
            end: existing.end_time,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::DayOfWeek;

    fn slot(id: &str, template_id: &str, day: DayOfWeek, start: &str, end: &str) -> ScheduleSlot {
        ScheduleSlot {
            id: id.to_string(),
            template_id: template_id.to_string(),
            day_of_week: day,
            start_time: start.parse().unwrap(),
            end_time: end.parse().unwrap(),
        }
    }

    fn template(id: &str, name: &str) -> ClassTemplate {
        ClassTemplate {
            id: id.to_string(),
            name: name.to_string(),
            teacher: String::new(),
            items_to_bring: Vec::new(),
        }
    }

    #[test]
    fn test_overlap_is_detected() {
        let existing = vec![slot("a", "t", DayOfWeek::Monday, "08:00", "09:00")];
        let candidate = slot("b", "t", DayOfWeek::Monday, "08:30", "09:30");
        assert!(has_conflict(&existing, &candidate));
    }

    #[test]
    fn test_touching_endpoints_do_not_conflict() {
        let existing = vec![slot("a", "t", DayOfWeek::Monday, "08:00", "09:00")];
        let after = slot("b", "t", DayOfWeek::Monday, "09:00", "10:00");
        let before = slot("c", "t", DayOfWeek::Monday, "07:00", "08:00");
        assert!(!has_conflict(&existing, &after));
        assert!(!has_conflict(&existing, &before));
    }

    #[test]
    fn test_other_days_are_ignored() {
        let existing = vec![slot("a", "t", DayOfWeek::Monday, "08:00", "09:00")];
        let candidate = slot("b", "t", DayOfWeek::Tuesday, "08:00", "09:00");
        assert!(!has_conflict(&existing, &candidate));
    }

    #[test]
    fn test_editing_in_place_is_not_a_self_conflict() {
        let existing = vec![slot("a", "t", DayOfWeek::Monday, "08:00", "09:00")];
        let moved = slot("a", "t", DayOfWeek::Monday, "08:15", "09:15");
        assert!(!has_conflict(&existing, &moved));
    }

    #[test]
    fn test_conflict_is_symmetric() {
        let times = ["07:00", "07:30", "08:00", "08:30", "09:00", "09:30", "10:00"];
        let mut ranges = Vec::new();
        for (i, s) in times.iter().enumerate() {
            for e in &times[i + 1..] {
                ranges.push((*s, *e));
            }
        }

        for (a_start, a_end) in &ranges {
            for (b_start, b_end) in &ranges {
                let a = slot("a", "t", DayOfWeek::Sunday, a_start, a_end);
                let b = slot("b", "t", DayOfWeek::Sunday, b_start, b_end);
                assert_eq!(
                    has_conflict(std::slice::from_ref(&a), &b),
                    has_conflict(std::slice::from_ref(&b), &a),
                    "asymmetric for {}-{} vs {}-{}",
                    a_start,
                    a_end,
                    b_start,
                    b_end
                );
            }
        }
    }

    #[test]
    fn test_validate_time_order() {
        let eight: TimeOfDay = "08:00".parse().unwrap();
        let nine: TimeOfDay = "09:00".parse().unwrap();

        assert!(validate_time_order(eight, nine).is_ok());
        assert!(matches!(
            validate_time_order(nine, eight),
            Err(AppError::InvalidRange { .. })
        ));
        assert!(matches!(
            validate_time_order(eight, eight),
            Err(AppError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_check_slot_reports_conflicting_slot() {
        let kid = Kid {
            id: "k".to_string(),
            name: "Leo".to_string(),
            age: 8,
            grade: String::new(),
            schedule: vec![slot("math-slot", "math", DayOfWeek::Monday, "08:00", "09:00")],
        };
        let templates = vec![template("math", "Math"), template("art", "Art")];
        let candidate = slot("art-slot", "art", DayOfWeek::Monday, "08:30", "09:30");

        match check_slot(&kid, &candidate, &templates) {
            Err(AppError::Conflict {
                slot_id,
                class_name,
                start,
                end,
            }) => {
                assert_eq!(slot_id, "math-slot");
                assert_eq!(class_name, "Math");
                assert_eq!(start.to_string(), "08:00");
                assert_eq!(end.to_string(), "09:00");
            }
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    #[test]
    fn test_check_slot_with_deleted_template_names_another_class() {
        let kid = Kid {
            id: "k".to_string(),
            name: "Leo".to_string(),
            age: 8,
            grade: String::new(),
            schedule: vec![slot("old", "gone", DayOfWeek::Friday, "10:00", "11:00")],
        };
        let candidate = slot("new", "art", DayOfWeek::Friday, "10:30", "11:30");

        let err = check_slot(&kid, &candidate, &[]).unwrap_err();
        assert_eq!(err.to_string(), "Time conflict with another class (10:00-11:00)");
    }
}
