//! Household service
//!
//! Business logic for kids, class templates and weekly slots.
//! Every mutation goes through the document handle, so each one is a
//! whole-document save.

use crate::config::{MAX_ITEMS_PER_TEMPLATE, MAX_KID_AGE, MAX_NAME_LENGTH, SUPPORTED_LOCALES};
use crate::database::{
    ClassTemplate, CreateKidRequest, Kid, SaveSlotRequest, SaveTemplateRequest, ScheduleSlot,
    UpdateKidRequest,
};
use crate::error::{AppError, Result};
use crate::schedule::{check_slot, daily_packing_list, slots_for_day, DayOfWeek};
use crate::services::documents::DocumentHandle;
use crate::services::images::ImagesService;
use serde::Serialize;
use uuid::Uuid;

/// Packing list of one kid for one day
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KidPackingList {
    pub kid_id: String,
    pub kid_name: String,
    pub day: DayOfWeek,
    pub class_count: usize,
    pub items: Vec<String>,
}

fn validate_name(field: &str, name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{} cannot be empty", field)));
    }
    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(AppError::Validation(format!(
            "{} cannot exceed {} characters",
            field, MAX_NAME_LENGTH
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_age(age: u32) -> Result<u32> {
    if age == 0 || age > MAX_KID_AGE {
        return Err(AppError::Validation(format!(
            "Age must be between 1 and {}",
            MAX_KID_AGE
        )));
    }
    Ok(age)
}

fn clean_items(items: &[String]) -> Result<Vec<String>> {
    let cleaned: Vec<String> = items
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();

    if cleaned.len() > MAX_ITEMS_PER_TEMPLATE {
        return Err(AppError::Validation(format!(
            "A class can list at most {} items",
            MAX_ITEMS_PER_TEMPLATE
        )));
    }
    Ok(cleaned)
}

/// Service for managing the household schedule
#[derive(Clone)]
pub struct HouseholdService {
    documents: DocumentHandle,
    images: ImagesService,
}

impl HouseholdService {
    pub fn new(documents: DocumentHandle, images: ImagesService) -> Self {
        Self { documents, images }
    }

    pub async fn list_kids(&self) -> Vec<Kid> {
        self.documents.read(|doc| doc.kids.clone()).await
    }

    pub async fn get_kid(&self, id: &str) -> Result<Kid> {
        self.documents
            .read(|doc| doc.kid(id).cloned())
            .await
            .ok_or_else(|| AppError::KidNotFound(id.to_string()))
    }

    /// Register a new kid with an empty schedule
    pub async fn add_kid(&self, req: CreateKidRequest) -> Result<Kid> {
        let kid = Kid {
            id: Uuid::new_v4().to_string(),
            name: validate_name("Name", &req.name)?,
            age: validate_age(req.age)?,
            grade: req.grade.trim().to_string(),
            schedule: Vec::new(),
        };

        tracing::info!("Adding kid: {}", kid.name);

        let added = kid.clone();
        self.documents
            .update(move |doc| {
                doc.kids.push(kid);
                Ok(())
            })
            .await?;

        Ok(added)
    }

    pub async fn update_kid(&self, req: UpdateKidRequest) -> Result<Kid> {
        let name = req.name.as_deref().map(|n| validate_name("Name", n)).transpose()?;
        let age = req.age.map(validate_age).transpose()?;

        tracing::debug!("Updating kid: {}", req.id);

        self.documents
            .update(|doc| {
                let kid = doc
                    .kid_mut(&req.id)
                    .ok_or_else(|| AppError::KidNotFound(req.id.clone()))?;

                if let Some(name) = name {
                    kid.name = name;
                }
                if let Some(age) = age {
                    kid.age = age;
                }
                if let Some(grade) = req.grade {
                    kid.grade = grade.trim().to_string();
                }
                Ok(kid.clone())
            })
            .await
    }

    /// Remove a kid together with their schedule
    pub async fn delete_kid(&self, id: &str) -> Result<()> {
        tracing::info!("Deleting kid: {}", id);

        self.documents
            .update(|doc| {
                let before = doc.kids.len();
                doc.kids.retain(|k| k.id != id);
                if doc.kids.len() == before {
                    return Err(AppError::KidNotFound(id.to_string()));
                }
                Ok(())
            })
            .await
    }

    pub async fn list_templates(&self) -> Vec<ClassTemplate> {
        self.documents.read(|doc| doc.templates.clone()).await
    }

    /// Create or edit a class template, then fetch images for its items.
    ///
    /// Images are requested one item at a time after the template is saved;
    /// generation problems never fail the save.
    pub async fn save_template(&self, req: SaveTemplateRequest) -> Result<ClassTemplate> {
        let name = validate_name("Class name", &req.name)?;
        let items = clean_items(&req.items)?;
        let teacher = req.teacher.trim().to_string();

        let template = self
            .documents
            .update(|doc| match req.id {
                Some(id) => {
                    let existing = doc
                        .templates
                        .iter_mut()
                        .find(|t| t.id == id)
                        .ok_or_else(|| AppError::TemplateNotFound(id.clone()))?;

                    existing.name = name;
                    existing.teacher = teacher;
                    existing.items_to_bring = items;
                    Ok(existing.clone())
                }
                None => {
                    let template = ClassTemplate {
                        id: Uuid::new_v4().to_string(),
                        name,
                        teacher,
                        items_to_bring: items,
                    };
                    doc.templates.push(template.clone());
                    Ok(template)
                }
            })
            .await?;

        tracing::info!(
            "Saved class {} with {} items",
            template.name,
            template.items_to_bring.len()
        );

        self.images.ensure_images(&template.items_to_bring).await;

        Ok(template)
    }

    /// Delete a template. Slots that reference it are left in place and
    /// simply stop contributing items.
    pub async fn delete_template(&self, id: &str) -> Result<()> {
        tracing::info!("Deleting class template: {}", id);

        self.documents
            .update(|doc| {
                let before = doc.templates.len();
                doc.templates.retain(|t| t.id != id);
                if doc.templates.len() == before {
                    return Err(AppError::TemplateNotFound(id.to_string()));
                }
                Ok(())
            })
            .await
    }

    /// Add a slot to a kid's week, or edit one in place.
    ///
    /// # Errors
    /// - `InvalidRange` or `Conflict` from slot validation; nothing is saved.
    /// - `KidNotFound`, `TemplateNotFound`, `SlotNotFound` for unknown ids.
    pub async fn save_slot(&self, kid_id: &str, req: SaveSlotRequest) -> Result<ScheduleSlot> {
        self.documents
            .update(|doc| {
                if doc.template(&req.template_id).is_none() {
                    return Err(AppError::TemplateNotFound(req.template_id.clone()));
                }

                let candidate = ScheduleSlot {
                    id: req.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string()),
                    template_id: req.template_id.clone(),
                    day_of_week: req.day_of_week,
                    start_time: req.start_time,
                    end_time: req.end_time,
                };

                let kid = doc
                    .kids
                    .iter()
                    .find(|k| k.id == kid_id)
                    .ok_or_else(|| AppError::KidNotFound(kid_id.to_string()))?;
                check_slot(kid, &candidate, &doc.templates)?;

                let kid = doc
                    .kid_mut(kid_id)
                    .ok_or_else(|| AppError::KidNotFound(kid_id.to_string()))?;

                match req.id {
                    Some(ref id) => {
                        let slot = kid
                            .schedule
                            .iter_mut()
                            .find(|s| &s.id == id)
                            .ok_or_else(|| AppError::SlotNotFound(id.clone()))?;
                        *slot = candidate.clone();
                    }
                    None => kid.schedule.push(candidate.clone()),
                }

                tracing::info!(
                    "Saved slot {} for kid {} on {} {}-{}",
                    candidate.id,
                    kid_id,
                    candidate.day_of_week,
                    candidate.start_time,
                    candidate.end_time
                );
                Ok(candidate)
            })
            .await
    }

    pub async fn delete_slot(&self, kid_id: &str, slot_id: &str) -> Result<()> {
        tracing::info!("Deleting slot {} for kid {}", slot_id, kid_id);

        self.documents
            .update(|doc| {
                let kid = doc
                    .kid_mut(kid_id)
                    .ok_or_else(|| AppError::KidNotFound(kid_id.to_string()))?;

                let before = kid.schedule.len();
                kid.schedule.retain(|s| s.id != slot_id);
                if kid.schedule.len() == before {
                    return Err(AppError::SlotNotFound(slot_id.to_string()));
                }
                Ok(())
            })
            .await
    }

    pub async fn locale(&self) -> String {
        self.documents.read(|doc| doc.locale.clone()).await
    }

    pub async fn set_locale(&self, locale: &str) -> Result<()> {
        if !SUPPORTED_LOCALES.contains(&locale) {
            return Err(AppError::Validation(format!("Unsupported locale: {}", locale)));
        }

        self.documents
            .update(|doc| {
                doc.locale = locale.to_string();
                Ok(())
            })
            .await?;

        tracing::info!("Locale set to {}", locale);
        Ok(())
    }

    /// A kid's slots for one day, in start order
    pub async fn day_schedule(&self, kid_id: &str, day: DayOfWeek) -> Result<Vec<ScheduleSlot>> {
        self.documents
            .read(|doc| {
                doc.kid(kid_id)
                    .map(|kid| slots_for_day(kid, day).into_iter().cloned().collect::<Vec<_>>())
            })
            .await
            .ok_or_else(|| AppError::KidNotFound(kid_id.to_string()))
    }

    pub async fn packing_list_for(&self, kid_id: &str, day: DayOfWeek) -> Result<Vec<String>> {
        self.documents
            .read(|doc| {
                doc.kid(kid_id)
                    .map(|kid| daily_packing_list(kid, day, &doc.templates))
            })
            .await
            .ok_or_else(|| AppError::KidNotFound(kid_id.to_string()))
    }

    /// Packing lists of every kid for one day
    pub async fn packing_lists_for_day(&self, day: DayOfWeek) -> Vec<KidPackingList> {
        self.documents
            .read(|doc| {
                doc.kids
                    .iter()
                    .map(|kid| KidPackingList {
                        kid_id: kid.id.clone(),
                        kid_name: kid.name.clone(),
                        day,
                        class_count: slots_for_day(kid, day).len(),
                        items: daily_packing_list(kid, day, &doc.templates),
                    })
                    .collect()
            })
            .await
    }

    /// Dashboard view: every kid's list for the current weekday
    pub async fn today_packing_lists(&self) -> Vec<KidPackingList> {
        self.packing_lists_for_day(DayOfWeek::today()).await
    }
}
