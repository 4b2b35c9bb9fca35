use std::collections::BTreeMap;

use validator::{Validate, ValidateEmail, ValidationError, ValidationErrors};

use crate::error::{Error, Result};
use crate::models::{today_string, ApplicationStatus, JobApplication, OfferDetails, Priority};
use crate::store::ApplicationStore;

pub const SALARY_SEPARATOR: char = '-';

// --- Draft schema ---

/// The editable form image of a record. Salary is held as two separate
/// min/max buffers and only composed at submit time; `offer_details` always
/// exists on a draft even when the stored record has none.
#[derive(Debug, Clone, PartialEq, Validate)]
pub struct ApplicationDraft {
    #[validate(length(min = 1, message = "Company name is required"))]
    pub company_name: String,
    pub company_industry: String,
    #[validate(length(min = 1, message = "Job title is required"))]
    pub job_title: String,
    pub job_type: String,
    pub location: String,
    #[validate(length(min = 1, message = "Application date is required"))]
    pub application_date: String,
    pub deadline: String,
    pub status: ApplicationStatus,
    pub priority_level: Priority,
    #[validate(custom(function = optional_url))]
    pub job_posting_link: String,
    pub salary_range_min: String,
    pub salary_range_max: String,
    pub contact_person: String,
    #[validate(custom(function = optional_email))]
    pub contact_email: String,
    pub contact_phone: String,
    pub follow_up_date: String,
    pub interview_date: String,
    pub job_description_summary: String,
    pub notes: String,
    pub resume_version: String,
    pub cover_letter: bool,
    pub referral: String,
    pub application_platform: String,
    pub skills_required: Vec<String>,
    pub offer_details: OfferDetails,
}

impl ApplicationDraft {
    /// A fresh draft with the documented defaults: status Applied, priority
    /// Medium, application date today (UTC), no cover letter.
    pub fn new() -> Self {
        Self {
            company_name: String::new(),
            company_industry: String::new(),
            job_title: String::new(),
            job_type: String::new(),
            location: String::new(),
            application_date: today_string(),
            deadline: String::new(),
            status: ApplicationStatus::Applied,
            priority_level: Priority::Medium,
            job_posting_link: String::new(),
            salary_range_min: String::new(),
            salary_range_max: String::new(),
            contact_person: String::new(),
            contact_email: String::new(),
            contact_phone: String::new(),
            follow_up_date: String::new(),
            interview_date: String::new(),
            job_description_summary: String::new(),
            notes: String::new(),
            resume_version: String::new(),
            cover_letter: false,
            referral: String::new(),
            application_platform: String::new(),
            skills_required: Vec::new(),
            offer_details: OfferDetails::default(),
        }
    }

    pub fn from_record(record: &JobApplication) -> Self {
        let (salary_range_min, salary_range_max) = split_salary_range(&record.salary_range);
        Self {
            company_name: record.company_name.clone(),
            company_industry: record.company_industry.clone(),
            job_title: record.job_title.clone(),
            job_type: record.job_type.clone(),
            location: record.location.clone(),
            application_date: record.application_date.clone(),
            deadline: record.deadline.clone(),
            status: record.status,
            priority_level: record.priority_level,
            job_posting_link: record.job_posting_link.clone(),
            salary_range_min,
            salary_range_max,
            contact_person: record.contact_person.clone(),
            contact_email: record.contact_email.clone(),
            contact_phone: record.contact_phone.clone(),
            follow_up_date: record.follow_up_date.clone(),
            interview_date: record.interview_date.clone(),
            job_description_summary: record.job_description_summary.clone(),
            notes: record.notes.clone(),
            resume_version: record.resume_version.clone(),
            cover_letter: record.cover_letter,
            referral: record.referral.clone(),
            application_platform: record.application_platform.clone(),
            skills_required: record.skills_required.clone(),
            offer_details: record.offer_details.clone().unwrap_or_default(),
        }
    }

    /// The outgoing record: composes the salary buffers and drops them.
    pub fn to_record(&self, id: Option<String>) -> JobApplication {
        JobApplication {
            id,
            company_name: self.company_name.clone(),
            company_industry: self.company_industry.clone(),
            job_title: self.job_title.clone(),
            job_type: self.job_type.clone(),
            location: self.location.clone(),
            application_date: self.application_date.clone(),
            deadline: self.deadline.clone(),
            status: self.status,
            priority_level: self.priority_level,
            job_posting_link: self.job_posting_link.clone(),
            salary_range: compose_salary_range(&self.salary_range_min, &self.salary_range_max),
            contact_person: self.contact_person.clone(),
            contact_email: self.contact_email.clone(),
            contact_phone: self.contact_phone.clone(),
            follow_up_date: self.follow_up_date.clone(),
            interview_date: self.interview_date.clone(),
            job_description_summary: self.job_description_summary.clone(),
            notes: self.notes.clone(),
            resume_version: self.resume_version.clone(),
            cover_letter: self.cover_letter,
            referral: self.referral.clone(),
            application_platform: self.application_platform.clone(),
            skills_required: self.skills_required.clone(),
            offer_details: Some(self.offer_details.clone()),
        }
    }
}

fn optional_url(value: &str) -> std::result::Result<(), ValidationError> {
    if value.is_empty() || url::Url::parse(value).is_ok() {
        return Ok(());
    }
    let mut error = ValidationError::new("url");
    error.message = Some("Must be a valid URL".into());
    Err(error)
}

fn optional_email(value: &str) -> std::result::Result<(), ValidationError> {
    if value.is_empty() || value.validate_email() {
        return Ok(());
    }
    let mut error = ValidationError::new("email");
    error.message = Some("Must be a valid email address".into());
    Err(error)
}

/// Splits the stored `min-max` composite into display buffers. An empty or
/// dash-less value lands entirely in the min buffer.
pub fn split_salary_range(range: &str) -> (String, String) {
    match range.split_once(SALARY_SEPARATOR) {
        Some((min, max)) => (min.to_string(), max.to_string()),
        None => (range.to_string(), String::new()),
    }
}

/// Both halves present or the composite is empty; never a partial value.
pub fn compose_salary_range(min: &str, max: &str) -> String {
    if min.is_empty() || max.is_empty() {
        String::new()
    } else {
        format!("{}{}{}", min, SALARY_SEPARATOR, max)
    }
}

pub fn field_messages(errors: &ValidationErrors) -> BTreeMap<&'static str, String> {
    let mut messages = BTreeMap::new();
    for (field, errs) in errors.field_errors() {
        if let Some(first) = errs.first() {
            let text = first
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("Invalid value for {}", field));
            messages.insert(field, text);
        }
    }
    messages
}

// --- Fields & actions ---

/// Text fields addressable by `FormAction::Set`. `key` matches the
/// validator's field name so errors can be looked up and cleared per field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    CompanyName,
    CompanyIndustry,
    JobTitle,
    JobType,
    Location,
    ApplicationDate,
    Deadline,
    JobPostingLink,
    SalaryRangeMin,
    SalaryRangeMax,
    ContactPerson,
    ContactEmail,
    ContactPhone,
    FollowUpDate,
    InterviewDate,
    JobDescriptionSummary,
    Notes,
    ResumeVersion,
    Referral,
    ApplicationPlatform,
    OfferSalary,
    OfferJoiningDate,
}

impl Field {
    pub const fn key(self) -> &'static str {
        match self {
            Field::CompanyName => "company_name",
            Field::CompanyIndustry => "company_industry",
            Field::JobTitle => "job_title",
            Field::JobType => "job_type",
            Field::Location => "location",
            Field::ApplicationDate => "application_date",
            Field::Deadline => "deadline",
            Field::JobPostingLink => "job_posting_link",
            Field::SalaryRangeMin => "salary_range_min",
            Field::SalaryRangeMax => "salary_range_max",
            Field::ContactPerson => "contact_person",
            Field::ContactEmail => "contact_email",
            Field::ContactPhone => "contact_phone",
            Field::FollowUpDate => "follow_up_date",
            Field::InterviewDate => "interview_date",
            Field::JobDescriptionSummary => "job_description_summary",
            Field::Notes => "notes",
            Field::ResumeVersion => "resume_version",
            Field::Referral => "referral",
            Field::ApplicationPlatform => "application_platform",
            Field::OfferSalary => "offer_salary",
            Field::OfferJoiningDate => "offer_joining_date",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Field::CompanyName => "Company Name",
            Field::CompanyIndustry => "Industry",
            Field::JobTitle => "Job Title",
            Field::JobType => "Job Type",
            Field::Location => "Location",
            Field::ApplicationDate => "Application Date",
            Field::Deadline => "Deadline",
            Field::JobPostingLink => "Posting Link",
            Field::SalaryRangeMin => "Salary Min",
            Field::SalaryRangeMax => "Salary Max",
            Field::ContactPerson => "Contact Person",
            Field::ContactEmail => "Contact Email",
            Field::ContactPhone => "Contact Phone",
            Field::FollowUpDate => "Follow-up Date",
            Field::InterviewDate => "Interview Date",
            Field::JobDescriptionSummary => "Summary",
            Field::Notes => "Notes",
            Field::ResumeVersion => "Resume Version",
            Field::Referral => "Referral",
            Field::ApplicationPlatform => "Platform",
            Field::OfferSalary => "Offer Salary",
            Field::OfferJoiningDate => "Joining Date",
        }
    }

    pub fn get(self, draft: &ApplicationDraft) -> &str {
        match self {
            Field::CompanyName => &draft.company_name,
            Field::CompanyIndustry => &draft.company_industry,
            Field::JobTitle => &draft.job_title,
            Field::JobType => &draft.job_type,
            Field::Location => &draft.location,
            Field::ApplicationDate => &draft.application_date,
            Field::Deadline => &draft.deadline,
            Field::JobPostingLink => &draft.job_posting_link,
            Field::SalaryRangeMin => &draft.salary_range_min,
            Field::SalaryRangeMax => &draft.salary_range_max,
            Field::ContactPerson => &draft.contact_person,
            Field::ContactEmail => &draft.contact_email,
            Field::ContactPhone => &draft.contact_phone,
            Field::FollowUpDate => &draft.follow_up_date,
            Field::InterviewDate => &draft.interview_date,
            Field::JobDescriptionSummary => &draft.job_description_summary,
            Field::Notes => &draft.notes,
            Field::ResumeVersion => &draft.resume_version,
            Field::Referral => &draft.referral,
            Field::ApplicationPlatform => &draft.application_platform,
            Field::OfferSalary => &draft.offer_details.salary,
            Field::OfferJoiningDate => &draft.offer_details.joining_date,
        }
    }

    fn slot(self, draft: &mut ApplicationDraft) -> &mut String {
        match self {
            Field::CompanyName => &mut draft.company_name,
            Field::CompanyIndustry => &mut draft.company_industry,
            Field::JobTitle => &mut draft.job_title,
            Field::JobType => &mut draft.job_type,
            Field::Location => &mut draft.location,
            Field::ApplicationDate => &mut draft.application_date,
            Field::Deadline => &mut draft.deadline,
            Field::JobPostingLink => &mut draft.job_posting_link,
            Field::SalaryRangeMin => &mut draft.salary_range_min,
            Field::SalaryRangeMax => &mut draft.salary_range_max,
            Field::ContactPerson => &mut draft.contact_person,
            Field::ContactEmail => &mut draft.contact_email,
            Field::ContactPhone => &mut draft.contact_phone,
            Field::FollowUpDate => &mut draft.follow_up_date,
            Field::InterviewDate => &mut draft.interview_date,
            Field::JobDescriptionSummary => &mut draft.job_description_summary,
            Field::Notes => &mut draft.notes,
            Field::ResumeVersion => &mut draft.resume_version,
            Field::Referral => &mut draft.referral,
            Field::ApplicationPlatform => &mut draft.application_platform,
            Field::OfferSalary => &mut draft.offer_details.salary,
            Field::OfferJoiningDate => &mut draft.offer_details.joining_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormAction {
    Set(Field, String),
    SetStatus(ApplicationStatus),
    SetPriority(Priority),
    SetCoverLetter(bool),
    SkillInput(String),
    CommitSkill,
    RemoveSkill(String),
    BenefitInput(String),
    CommitBenefit,
    RemoveBenefit(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Saved {
    Created(String),
    Updated(String),
}

impl Saved {
    pub fn id(&self) -> &str {
        match self {
            Saved::Created(id) | Saved::Updated(id) => id,
        }
    }
}

// --- Controller ---

/// Draft plus the transient state around it: the two chip-input buffers and
/// the per-field validation messages. All mutation goes through `apply`.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    pub id: Option<String>,
    pub draft: ApplicationDraft,
    pub skill_input: String,
    pub benefit_input: String,
    pub errors: BTreeMap<&'static str, String>,
}

impl FormState {
    /// Open-for-add: a defaulted draft and no id.
    pub fn new() -> Self {
        Self {
            id: None,
            draft: ApplicationDraft::new(),
            skill_input: String::new(),
            benefit_input: String::new(),
            errors: BTreeMap::new(),
        }
    }

    /// Open-for-edit: seeded from an existing record.
    pub fn for_record(record: &JobApplication) -> Self {
        Self {
            id: record.id.clone(),
            draft: ApplicationDraft::from_record(record),
            skill_input: String::new(),
            benefit_input: String::new(),
            errors: BTreeMap::new(),
        }
    }

    /// Back to the documented defaults. Runs whenever the form closes,
    /// saved or not.
    pub fn reset(&mut self) {
        *self = FormState::new();
    }

    pub fn is_edit(&self) -> bool {
        self.id.is_some()
    }

    /// Offer rows are shown only for these two statuses. Hidden values are
    /// retained, never cleared.
    pub fn offer_section_visible(&self) -> bool {
        matches!(
            self.draft.status,
            ApplicationStatus::Offer | ApplicationStatus::Accepted
        )
    }

    pub fn apply(&mut self, action: FormAction) {
        match action {
            FormAction::Set(field, value) => {
                self.errors.remove(field.key());
                *field.slot(&mut self.draft) = value;
            }
            FormAction::SetStatus(status) => self.draft.status = status,
            FormAction::SetPriority(priority) => self.draft.priority_level = priority,
            FormAction::SetCoverLetter(flag) => self.draft.cover_letter = flag,
            FormAction::SkillInput(text) => self.skill_input = text,
            FormAction::CommitSkill => {
                commit_entry(&mut self.skill_input, &mut self.draft.skills_required);
            }
            FormAction::RemoveSkill(value) => {
                remove_entry(&value, &mut self.draft.skills_required);
            }
            FormAction::BenefitInput(text) => self.benefit_input = text,
            FormAction::CommitBenefit => {
                commit_entry(&mut self.benefit_input, &mut self.draft.offer_details.benefits);
            }
            FormAction::RemoveBenefit(value) => {
                remove_entry(&value, &mut self.draft.offer_details.benefits);
            }
        }
    }

    /// Validate, compose, and persist. On validation failure the per-field
    /// messages land in `errors` and the store is never called. On gateway
    /// failure the draft survives untouched so the user can retry.
    pub fn submit(&mut self, store: &dyn ApplicationStore) -> Result<Saved> {
        if let Err(errors) = self.draft.validate() {
            self.errors = field_messages(&errors);
            return Err(Error::Validation(errors));
        }
        self.errors.clear();

        let record = self.draft.to_record(self.id.clone());
        let outcome = match &self.id {
            Some(id) => store.update(id, &record).map(|_| Saved::Updated(id.clone())),
            None => store.create(&record).map(Saved::Created),
        };

        match outcome {
            Ok(saved) => Ok(saved),
            Err(err) => {
                tracing::error!(error = %err, "failed to save application");
                Err(err)
            }
        }
    }
}

/// Chip commit: trim, skip empty without touching the buffer, suppress
/// duplicates, clear the buffer only when something was appended.
fn commit_entry(input: &mut String, entries: &mut Vec<String>) {
    let value = input.trim().to_string();
    if value.is_empty() {
        return;
    }
    if !entries.iter().any(|entry| *entry == value) {
        entries.push(value);
        input.clear();
    }
}

fn remove_entry(value: &str, entries: &mut Vec<String>) {
    if let Some(pos) = entries.iter().position(|entry| entry == value) {
        entries.remove(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MockApplicationStore;

    fn stored_record() -> JobApplication {
        JobApplication {
            id: Some("doc42".to_string()),
            company_name: "Acme".to_string(),
            company_industry: "Robotics".to_string(),
            job_title: "Engineer".to_string(),
            application_date: "2025-05-01".to_string(),
            status: ApplicationStatus::Offer,
            salary_range: "50000-70000".to_string(),
            skills_required: vec!["Rust".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_new_draft_has_documented_defaults() {
        let form = FormState::new();
        assert_eq!(form.draft.status, ApplicationStatus::Applied);
        assert_eq!(form.draft.priority_level, Priority::Medium);
        assert_eq!(form.draft.application_date, today_string());
        assert!(!form.draft.cover_letter);
        assert!(form.draft.skills_required.is_empty());
        assert!(form.draft.offer_details.benefits.is_empty());
        assert!(form.id.is_none());
        assert!(form.errors.is_empty());
    }

    #[test]
    fn test_for_record_splits_salary_and_defaults_offer() {
        let form = FormState::for_record(&stored_record());
        assert_eq!(form.id.as_deref(), Some("doc42"));
        assert_eq!(form.draft.salary_range_min, "50000");
        assert_eq!(form.draft.salary_range_max, "70000");
        // The stored record had no offerDetails; the draft gets the empty object.
        assert_eq!(form.draft.offer_details, OfferDetails::default());
    }

    #[test]
    fn test_for_record_is_idempotent() {
        let record = stored_record();
        assert_eq!(FormState::for_record(&record), FormState::for_record(&record));
    }

    #[test]
    fn test_split_salary_range_edge_cases() {
        assert_eq!(split_salary_range(""), (String::new(), String::new()));
        assert_eq!(
            split_salary_range("50000"),
            ("50000".to_string(), String::new())
        );
        assert_eq!(
            split_salary_range("50000-70000"),
            ("50000".to_string(), "70000".to_string())
        );
    }

    #[test]
    fn test_compose_salary_requires_both_halves() {
        assert_eq!(compose_salary_range("50000", "70000"), "50000-70000");
        assert_eq!(compose_salary_range("", "70000"), "");
        assert_eq!(compose_salary_range("50000", ""), "");
        assert_eq!(compose_salary_range("", ""), "");
    }

    #[test]
    fn test_set_overwrites_one_field_and_clears_its_error() {
        let mut form = FormState::new();
        form.errors.insert("company_name", "Company name is required".to_string());
        form.errors.insert("job_title", "Job title is required".to_string());

        form.apply(FormAction::Set(Field::CompanyName, "Acme".to_string()));

        assert_eq!(form.draft.company_name, "Acme");
        assert!(!form.errors.contains_key("company_name"));
        assert!(form.errors.contains_key("job_title"));
    }

    #[test]
    fn test_commit_skill_trims_appends_and_clears_buffer() {
        let mut form = FormState::new();
        form.apply(FormAction::SkillInput("  Rust  ".to_string()));
        form.apply(FormAction::CommitSkill);
        assert_eq!(form.draft.skills_required, vec!["Rust".to_string()]);
        assert!(form.skill_input.is_empty());
    }

    #[test]
    fn test_commit_skill_whitespace_only_is_a_noop() {
        let mut form = FormState::new();
        form.apply(FormAction::SkillInput("   ".to_string()));
        form.apply(FormAction::CommitSkill);
        assert!(form.draft.skills_required.is_empty());
        // The buffer is left as typed, not cleared.
        assert_eq!(form.skill_input, "   ");
    }

    #[test]
    fn test_commit_skill_duplicate_keeps_single_entry_and_buffer() {
        let mut form = FormState::new();
        form.apply(FormAction::SkillInput("Rust".to_string()));
        form.apply(FormAction::CommitSkill);
        form.apply(FormAction::SkillInput("Rust".to_string()));
        form.apply(FormAction::CommitSkill);
        assert_eq!(form.draft.skills_required, vec!["Rust".to_string()]);
        assert_eq!(form.skill_input, "Rust");
    }

    #[test]
    fn test_add_then_remove_skill_restores_original_list() {
        let mut form = FormState::for_record(&stored_record());
        let before = form.draft.skills_required.clone();
        form.apply(FormAction::SkillInput("Go".to_string()));
        form.apply(FormAction::CommitSkill);
        form.apply(FormAction::RemoveSkill("Go".to_string()));
        assert_eq!(form.draft.skills_required, before);
    }

    #[test]
    fn test_remove_skill_missing_is_a_noop() {
        let mut form = FormState::for_record(&stored_record());
        form.apply(FormAction::RemoveSkill("Cobol".to_string()));
        assert_eq!(form.draft.skills_required, vec!["Rust".to_string()]);
    }

    #[test]
    fn test_benefits_follow_the_same_commit_contract() {
        let mut form = FormState::new();
        form.apply(FormAction::BenefitInput(" Remote work ".to_string()));
        form.apply(FormAction::CommitBenefit);
        form.apply(FormAction::BenefitInput("Remote work".to_string()));
        form.apply(FormAction::CommitBenefit);
        assert_eq!(
            form.draft.offer_details.benefits,
            vec!["Remote work".to_string()]
        );
        form.apply(FormAction::RemoveBenefit("Remote work".to_string()));
        assert!(form.draft.offer_details.benefits.is_empty());
    }

    #[test]
    fn test_offer_section_visible_only_for_offer_and_accepted() {
        let mut form = FormState::new();
        assert!(!form.offer_section_visible());
        form.apply(FormAction::SetStatus(ApplicationStatus::Offer));
        assert!(form.offer_section_visible());
        form.apply(FormAction::SetStatus(ApplicationStatus::Accepted));
        assert!(form.offer_section_visible());
        form.apply(FormAction::SetStatus(ApplicationStatus::Rejected));
        assert!(!form.offer_section_visible());
    }

    #[test]
    fn test_offer_values_survive_status_changes() {
        let mut form = FormState::new();
        form.apply(FormAction::SetStatus(ApplicationStatus::Offer));
        form.apply(FormAction::Set(Field::OfferSalary, "90000".to_string()));
        form.apply(FormAction::SetStatus(ApplicationStatus::Applied));
        assert_eq!(form.draft.offer_details.salary, "90000");
        form.apply(FormAction::SetStatus(ApplicationStatus::Accepted));
        assert_eq!(form.draft.offer_details.salary, "90000");
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut form = FormState::for_record(&stored_record());
        form.apply(FormAction::Set(Field::Notes, "call back".to_string()));
        form.apply(FormAction::SkillInput("Go".to_string()));
        form.reset();
        assert_eq!(form, FormState::new());
    }

    #[test]
    fn test_submit_creates_with_composed_salary() {
        let mut form = FormState::new();
        form.apply(FormAction::Set(Field::CompanyName, "Acme".to_string()));
        form.apply(FormAction::Set(Field::JobTitle, "Engineer".to_string()));
        form.apply(FormAction::Set(Field::SalaryRangeMin, "50000".to_string()));
        form.apply(FormAction::Set(Field::SalaryRangeMax, "70000".to_string()));

        let mut store = MockApplicationStore::new();
        store
            .expect_create()
            .withf(|record: &JobApplication| {
                record.salary_range == "50000-70000"
                    && record.id.is_none()
                    && record.offer_details.is_some()
            })
            .times(1)
            .returning(|_| Ok("new-doc".to_string()));

        let saved = form.submit(&store).unwrap();
        assert_eq!(saved, Saved::Created("new-doc".to_string()));
        assert!(form.errors.is_empty());
    }

    #[test]
    fn test_submit_with_only_min_sends_empty_salary() {
        let mut form = FormState::new();
        form.apply(FormAction::Set(Field::CompanyName, "Acme".to_string()));
        form.apply(FormAction::Set(Field::JobTitle, "Engineer".to_string()));
        form.apply(FormAction::Set(Field::SalaryRangeMin, "50000".to_string()));

        let mut store = MockApplicationStore::new();
        store
            .expect_create()
            .withf(|record: &JobApplication| record.salary_range.is_empty())
            .times(1)
            .returning(|_| Ok("new-doc".to_string()));

        form.submit(&store).unwrap();
    }

    #[test]
    fn test_submit_update_path_uses_stored_id() {
        let mut form = FormState::for_record(&stored_record());
        form.apply(FormAction::Set(Field::Notes, "second round".to_string()));

        let mut store = MockApplicationStore::new();
        store
            .expect_update()
            .withf(|id: &str, record: &JobApplication| {
                id == "doc42" && record.notes == "second round"
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let saved = form.submit(&store).unwrap();
        assert_eq!(saved, Saved::Updated("doc42".to_string()));
    }

    #[test]
    fn test_submit_validation_failure_never_reaches_the_store() {
        let mut form = FormState::new();
        form.apply(FormAction::Set(Field::Notes, "keep me".to_string()));

        let mut store = MockApplicationStore::new();
        store.expect_create().never();
        store.expect_update().never();

        let err = form.submit(&store).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(form.errors.contains_key("company_name"));
        assert!(form.errors.contains_key("job_title"));
        // The draft survives for further editing.
        assert_eq!(form.draft.notes, "keep me");
    }

    #[test]
    fn test_submit_rejects_bad_url_and_email() {
        let mut form = FormState::new();
        form.apply(FormAction::Set(Field::CompanyName, "Acme".to_string()));
        form.apply(FormAction::Set(Field::JobTitle, "Engineer".to_string()));
        form.apply(FormAction::Set(Field::JobPostingLink, "not a url".to_string()));
        form.apply(FormAction::Set(Field::ContactEmail, "nobody@".to_string()));

        let mut store = MockApplicationStore::new();
        store.expect_create().never();

        assert!(form.submit(&store).is_err());
        assert_eq!(form.errors.get("job_posting_link").unwrap(), "Must be a valid URL");
        assert_eq!(
            form.errors.get("contact_email").unwrap(),
            "Must be a valid email address"
        );

        // Empty link and email are fine.
        form.apply(FormAction::Set(Field::JobPostingLink, String::new()));
        form.apply(FormAction::Set(Field::ContactEmail, String::new()));
        let mut store = MockApplicationStore::new();
        store.expect_create().times(1).returning(|_| Ok("id".to_string()));
        assert!(form.submit(&store).is_ok());
    }

    #[test]
    fn test_submit_gateway_failure_preserves_draft() {
        let mut form = FormState::new();
        form.apply(FormAction::Set(Field::CompanyName, "Acme".to_string()));
        form.apply(FormAction::Set(Field::JobTitle, "Engineer".to_string()));
        let draft_before = form.draft.clone();

        let mut store = MockApplicationStore::new();
        store
            .expect_create()
            .times(1)
            .returning(|_| Err(Error::Gateway("503: unavailable".to_string())));

        let err = form.submit(&store).unwrap_err();
        assert!(matches!(err, Error::Gateway(_)));
        assert_eq!(form.draft, draft_before);
        assert!(form.errors.is_empty());
    }
}
