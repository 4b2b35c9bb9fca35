use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Today's date in the stored `YYYY-MM-DD` form, anchored to UTC.
pub fn today_string() -> String {
    Utc::now().date_naive().format(DATE_FORMAT).to_string()
}

// --- Status ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[default]
    Applied,
    #[serde(rename = "Interview Scheduled")]
    InterviewScheduled,
    Interviewed,
    Offer,
    Rejected,
    Accepted,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 6] = [
        ApplicationStatus::Applied,
        ApplicationStatus::InterviewScheduled,
        ApplicationStatus::Interviewed,
        ApplicationStatus::Offer,
        ApplicationStatus::Rejected,
        ApplicationStatus::Accepted,
    ];

    /// The stored wire name, as the documents carry it.
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "Applied",
            ApplicationStatus::InterviewScheduled => "Interview Scheduled",
            ApplicationStatus::Interviewed => "Interviewed",
            ApplicationStatus::Offer => "Offer",
            ApplicationStatus::Rejected => "Rejected",
            ApplicationStatus::Accepted => "Accepted",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], " ").as_str() {
            "applied" => Ok(ApplicationStatus::Applied),
            "interview scheduled" | "scheduled" => Ok(ApplicationStatus::InterviewScheduled),
            "interviewed" => Ok(ApplicationStatus::Interviewed),
            "offer" => Ok(ApplicationStatus::Offer),
            "rejected" => Ok(ApplicationStatus::Rejected),
            "accepted" => Ok(ApplicationStatus::Accepted),
            _ => Err(Error::Parse(format!(
                "Unknown status '{}'. Available: applied, scheduled, interviewed, offer, rejected, accepted",
                s
            ))),
        }
    }
}

// --- Priority ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(Error::Parse(format!(
                "Unknown priority '{}'. Available: low, medium, high",
                s
            ))),
        }
    }
}

// --- Records ---

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OfferDetails {
    pub salary: String,
    pub benefits: Vec<String>,
    pub joining_date: String,
}

/// One tracked application, as stored. Dates are plain `YYYY-MM-DD`
/// strings; `salary_range` is the `min-max` composite or empty.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobApplication {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub company_name: String,
    pub company_industry: String,
    pub job_title: String,
    pub job_type: String,
    pub location: String,
    pub application_date: String,
    pub deadline: String,
    pub status: ApplicationStatus,
    pub priority_level: Priority,
    pub job_posting_link: String,
    pub salary_range: String,
    pub contact_person: String,
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
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offer_details: Option<OfferDetails>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_accepts_wire_names_and_shorthands() {
        assert_eq!(
            "Interview Scheduled".parse::<ApplicationStatus>().unwrap(),
            ApplicationStatus::InterviewScheduled
        );
        assert_eq!(
            "scheduled".parse::<ApplicationStatus>().unwrap(),
            ApplicationStatus::InterviewScheduled
        );
        assert_eq!(
            "interview-scheduled".parse::<ApplicationStatus>().unwrap(),
            ApplicationStatus::InterviewScheduled
        );
        assert_eq!(
            "APPLIED".parse::<ApplicationStatus>().unwrap(),
            ApplicationStatus::Applied
        );
    }

    #[test]
    fn test_status_parse_rejects_unknown() {
        let err = "withdrawn".parse::<ApplicationStatus>().unwrap_err();
        assert!(err.to_string().contains("Unknown status"));
    }

    #[test]
    fn test_status_display_matches_wire_name() {
        assert_eq!(
            ApplicationStatus::InterviewScheduled.to_string(),
            "Interview Scheduled"
        );
        assert_eq!(ApplicationStatus::Offer.to_string(), "Offer");
    }

    #[test]
    fn test_priority_defaults_to_medium() {
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn test_record_serializes_with_wire_field_names() {
        let record = JobApplication {
            company_name: "Acme".to_string(),
            status: ApplicationStatus::InterviewScheduled,
            ..Default::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["companyName"], "Acme");
        assert_eq!(json["status"], "Interview Scheduled");
        assert_eq!(json["coverLetter"], false);
        // Unsaved records carry no id key at all.
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_record_deserializes_with_missing_fields() {
        let record: JobApplication =
            serde_json::from_str(r#"{"companyName":"Acme","jobTitle":"Engineer"}"#).unwrap();
        assert_eq!(record.company_name, "Acme");
        assert_eq!(record.status, ApplicationStatus::Applied);
        assert_eq!(record.priority_level, Priority::Medium);
        assert!(record.skills_required.is_empty());
        assert!(record.offer_details.is_none());
    }
}
