use chrono::{DateTime, Datelike, NaiveDate};

use crate::models::{ApplicationStatus, JobApplication, DATE_FORMAT};

pub const DEFAULT_TOP_SKILLS: usize = 10;
pub const TIMELINE_MONTHS: usize = 12;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthlyCount {
    /// Short month name ("Jan").
    pub month: &'static str,
    /// Month with year for series spanning a year boundary ("Jan 2025").
    pub label: String,
    pub count: usize,
}

/// Count per distinct status, ordered by first occurrence in the input.
pub fn status_histogram(records: &[JobApplication]) -> Vec<(ApplicationStatus, usize)> {
    let mut counts: Vec<(ApplicationStatus, usize)> = Vec::new();
    for record in records {
        match counts.iter_mut().find(|(status, _)| *status == record.status) {
            Some((_, count)) => *count += 1,
            None => counts.push((record.status, 1)),
        }
    }
    counts
}

/// Count per industry, first-occurrence order. Records with an empty
/// industry are left out entirely.
pub fn industry_histogram(records: &[JobApplication]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for record in records {
        if record.company_industry.is_empty() {
            continue;
        }
        match counts
            .iter_mut()
            .find(|(industry, _)| *industry == record.company_industry)
        {
            Some((_, count)) => *count += 1,
            None => counts.push((record.company_industry.clone(), 1)),
        }
    }
    counts
}

/// Most frequent skills across all records, descending by count. The sort
/// is stable, so ties keep first-seen order. At most `limit` entries.
pub fn top_skills(records: &[JobApplication], limit: usize) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for record in records {
        for skill in &record.skills_required {
            match counts.iter_mut().find(|(name, _)| name == skill) {
                Some((_, count)) => *count += 1,
                None => counts.push((skill.clone(), 1)),
            }
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(limit);
    counts
}

/// Application volume per calendar month over the rolling 12-month window
/// ending at `reference`'s month. Always exactly 12 entries, oldest first;
/// months with no applications still appear with a zero count. Records
/// whose date does not parse count nowhere.
pub fn monthly_timeline(records: &[JobApplication], reference: NaiveDate) -> Vec<MonthlyCount> {
    let window: Vec<(i32, u32)> = (0..TIMELINE_MONTHS)
        .rev()
        .map(|back| months_back(reference.year(), reference.month(), back as i32))
        .collect();

    let mut counts = vec![0usize; TIMELINE_MONTHS];
    for record in records {
        let Some(date) = parse_date(&record.application_date) else {
            continue;
        };
        let key = (date.year(), date.month());
        if let Some(pos) = window.iter().position(|bucket| *bucket == key) {
            counts[pos] += 1;
        }
    }

    window
        .iter()
        .zip(counts)
        .map(|((year, month), count)| {
            let name = MONTH_NAMES[(*month - 1) as usize];
            MonthlyCount {
                month: name,
                label: format!("{} {}", name, year),
                count,
            }
        })
        .collect()
}

/// Applications with status Interview Scheduled and an interview date on or
/// after `now`, soonest first.
pub fn upcoming_interviews(records: &[JobApplication], now: NaiveDate) -> Vec<JobApplication> {
    let mut upcoming: Vec<(NaiveDate, JobApplication)> = records
        .iter()
        .filter(|record| record.status == ApplicationStatus::InterviewScheduled)
        .filter_map(|record| {
            parse_date(&record.interview_date)
                .filter(|date| *date >= now)
                .map(|date| (date, record.clone()))
        })
        .collect();
    upcoming.sort_by_key(|(date, _)| *date);
    upcoming.into_iter().map(|(_, record)| record).collect()
}

/// Stored dates are `YYYY-MM-DD`; older documents occasionally hold a full
/// RFC 3339 timestamp, so fall back to that.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

fn months_back(year: i32, month: u32, back: i32) -> (i32, u32) {
    let total = year * 12 + month as i32 - 1 - back;
    (total.div_euclid(12), (total.rem_euclid(12) + 1) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;

    fn record(status: ApplicationStatus) -> JobApplication {
        JobApplication {
            company_name: "Acme".to_string(),
            job_title: "Engineer".to_string(),
            status,
            priority_level: Priority::Medium,
            ..Default::default()
        }
    }

    fn dated(status: ApplicationStatus, date: &str) -> JobApplication {
        JobApplication {
            application_date: date.to_string(),
            ..record(status)
        }
    }

    #[test]
    fn test_status_histogram_counts_in_first_occurrence_order() {
        let records = vec![
            record(ApplicationStatus::Applied),
            record(ApplicationStatus::Applied),
            record(ApplicationStatus::Offer),
        ];
        let histogram = status_histogram(&records);
        assert_eq!(
            histogram,
            vec![
                (ApplicationStatus::Applied, 2),
                (ApplicationStatus::Offer, 1),
            ]
        );
    }

    #[test]
    fn test_status_histogram_empty_input() {
        assert!(status_histogram(&[]).is_empty());
    }

    #[test]
    fn test_industry_histogram_skips_empty_industries() {
        let mut with_industry = record(ApplicationStatus::Applied);
        with_industry.company_industry = "Fintech".to_string();
        let records = vec![
            record(ApplicationStatus::Applied),
            with_industry.clone(),
            with_industry,
        ];
        let histogram = industry_histogram(&records);
        assert_eq!(histogram, vec![("Fintech".to_string(), 2)]);
    }

    #[test]
    fn test_top_skills_descending_with_stable_ties() {
        let mut a = record(ApplicationStatus::Applied);
        a.skills_required = vec!["Rust".to_string(), "SQL".to_string()];
        let mut b = record(ApplicationStatus::Applied);
        b.skills_required = vec!["Rust".to_string(), "Go".to_string()];

        let skills = top_skills(&[a, b], 10);
        assert_eq!(skills[0], ("Rust".to_string(), 2));
        // SQL and Go tie at 1; SQL was seen first.
        assert_eq!(skills[1], ("SQL".to_string(), 1));
        assert_eq!(skills[2], ("Go".to_string(), 1));
    }

    #[test]
    fn test_top_skills_respects_limit() {
        let mut a = record(ApplicationStatus::Applied);
        a.skills_required = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        assert_eq!(top_skills(std::slice::from_ref(&a), 2).len(), 2);
        assert_eq!(top_skills(&[a], 10).len(), 3);
    }

    #[test]
    fn test_monthly_timeline_is_dense_with_twelve_entries() {
        let reference = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let timeline = monthly_timeline(&[], reference);
        assert_eq!(timeline.len(), TIMELINE_MONTHS);
        assert!(timeline.iter().all(|entry| entry.count == 0));
        // Rolling window: Apr 2024 through Mar 2025.
        assert_eq!(timeline[0].label, "Apr 2024");
        assert_eq!(timeline[11].label, "Mar 2025");
        assert_eq!(timeline[11].month, "Mar");
    }

    #[test]
    fn test_monthly_timeline_buckets_by_utc_month() {
        let reference = NaiveDate::from_ymd_opt(2025, 3, 15).unwrap();
        let records = vec![
            dated(ApplicationStatus::Applied, "2025-03-01"),
            dated(ApplicationStatus::Applied, "2025-03-28"),
            dated(ApplicationStatus::Rejected, "2024-04-09"),
            // Outside the window.
            dated(ApplicationStatus::Applied, "2024-03-31"),
            // Unparseable: counts nowhere.
            dated(ApplicationStatus::Applied, "soon"),
        ];
        let timeline = monthly_timeline(&records, reference);
        assert_eq!(timeline[11].count, 2);
        assert_eq!(timeline[0].count, 1);
        let total: usize = timeline.iter().map(|entry| entry.count).sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn test_monthly_timeline_same_year_window() {
        let reference = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        let timeline = monthly_timeline(&[], reference);
        assert_eq!(timeline[0].label, "Jan 2025");
        assert_eq!(timeline[11].label, "Dec 2025");
    }

    #[test]
    fn test_upcoming_interviews_sorted_and_filtered() {
        let now = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let mut soon = record(ApplicationStatus::InterviewScheduled);
        soon.interview_date = "2025-06-03".to_string();
        let mut later = record(ApplicationStatus::InterviewScheduled);
        later.interview_date = "2025-07-01".to_string();
        let mut past = record(ApplicationStatus::InterviewScheduled);
        past.interview_date = "2025-05-20".to_string();
        let mut wrong_status = record(ApplicationStatus::Interviewed);
        wrong_status.interview_date = "2025-06-10".to_string();
        let mut no_date = record(ApplicationStatus::InterviewScheduled);
        no_date.interview_date = String::new();

        let upcoming = upcoming_interviews(
            &[later.clone(), past, wrong_status, no_date, soon.clone()],
            now,
        );
        assert_eq!(upcoming.len(), 2);
        assert_eq!(upcoming[0].interview_date, soon.interview_date);
        assert_eq!(upcoming[1].interview_date, later.interview_date);
    }

    #[test]
    fn test_upcoming_interviews_includes_today() {
        let now = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let mut today = record(ApplicationStatus::InterviewScheduled);
        today.interview_date = "2025-06-01".to_string();
        assert_eq!(upcoming_interviews(&[today], now).len(), 1);
    }

    #[test]
    fn test_parse_date_accepts_rfc3339_fallback() {
        assert_eq!(
            parse_date("2025-02-11T09:30:00+01:00"),
            NaiveDate::from_ymd_opt(2025, 2, 11)
        );
        assert_eq!(parse_date("2025-02-11"), NaiveDate::from_ymd_opt(2025, 2, 11));
        assert_eq!(parse_date("next week"), None);
        assert_eq!(parse_date(""), None);
    }
}
