mod auth;
mod config;
mod error;
mod firestore;
mod form;
mod models;
mod stats;
mod store;
mod tui;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use auth::AuthClient;
use config::Config;
use error::Error;
use firestore::FirestoreStore;
use form::{Field, FormAction, FormState};
use models::{ApplicationStatus, JobApplication, Priority};
use store::ApplicationStore;

#[derive(Parser)]
#[command(name = "applied")]
#[command(about = "Personal job application tracker - record, browse, and analyze applications")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and cache the session
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Path to password file
        #[arg(short, long, default_value = "~/.applied.password.txt")]
        password_file: String,
    },

    /// Create an account and sign in
    Signup {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Path to password file
        #[arg(short, long, default_value = "~/.applied.password.txt")]
        password_file: String,
    },

    /// Remove the cached session
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Add an application without opening the form
    Add {
        /// Company name
        #[arg(long)]
        company: String,

        /// Job title
        #[arg(long)]
        title: String,

        /// Company industry
        #[arg(long)]
        industry: Option<String>,

        /// Job location
        #[arg(long)]
        location: Option<String>,

        /// Job type (e.g. Full-time, Contract)
        #[arg(long)]
        job_type: Option<String>,

        /// Application date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Status (applied, scheduled, interviewed, offer, rejected, accepted)
        #[arg(long)]
        status: Option<ApplicationStatus>,

        /// Priority (low, medium, high)
        #[arg(long)]
        priority: Option<Priority>,

        /// Job posting URL
        #[arg(long)]
        link: Option<String>,

        /// Lower salary bound
        #[arg(long)]
        salary_min: Option<String>,

        /// Upper salary bound
        #[arg(long)]
        salary_max: Option<String>,

        /// Required skill (repeatable)
        #[arg(long = "skill")]
        skills: Vec<String>,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,

        /// Platform the application went through
        #[arg(long)]
        platform: Option<String>,
    },

    /// Open the form to add an application
    New,

    /// Open the form for an existing application
    Edit {
        /// Application ID
        id: String,
    },

    /// List applications
    List {
        /// Filter by status (applied, scheduled, interviewed, offer, rejected, accepted)
        #[arg(short, long)]
        status: Option<ApplicationStatus>,

        /// Print raw JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show application details
    Show {
        /// Application ID
        id: String,
    },

    /// Delete an application
    Delete {
        /// Application ID
        id: String,
    },

    /// Browse applications in the terminal UI
    Browse {
        /// Filter by status (applied, scheduled, interviewed, offer, rejected, accepted)
        #[arg(short, long)]
        status: Option<ApplicationStatus>,
    },

    /// Show the application dashboard
    Stats {
        /// Number of top skills to show
        #[arg(short, long, default_value_t = stats::DEFAULT_TOP_SKILLS)]
        top: usize,
    },

    /// List upcoming interviews
    Interviews,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Login {
            email,
            password_file,
        } => {
            let config = Config::from_env()?;
            let password = read_password_file(&password_file)?;
            let client = AuthClient::new(config);
            let session = client.sign_in(&email, &password)?;
            auth::save_session(&config::session_path(), &session)?;
            println!("Signed in as {}", session.email);
        }

        Commands::Signup {
            email,
            password_file,
        } => {
            let config = Config::from_env()?;
            let password = read_password_file(&password_file)?;
            let client = AuthClient::new(config);
            let session = client.sign_up(&email, &password)?;
            auth::save_session(&config::session_path(), &session)?;
            println!("Account created for {}", session.email);
        }

        Commands::Logout => {
            if auth::clear_session(&config::session_path())? {
                println!("Signed out.");
            } else {
                println!("No active session.");
            }
        }

        Commands::Whoami => match auth::load_session(&config::session_path())? {
            Some(session) => {
                println!("Signed in as {}", session.email);
                if session.is_expired(Utc::now()) {
                    println!("Session expired; it will refresh on the next command.");
                }
            }
            None => println!("Not signed in."),
        },

        Commands::Add {
            company,
            title,
            industry,
            location,
            job_type,
            date,
            status,
            priority,
            link,
            salary_min,
            salary_max,
            skills,
            notes,
            platform,
        } => {
            let store = open_store()?;

            let mut form = FormState::new();
            form.apply(FormAction::Set(Field::CompanyName, company));
            form.apply(FormAction::Set(Field::JobTitle, title));
            if let Some(value) = industry {
                form.apply(FormAction::Set(Field::CompanyIndustry, value));
            }
            if let Some(value) = location {
                form.apply(FormAction::Set(Field::Location, value));
            }
            if let Some(value) = job_type {
                form.apply(FormAction::Set(Field::JobType, value));
            }
            if let Some(value) = date {
                form.apply(FormAction::Set(Field::ApplicationDate, value));
            }
            if let Some(value) = status {
                form.apply(FormAction::SetStatus(value));
            }
            if let Some(value) = priority {
                form.apply(FormAction::SetPriority(value));
            }
            if let Some(value) = link {
                form.apply(FormAction::Set(Field::JobPostingLink, value));
            }
            if let Some(value) = salary_min {
                form.apply(FormAction::Set(Field::SalaryRangeMin, value));
            }
            if let Some(value) = salary_max {
                form.apply(FormAction::Set(Field::SalaryRangeMax, value));
            }
            for skill in skills {
                form.apply(FormAction::SkillInput(skill));
                form.apply(FormAction::CommitSkill);
            }
            if let Some(value) = notes {
                form.apply(FormAction::Set(Field::Notes, value));
            }
            if let Some(value) = platform {
                form.apply(FormAction::Set(Field::ApplicationPlatform, value));
            }

            match form.submit(&store) {
                Ok(saved) => println!("Added application {}", saved.id()),
                Err(Error::Validation(_)) => {
                    let mut message = String::from("Validation failed:");
                    for (field, text) in &form.errors {
                        message.push_str(&format!("\n  {}: {}", field, text));
                    }
                    return Err(anyhow!(message));
                }
                Err(err) => return Err(err.into()),
            }
        }

        Commands::New => {
            let store = open_store()?;
            match tui::run_form(&store, None)? {
                Some(saved) => println!("Added application {}", saved.id()),
                None => println!("Cancelled."),
            }
        }

        Commands::Edit { id } => {
            let store = open_store()?;
            let record = find_record(&store, &id)?;
            match tui::run_form(&store, Some(&record))? {
                Some(saved) => println!("Saved application {}", saved.id()),
                None => println!("Cancelled."),
            }
        }

        Commands::List { status, json } => {
            let store = open_store()?;
            let records = match status {
                Some(status) => store.list_by_status(status)?,
                None => store.list()?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No applications found.");
            } else {
                println!(
                    "{:<22} {:<20} {:<24} {:<24} {:<12} {:<8}",
                    "ID", "STATUS", "COMPANY", "TITLE", "APPLIED", "PRIORITY"
                );
                println!("{}", "-".repeat(115));
                for record in &records {
                    println!(
                        "{:<22} {:<20} {:<24} {:<24} {:<12} {:<8}",
                        truncate(record.id.as_deref().unwrap_or("-"), 20),
                        record.status.as_str(),
                        truncate(&record.company_name, 22),
                        truncate(&record.job_title, 22),
                        record.application_date,
                        record.priority_level.as_str(),
                    );
                }
            }
        }

        Commands::Show { id } => {
            let store = open_store()?;
            let record = find_record(&store, &id)?;
            print_record(&record);
        }

        Commands::Delete { id } => {
            let store = open_store()?;
            store.delete(&id)?;
            println!("Deleted application {}", id);
        }

        Commands::Browse { status } => {
            let store = open_store()?;
            tui::run_browse(&store, status)?;
        }

        Commands::Stats { top } => {
            let store = open_store()?;
            let records = store.list()?;
            if records.is_empty() {
                println!("No applications found.");
            } else {
                print_stats(&records, top);
            }
        }

        Commands::Interviews => {
            let store = open_store()?;
            let records = store.list()?;
            let interviews = stats::upcoming_interviews(&records, Utc::now().date_naive());
            if interviews.is_empty() {
                println!("No upcoming interviews.");
            } else {
                println!("{:<12} {:<26} {:<26}", "DATE", "COMPANY", "TITLE");
                println!("{}", "-".repeat(66));
                for record in &interviews {
                    println!(
                        "{:<12} {:<26} {:<26}",
                        record.interview_date,
                        truncate(&record.company_name, 24),
                        truncate(&record.job_title, 24)
                    );
                }
            }
        }
    }

    Ok(())
}

/// Environment config plus a live session; every store-backed command
/// starts here.
fn open_store() -> Result<FirestoreStore> {
    let config = Config::from_env()?;
    let client = AuthClient::new(config.clone());
    let session = client.ensure_session()?;
    Ok(FirestoreStore::new(&config, &session))
}

fn find_record(store: &dyn ApplicationStore, id: &str) -> Result<JobApplication> {
    let record = store
        .list()?
        .into_iter()
        .find(|record| record.id.as_deref() == Some(id))
        .ok_or_else(|| Error::NotFound(format!("Application '{}' not found", id)))?;
    Ok(record)
}

fn read_password_file(password_file: &str) -> Result<String> {
    let path = expand_home(password_file);
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read password file: {}", path.display()))?;
    Ok(raw.trim().to_string())
}

// Expand ~ in path
fn expand_home(path: &str) -> PathBuf {
    if path.starts_with("~/") {
        let home = std::env::var("HOME").unwrap_or_default();
        PathBuf::from(format!("{}/{}", home, &path[2..]))
    } else {
        PathBuf::from(path)
    }
}

fn print_record(record: &JobApplication) {
    println!("Application {}", record.id.as_deref().unwrap_or("(unsaved)"));
    println!("Company: {}", record.company_name);
    if !record.company_industry.is_empty() {
        println!("Industry: {}", record.company_industry);
    }
    println!("Title: {}", record.job_title);
    if !record.job_type.is_empty() {
        println!("Type: {}", record.job_type);
    }
    if !record.location.is_empty() {
        println!("Location: {}", record.location);
    }
    println!("Status: {}", record.status);
    println!("Priority: {}", record.priority_level);
    println!("Applied: {}", record.application_date);
    if !record.deadline.is_empty() {
        println!("Deadline: {}", record.deadline);
    }
    if !record.follow_up_date.is_empty() {
        println!("Follow-up: {}", record.follow_up_date);
    }
    if !record.interview_date.is_empty() {
        println!("Interview: {}", record.interview_date);
    }
    if !record.application_platform.is_empty() {
        println!("Platform: {}", record.application_platform);
    }
    if !record.job_posting_link.is_empty() {
        println!("Link: {}", record.job_posting_link);
    }
    if !record.salary_range.is_empty() {
        println!("Salary: {}", record.salary_range);
    }
    if !record.contact_person.is_empty() {
        println!("Contact: {}", record.contact_person);
    }
    if !record.contact_email.is_empty() {
        println!("Contact email: {}", record.contact_email);
    }
    if !record.contact_phone.is_empty() {
        println!("Contact phone: {}", record.contact_phone);
    }
    if !record.resume_version.is_empty() {
        println!("Resume: {}", record.resume_version);
    }
    if !record.referral.is_empty() {
        println!("Referral: {}", record.referral);
    }
    println!("Cover letter: {}", if record.cover_letter { "yes" } else { "no" });
    if !record.skills_required.is_empty() {
        println!("Skills: {}", record.skills_required.join(", "));
    }

    let offer_relevant = matches!(
        record.status,
        ApplicationStatus::Offer | ApplicationStatus::Accepted
    );
    if offer_relevant {
        if let Some(offer) = &record.offer_details {
            println!("\n--- Offer ---");
            if !offer.salary.is_empty() {
                println!("Salary: {}", offer.salary);
            }
            if !offer.joining_date.is_empty() {
                println!("Joining: {}", offer.joining_date);
            }
            if !offer.benefits.is_empty() {
                println!("Benefits: {}", offer.benefits.join(", "));
            }
        }
    }

    if !record.job_description_summary.is_empty() {
        println!("\n--- Summary ---\n{}", record.job_description_summary);
    }
    if !record.notes.is_empty() {
        println!("\n--- Notes ---\n{}", record.notes);
    }
}

fn print_stats(records: &[JobApplication], top: usize) {
    println!("Applications: {}", records.len());

    let statuses = stats::status_histogram(records);
    let max = statuses.iter().map(|(_, count)| *count).max().unwrap_or(0);
    println!("\nBy status:");
    for (status, count) in &statuses {
        println!("  {:<20} {:>4}  {}", status.as_str(), count, bar(*count, max));
    }

    let industries = stats::industry_histogram(records);
    if !industries.is_empty() {
        let max = industries.iter().map(|(_, count)| *count).max().unwrap_or(0);
        println!("\nBy industry:");
        for (industry, count) in &industries {
            println!("  {:<20} {:>4}  {}", truncate(industry, 18), count, bar(*count, max));
        }
    }

    let skills = stats::top_skills(records, top);
    if !skills.is_empty() {
        let max = skills.iter().map(|(_, count)| *count).max().unwrap_or(0);
        println!("\nTop skills:");
        for (skill, count) in &skills {
            println!("  {:<20} {:>4}  {}", truncate(skill, 18), count, bar(*count, max));
        }
    }

    let timeline = stats::monthly_timeline(records, Utc::now().date_naive());
    let max = timeline.iter().map(|entry| entry.count).max().unwrap_or(0);
    println!("\nLast 12 months:");
    for entry in &timeline {
        println!("  {:<10} {:>4}  {}", entry.label, entry.count, bar(entry.count, max));
    }

    let interviews = stats::upcoming_interviews(records, Utc::now().date_naive());
    if !interviews.is_empty() {
        println!("\nUpcoming interviews:");
        for record in &interviews {
            println!(
                "  {}  {} - {}",
                record.interview_date, record.company_name, record.job_title
            );
        }
    }
}

/// Bar scaled against the largest count in the series; any nonzero count
/// shows at least one mark.
fn bar(count: usize, max: usize) -> String {
    const WIDTH: usize = 30;
    if max == 0 || count == 0 {
        return String::new();
    }
    "#".repeat((count * WIDTH + max - 1) / max)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_home_replaces_tilde() {
        unsafe {
            std::env::set_var("HOME", "/home/tester");
        }
        assert_eq!(
            expand_home("~/.applied.password.txt"),
            PathBuf::from("/home/tester/.applied.password.txt")
        );
        assert_eq!(expand_home("/etc/secret"), PathBuf::from("/etc/secret"));
    }

    #[test]
    fn test_bar_scales_to_widest_entry() {
        assert_eq!(bar(30, 30).len(), 30);
        assert_eq!(bar(15, 30).len(), 15);
        // Small but nonzero counts still render a mark.
        assert_eq!(bar(1, 300), "#");
        assert_eq!(bar(0, 30), "");
        assert_eq!(bar(0, 0), "");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long company name", 10), "a very ...");
        assert_eq!(truncate("Müller Straßenbau GmbH", 10), "Müller ...");
    }
}
