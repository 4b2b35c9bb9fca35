use crate::error::Result;
use crate::models::{ApplicationStatus, JobApplication};

/// Persistence boundary for the application collection. The remote store
/// owns ordering: both listing calls return records newest-first by
/// application date.
#[cfg_attr(test, mockall::automock)]
pub trait ApplicationStore {
    fn list(&self) -> Result<Vec<JobApplication>>;

    fn list_by_status(&self, status: ApplicationStatus) -> Result<Vec<JobApplication>>;

    /// Persists a new record and returns the id the store assigned.
    fn create(&self, record: &JobApplication) -> Result<String>;

    /// Merges the record's fields into the stored document. Fields not
    /// carried by the record are left untouched.
    fn update(&self, id: &str, record: &JobApplication) -> Result<()>;

    fn delete(&self, id: &str) -> Result<()>;
}
