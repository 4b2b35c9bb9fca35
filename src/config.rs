use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Firebase project settings, read from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub project_id: String,
    pub api_key: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            project_id: get_env("FIREBASE_PROJECT_ID")?,
            api_key: get_env("FIREBASE_API_KEY")?,
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

/// Where the cached sign-in session lives. Falls back to the current
/// directory when the platform data dir cannot be determined.
pub fn session_path() -> PathBuf {
    if let Some(dirs) = directories::ProjectDirs::from("", "", "applied") {
        dirs.data_dir().join("session.json")
    } else {
        PathBuf::from("session.json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_env_missing_variable() {
        let original_project = env::var("FIREBASE_PROJECT_ID").ok();
        let original_key = env::var("FIREBASE_API_KEY").ok();
        unsafe {
            env::remove_var("FIREBASE_PROJECT_ID");
            env::remove_var("FIREBASE_API_KEY");
        }

        let result = Config::from_env();

        if let Some(val) = original_project {
            unsafe {
                env::set_var("FIREBASE_PROJECT_ID", val);
            }
        }
        if let Some(val) = original_key {
            unsafe {
                env::set_var("FIREBASE_API_KEY", val);
            }
        }

        let err = result.unwrap_err().to_string();
        assert!(err.contains("FIREBASE_PROJECT_ID"));
    }

    #[test]
    fn test_session_path_has_file_name() {
        let path = session_path();
        assert_eq!(path.file_name().unwrap(), "session.json");
    }
}
