//! File-backed user directory for the auth collaborator. The core
//! consumes only the authorized-session check for export gating; the
//! management operations exist for the admin surface.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

const USERS_FILE: &str = "users.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    User,
}

/// An authenticated user, without credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredUser {
    username: String,
    password: String,
    role: UserRole,
}

pub struct UserDirectory {
    path: PathBuf,
}

impl UserDirectory {
    /// Directory in the platform data dir, seeded with the default
    /// accounts on first use.
    pub fn open_default() -> Result<Self> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Cannot find the platform data directory"))?;
        Ok(Self {
            path: data_dir.join("ZotpotTts").join(USERS_FILE),
        })
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    fn read(&self) -> Result<Vec<StoredUser>> {
        if !self.path.exists() {
            let defaults = vec![
                StoredUser {
                    username: "superadmin".into(),
                    password: "admin123".into(),
                    role: UserRole::Admin,
                },
                StoredUser {
                    username: "user".into(),
                    password: "user123".into(),
                    role: UserRole::User,
                },
            ];
            self.write(&defaults)?;
            return Ok(defaults);
        }
        let data = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn write(&self, users: &[StoredUser]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(users)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }

    /// Check credentials; returns the user without their password.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        let users = self.read()?;
        Ok(users
            .iter()
            .find(|u| u.username == username && u.password == password)
            .map(|u| User {
                username: u.username.clone(),
                role: u.role,
            }))
    }

    /// Create an account; false when the username is taken.
    pub fn create_user(&self, username: &str, password: &str, role: UserRole) -> Result<bool> {
        let mut users = self.read()?;
        if users.iter().any(|u| u.username == username) {
            return Ok(false);
        }
        users.push(StoredUser {
            username: username.to_string(),
            password: password.to_string(),
            role,
        });
        self.write(&users)?;
        Ok(true)
    }

    /// Delete an account. The superadmin account cannot be removed.
    pub fn delete_user(&self, username: &str) -> Result<bool> {
        if username == "superadmin" {
            return Ok(false);
        }
        let mut users = self.read()?;
        let before = users.len();
        users.retain(|u| u.username != username);
        if users.len() == before {
            return Ok(false);
        }
        self.write(&users)?;
        Ok(true)
    }

    /// Admin-side reset: set a new password without the old one.
    pub fn reset_password(&self, username: &str, new_password: &str) -> Result<bool> {
        let mut users = self.read()?;
        match users.iter_mut().find(|u| u.username == username) {
            Some(user) => {
                user.password = new_password.to_string();
                self.write(&users)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// User-side change: requires the current password.
    pub fn verify_and_change_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<bool> {
        let mut users = self.read()?;
        match users
            .iter_mut()
            .find(|u| u.username == username && u.password == old_password)
        {
            Some(user) => {
                user.password = new_password.to_string();
                self.write(&users)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        Ok(self
            .read()?
            .into_iter()
            .map(|u| User {
                username: u.username,
                role: u.role,
            })
            .collect())
    }
}
