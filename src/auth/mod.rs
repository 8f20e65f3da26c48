// Credential verification for the demo login flow
//
// SECURITY: this is a static credential table seeded from environment
// variables, a structural stand-in until a real identity provider is
// wired in. Passwords are compared in memory and never logged.

use serde::Serialize;

use crate::config::Config;
use crate::error::{AppError, AppResult};

/// Role attached to an authenticated session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Organization,
    Employee,
}

/// Authenticated identity returned by a successful login
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet: Option<String>,
}

/// Credential verification seam
pub trait CredentialStore: Send + Sync {
    fn authenticate(&self, email: &str, password: &str) -> AppResult<Principal>;
}

struct Account {
    email: String,
    password: String,
    name: String,
    role: Role,
    wallet: Option<String>,
}

/// Fixed account table built from configuration
pub struct StaticCredentialStore {
    accounts: Vec<Account>,
}

impl StaticCredentialStore {
    pub fn from_config(config: &Config) -> Self {
        Self {
            accounts: vec![
                Account {
                    email: config.org_email.clone(),
                    password: config.org_password.clone(),
                    name: config.org_name.clone(),
                    role: Role::Organization,
                    wallet: None,
                },
                Account {
                    email: config.employee_email.clone(),
                    password: config.employee_password.clone(),
                    name: config.employee_name.clone(),
                    role: Role::Employee,
                    wallet: config.employee_wallet.clone(),
                },
            ],
        }
    }
}

impl CredentialStore for StaticCredentialStore {
    fn authenticate(&self, email: &str, password: &str) -> AppResult<Principal> {
        self.accounts
            .iter()
            .find(|a| a.email == email && a.password == password)
            .map(|a| Principal {
                email: a.email.clone(),
                name: a.name.clone(),
                role: a.role,
                wallet: a.wallet.clone(),
            })
            .ok_or(AppError::Unauthorized)
    }
}
