use serde::{Deserialize, Serialize};
use validator::Validate;

use permit_slo::{errors::Code, Result};

use crate::AppConfig;

/// The actor whose permissions are checked. Built once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[validate(length(min = 1))]
    pub id: String,
    #[validate(length(min = 1))]
    pub first_name: String,
    #[validate(length(min = 1))]
    pub last_name: String,
    #[validate(email)]
    pub email: String,
}

impl User {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let user = Self {
            id: config.user_id.clone(),
            first_name: config.first_name.clone(),
            last_name: config.last_name.clone(),
            email: config.email.clone(),
        };
        user.validate().map_err(Code::Validates)?;
        Ok(user)
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
