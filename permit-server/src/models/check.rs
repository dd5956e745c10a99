use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

use permit_slo::{errors, Result};

pub type Attributes = HashMap<String, Value>;

const RESERVED_USER_KEYS: &[&str] = &["key"];
const RESERVED_RESOURCE_KEYS: &[&str] = &["type", "key", "tenant"];

/// The subject of an authorization query, as the pdp expects it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub key: String,
    #[serde(flatten)]
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub tenant: String,
    #[serde(flatten)]
    pub attributes: Attributes,
}

impl Resource {
    /// Parses `type` or `type:key`.
    pub fn parse(resource: &str, tenant: &str) -> Self {
        let (kind, key) = match resource.split_once(':') {
            Some((kind, key)) => (kind, Some(key.to_owned())),
            None => (resource, None),
        };
        Self {
            kind: kind.to_owned(),
            key,
            tenant: tenant.to_owned(),
            attributes: Attributes::new(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key {
            Some(ref key) => write!(f, "{}:{}", self.kind, key),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Body of the pdp `/allowed` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationQuery {
    pub user: Subject,
    pub action: String,
    pub resource: Resource,
    #[serde(default)]
    pub context: Attributes,
}

impl AuthorizationQuery {
    pub fn new(user_key: &str, action: &str, resource: Resource) -> Self {
        Self {
            user: Subject {
                key: user_key.to_owned(),
                attributes: Attributes::new(),
            },
            action: action.to_owned(),
            resource,
            context: Attributes::new(),
        }
    }

    pub fn with_user_attributes(
        mut self,
        attributes: Attributes,
    ) -> Result<Self> {
        reject_reserved(&attributes, RESERVED_USER_KEYS)?;
        self.user.attributes = attributes;
        Ok(self)
    }

    pub fn with_resource_attributes(
        mut self,
        attributes: Attributes,
    ) -> Result<Self> {
        reject_reserved(&attributes, RESERVED_RESOURCE_KEYS)?;
        self.resource.attributes = attributes;
        Ok(self)
    }
}

fn reject_reserved(attributes: &Attributes, reserved: &[&str]) -> Result<()> {
    match reserved.iter().find(|key| attributes.contains_key(**key)) {
        Some(key) => Err(errors::bad_request(&format!(
            "attribute \"{}\" is reserved",
            key
        ))),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationResult {
    pub allow: bool,
}

/// The body returned by the quickstart endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    pub result: String,
}

impl CheckResult {
    pub fn permitted(name: &str, action: &str, resource: &str) -> Self {
        Self {
            result: format!(
                "{} is PERMITTED to {} {}!",
                name, action, resource
            ),
        }
    }

    pub fn denied(name: &str, action: &str, resource: &str) -> Self {
        Self {
            result: format!(
                "{} is NOT PERMITTED to {} {}!",
                name, action, resource
            ),
        }
    }
}

/// Parses `k1:v1,k2:v2` into typed attributes.
pub fn parse_attributes(input: &str) -> Result<Attributes> {
    let mut attributes = Attributes::new();
    if input.trim().is_empty() {
        return Ok(attributes);
    }
    for pair in input.split(',') {
        let parts: Vec<&str> = pair.split(':').map(str::trim).collect();
        let [key, value] = parts[..] else {
            return Err(errors::bad_request(&format!(
                "Invalid attribute format: \"{}\". \
                 Expected format \"key:value\"",
                pair
            )));
        };
        if key.is_empty() {
            return Err(errors::bad_request("Attribute key cannot be empty"));
        }
        if value.is_empty() {
            return Err(errors::bad_request(&format!(
                "Value for key \"{}\" cannot be empty",
                key
            )));
        }
        attributes.insert(key.to_owned(), typed_value(value));
    }
    Ok(attributes)
}

fn typed_value(value: &str) -> Value {
    if value.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if value.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(n) = value.parse::<i64>() {
        return Value::Number(n.into());
    }
    match value.parse::<f64>().ok().and_then(Number::from_f64) {
        Some(n) => Value::Number(n),
        None => Value::String(value.to_owned()),
    }
}
