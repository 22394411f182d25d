//! Key records - the persisted credential entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{KeyError, Result};

/// Bullet used when masking secrets for display
const MASK_CHAR: char = '•';

/// A stored API key with its metadata
///
/// Field names on disk match the original `api-keys.json` layout, so the
/// secret is serialized as `key` and the last-use stamp as `lastUsed`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRecord {
    pub id: String,
    pub service: String,
    pub name: String,
    #[serde(rename = "key")]
    pub secret: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(rename = "lastUsed", default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Hand-written so the secret never reaches logs or panic messages.
impl fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRecord")
            .field("id", &self.id)
            .field("service", &self.service)
            .field("name", &self.name)
            .field("secret", &"<redacted>")
            .field("categories", &self.categories)
            .field("notes", &self.notes)
            .field("last_used_at", &self.last_used_at)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl KeyRecord {
    /// Build a fresh record with a new id and matching timestamps
    pub fn create(new: NewKey) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            service: new.service,
            name: new.name,
            secret: new.secret,
            categories: new.categories,
            notes: new.notes,
            last_used_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Human readable label, e.g. "OpenAI / production"
    pub fn label(&self) -> String {
        format!("{} / {}", self.service, self.name)
    }

    /// Whether this record occupies the given (service, name) pair
    pub fn is_named(&self, service: &str, name: &str) -> bool {
        self.service == service && self.name == name
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Secret in display form
    pub fn masked_secret(&self) -> String {
        mask_secret(&self.secret)
    }

    /// Merge the fields present in `update` into this record
    ///
    /// Does not touch `updated_at`; the store stamps it after a successful merge.
    pub fn apply(&mut self, update: KeyUpdate) {
        if let Some(service) = update.service {
            self.service = service;
        }
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(secret) = update.secret {
            self.secret = secret;
        }
        if let Some(categories) = update.categories {
            self.categories = categories;
        }
        if let Some(notes) = update.notes {
            self.notes = if notes.is_empty() { None } else { Some(notes) };
        }
    }
}

/// Input for adding a key
#[derive(Clone, Default)]
pub struct NewKey {
    pub service: String,
    pub name: String,
    pub secret: String,
    pub categories: Vec<String>,
    pub notes: Option<String>,
}

impl NewKey {
    pub fn new(
        service: impl Into<String>,
        name: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            name: name.into(),
            secret: secret.into(),
            ..Default::default()
        }
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        let notes = notes.into();
        self.notes = if notes.is_empty() { None } else { Some(notes) };
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        require("service", &self.service)?;
        require("name", &self.name)?;
        require("secret", &self.secret)
    }
}

impl fmt::Debug for NewKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewKey")
            .field("service", &self.service)
            .field("name", &self.name)
            .field("secret", &"<redacted>")
            .field("categories", &self.categories)
            .field("notes", &self.notes)
            .finish()
    }
}

/// Partial update for an existing key
///
/// `id`, `created_at` and the timestamps are not representable here, so an
/// update can never change them. An empty `notes` string clears the notes.
#[derive(Clone, Default)]
pub struct KeyUpdate {
    pub service: Option<String>,
    pub name: Option<String>,
    pub secret: Option<String>,
    pub categories: Option<Vec<String>>,
    pub notes: Option<String>,
}

impl KeyUpdate {
    pub fn is_empty(&self) -> bool {
        self.service.is_none()
            && self.name.is_none()
            && self.secret.is_none()
            && self.categories.is_none()
            && self.notes.is_none()
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if let Some(service) = &self.service {
            require("service", service)?;
        }
        if let Some(name) = &self.name {
            require("name", name)?;
        }
        if let Some(secret) = &self.secret {
            require("secret", secret)?;
        }
        Ok(())
    }
}

impl fmt::Debug for KeyUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyUpdate")
            .field("service", &self.service)
            .field("name", &self.name)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("categories", &self.categories)
            .field("notes", &self.notes)
            .finish()
    }
}

fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(KeyError::InvalidInput(format!("{} cannot be empty", field)));
    }
    Ok(())
}

/// Mask a secret for display
///
/// Short secrets (8 chars or fewer) are fully hidden; longer ones keep the
/// first and last four characters.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    let hidden: String = std::iter::repeat(MASK_CHAR).take(8).collect();

    if chars.len() <= 8 {
        return hidden;
    }

    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, hidden, tail)
}
