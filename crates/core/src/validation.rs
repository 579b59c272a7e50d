//! Field-level input validation.
//!
//! Every validator collects all problems before returning, so a client gets
//! one response listing each offending field. Nothing here touches storage;
//! callers validate first and only then attempt a write.
//!
//! # Name bounds
//!
//! Account names are 20-60 characters when an administrator creates the
//! account but 10-60 characters at self-service signup. The looser signup
//! bound is kept on purpose (see [`NameRule`]).

use serde::Serialize;

use crate::types::{Email, Role, Score, UserId};

/// Longest accepted account or store name, in characters.
pub const NAME_MAX: usize = 60;
/// Longest accepted postal address, in characters.
pub const ADDRESS_MAX: usize = 400;
/// Shortest accepted password, in characters.
pub const PASSWORD_MIN: usize = 8;
/// Longest accepted password, in characters.
pub const PASSWORD_MAX: usize = 16;

/// One rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Request field name, as the client spelled it.
    pub field: &'static str,
    /// Human-readable reason.
    pub message: String,
}

/// All the field errors found in one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, thiserror::Error)]
#[error("validation failed: {}", summary(.errors))]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

fn summary(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationErrors {
    /// An empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A collection holding a single error.
    #[must_use]
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    /// Record a problem with `field`.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Whether no problem was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// The recorded problems, in the order they were found.
    #[must_use]
    pub fn fields(&self) -> &[FieldError] {
        &self.errors
    }

    /// Whether `field` has at least one recorded problem.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// Append every problem from `other`.
    pub fn merge(&mut self, other: Self) {
        self.errors.extend(other.errors);
    }

    /// Keep the value of a field check, recording its error otherwise.
    fn take<T, E: std::fmt::Display>(
        &mut self,
        field: &'static str,
        result: Result<T, E>,
    ) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.add(field, e.to_string());
                None
            }
        }
    }
}

/// Which lower bound applies to an account name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRule {
    /// Self-service signup: 10-60 characters.
    Signup,
    /// Created by an administrator or the CLI: 20-60 characters.
    Managed,
}

impl NameRule {
    /// Minimum name length, in characters.
    #[must_use]
    pub const fn min(self) -> usize {
        match self {
            Self::Signup => 10,
            Self::Managed => 20,
        }
    }
}

/// Raw account fields as submitted.
#[derive(Debug, Clone, Copy)]
pub struct UserInput<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub address: Option<&'a str>,
    pub password: &'a str,
}

/// A validated account, ready to be hashed and stored.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub address: Option<String>,
    pub password: String,
    pub role: Role,
}

/// A validated store.
#[derive(Debug, Clone)]
pub struct NewStore {
    pub name: String,
    pub email: Option<Email>,
    pub address: Option<String>,
    pub owner_id: Option<UserId>,
}

/// A validated rating submission.
#[derive(Debug, Clone)]
pub struct RatingInput {
    pub score: Score,
    pub comment: Option<String>,
}

/// Check an account name against `rule`, returning the trimmed name.
///
/// # Errors
///
/// Returns a message when the trimmed length is out of bounds.
pub fn user_name(name: &str, rule: NameRule) -> Result<String, String> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if len < rule.min() || len > NAME_MAX {
        return Err(format!(
            "name must be between {} and {NAME_MAX} characters",
            rule.min()
        ));
    }
    Ok(trimmed.to_owned())
}

/// Check an optional address, mapping blank input to `None`.
///
/// # Errors
///
/// Returns a message when the address is longer than [`ADDRESS_MAX`].
pub fn address(address: Option<&str>) -> Result<Option<String>, String> {
    let Some(trimmed) = address.map(str::trim).filter(|a| !a.is_empty()) else {
        return Ok(None);
    };
    if trimmed.chars().count() > ADDRESS_MAX {
        return Err(format!("address must be at most {ADDRESS_MAX} characters"));
    }
    Ok(Some(trimmed.to_owned()))
}

/// Check password strength.
///
/// # Errors
///
/// Returns a message unless the password is 8-16 characters long with at
/// least one uppercase letter and one non-alphanumeric character.
pub fn password(password: &str) -> Result<(), String> {
    let len = password.chars().count();
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_special = password.chars().any(|c| !c.is_ascii_alphanumeric());

    if !(PASSWORD_MIN..=PASSWORD_MAX).contains(&len) || !has_upper || !has_special {
        return Err(format!(
            "password must be {PASSWORD_MIN}-{PASSWORD_MAX} characters with at least one \
             uppercase letter and one special character"
        ));
    }
    Ok(())
}

fn user(input: &UserInput<'_>, rule: NameRule, role: Option<Role>) -> Result<NewUser, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = errors.take("name", user_name(input.name, rule));
    let email = errors.take("email", Email::parse(input.email));
    let address = errors.take("address", address(input.address));
    errors.take("password", password(input.password));

    match (name, email, address, role, errors.is_empty()) {
        (Some(name), Some(email), Some(address), Some(role), true) => Ok(NewUser {
            name,
            email,
            address,
            password: input.password.to_owned(),
            role,
        }),
        _ => Err(errors),
    }
}

/// Validate a self-service signup. The role is always `normal_user`.
///
/// # Errors
///
/// Returns every field problem found.
pub fn signup(input: &UserInput<'_>) -> Result<NewUser, ValidationErrors> {
    user(input, NameRule::Signup, Some(Role::NormalUser))
}

/// Validate an account created by an administrator.
///
/// # Errors
///
/// Returns every field problem found, including an unknown or missing role.
pub fn managed_user(input: &UserInput<'_>, role: Option<&str>) -> Result<NewUser, ValidationErrors> {
    let parsed_role = match role {
        Some(raw) => raw.parse::<Role>().map_err(|e| e.to_string()),
        None => Err("role is required".to_owned()),
    };

    let mut role_errors = ValidationErrors::new();
    let role = role_errors.take("role", parsed_role);

    match user(input, NameRule::Managed, role) {
        Ok(user) => Ok(user),
        Err(mut errors) => {
            errors.merge(role_errors);
            Err(errors)
        }
    }
}

/// Validate store fields. `owner_id` must be a UUID when present.
///
/// # Errors
///
/// Returns every field problem found.
pub fn new_store(
    name: &str,
    email: Option<&str>,
    address_raw: Option<&str>,
    owner_id: Option<&str>,
) -> Result<NewStore, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let trimmed = name.trim();
    let name_len = trimmed.chars().count();
    if name_len == 0 || name_len > NAME_MAX {
        errors.add(
            "name",
            format!("name must be between 1 and {NAME_MAX} characters"),
        );
    }

    let email = match email.map(str::trim).filter(|e| !e.is_empty()) {
        Some(raw) => errors.take("email", Email::parse(raw)).map(Some),
        None => Some(None),
    };
    let address = errors.take("address", address(address_raw));
    let owner_id = match owner_id.map(str::trim).filter(|o| !o.is_empty()) {
        Some(raw) => errors
            .take("owner_id", raw.parse::<UserId>().map_err(|_| "owner_id must be a UUID"))
            .map(Some),
        None => Some(None),
    };

    match (email, address, owner_id, errors.is_empty()) {
        (Some(email), Some(address), Some(owner_id), true) => Ok(NewStore {
            name: trimmed.to_owned(),
            email,
            address,
            owner_id,
        }),
        _ => Err(errors),
    }
}

/// Validate a rating submission. Blank comments are dropped.
///
/// # Errors
///
/// Returns an error citing `rating` when it is missing or outside 1-5.
pub fn rating(rating: Option<i64>, comment: Option<&str>) -> Result<RatingInput, ValidationErrors> {
    let score = rating
        .ok_or_else(|| ValidationErrors::single("rating", "rating is required"))?;
    let score = Score::new(score).map_err(|e| ValidationErrors::single("rating", e.to_string()))?;

    Ok(RatingInput {
        score,
        comment: comment
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_owned),
    })
}

/// Validate login fields: a well-formed email and a non-empty password.
///
/// # Errors
///
/// Returns every field problem found.
pub fn login(email: &str, password: &str) -> Result<Email, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let email = errors.take("email", Email::parse(email));
    if password.is_empty() {
        errors.add("password", "password is required");
    }
    match email {
        Some(email) if errors.is_empty() => Ok(email),
        _ => Err(errors),
    }
}

/// Parse a path or query identifier, citing `field` on failure.
///
/// # Errors
///
/// Returns an error when `raw` is not a UUID.
pub fn id<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T, ValidationErrors> {
    raw.trim()
        .parse()
        .map_err(|_| ValidationErrors::single(field, format!("{field} must be a UUID")))
}
