pub mod auth;
pub mod moderation;
pub mod post;
pub mod user;

use crate::{
    model::{
        auth::InvalidPasswordError,
        user::{InvalidAgeError, InvalidEmailError, InvalidUsernameError},
    },
    util::InvalidTimestampError,
};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, marker::PhantomData};
use thiserror::Error;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    Username(#[from] InvalidUsernameError),
    #[error(transparent)]
    Email(#[from] InvalidEmailError),
    #[error(transparent)]
    Age(#[from] InvalidAgeError),
    #[error(transparent)]
    Password(#[from] InvalidPasswordError),
    #[error(transparent)]
    Timestamp(#[from] InvalidTimestampError),
    #[error("Content must not be empty")]
    EmptyContent,
}

#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker>(u64, #[serde(skip)] PhantomData<Marker>);

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(value: u64) -> Self {
        Self(value, PhantomData)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Id::new(value)
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.get()
    }
}

/// Rejects content that is empty once surrounding whitespace is removed.
pub fn non_blank(content: String) -> Result<String, ModelValidationError> {
    if content.trim().is_empty() {
        Err(ModelValidationError::EmptyContent)
    } else {
        Ok(content)
    }
}
