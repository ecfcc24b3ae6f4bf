use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::capabilities::{KeyNamespace, KvError, KvKey};

pub const MAX_VEHICLE_TEXT_LEN: usize = 32;
pub const NOT_SPECIFIED: &str = "Not specified";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VehicleError {
    #[error("{field} is too long ({len} > {max})")]
    TooLong {
        field: VehicleField,
        len: usize,
        max: usize,
    },
    #[error("unknown vehicle class: {0}")]
    UnknownClass(String),
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VehicleClass {
    Auto,
    Mini,
    Sedan,
    Suv,
}

impl VehicleClass {
    pub const ALL: [Self; 4] = [Self::Auto, Self::Mini, Self::Sedan, Self::Suv];

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Mini => "mini",
            Self::Sedan => "sedan",
            Self::Suv => "suv",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Auto => "Auto Rickshaw",
            Self::Mini => "Mini",
            Self::Sedan => "Sedan",
            Self::Suv => "SUV",
        }
    }
}

impl FromStr for VehicleClass {
    type Err = VehicleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|class| class.code() == s)
            .ok_or_else(|| VehicleError::UnknownClass(s.to_string()))
    }
}

/// Each field is stored under its own key.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum VehicleField {
    Number,
    Class,
    Model,
}

impl VehicleField {
    pub const ALL: [Self; 3] = [Self::Number, Self::Class, Self::Model];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Number => "number",
            Self::Class => "class",
            Self::Model => "model",
        }
    }

    pub fn key(self) -> Result<KvKey, KvError> {
        KvKey::new(KeyNamespace::Vehicle, self.name())
    }
}

impl fmt::Display for VehicleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct VehicleDetails {
    pub number: String,
    pub class: Option<VehicleClass>,
    pub model: String,
}

impl VehicleDetails {
    /// Trims text fields and enforces length limits.
    pub fn validated(self) -> Result<Self, VehicleError> {
        let number = Self::check(VehicleField::Number, self.number)?;
        let model = Self::check(VehicleField::Model, self.model)?;
        Ok(Self {
            number,
            class: self.class,
            model,
        })
    }

    /// Value written for `field`; empty strings mean "not specified".
    #[must_use]
    pub fn stored_value(&self, field: VehicleField) -> String {
        match field {
            VehicleField::Number => self.number.clone(),
            VehicleField::Class => self.class.map(VehicleClass::code).unwrap_or_default().to_string(),
            VehicleField::Model => self.model.clone(),
        }
    }

    /// Applies a value read back from storage.
    pub fn apply_stored(&mut self, field: VehicleField, value: Option<String>) -> Result<(), VehicleError> {
        let value = value.unwrap_or_default();
        match field {
            VehicleField::Number => self.number = value,
            VehicleField::Model => self.model = value,
            VehicleField::Class if value.is_empty() => self.class = None,
            VehicleField::Class => self.class = Some(value.parse()?),
        }
        Ok(())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.number.is_empty() && self.class.is_none() && self.model.is_empty()
    }

    #[must_use]
    pub fn display_number(&self) -> &str {
        non_empty_or_unspecified(&self.number)
    }

    #[must_use]
    pub fn display_class(&self) -> &str {
        self.class.map_or(NOT_SPECIFIED, VehicleClass::label)
    }

    #[must_use]
    pub fn display_model(&self) -> &str {
        non_empty_or_unspecified(&self.model)
    }

    fn check(field: VehicleField, value: String) -> Result<String, VehicleError> {
        let trimmed = value.trim();
        let len = trimmed.chars().count();
        if len > MAX_VEHICLE_TEXT_LEN {
            return Err(VehicleError::TooLong {
                field,
                len,
                max: MAX_VEHICLE_TEXT_LEN,
            });
        }
        Ok(trimmed.to_string())
    }
}

fn non_empty_or_unspecified(value: &str) -> &str {
    if value.is_empty() {
        NOT_SPECIFIED
    } else {
        value
    }
}
