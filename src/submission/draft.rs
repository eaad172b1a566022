//! Draft submission model and its flat wire form.
//!
//! The wizard posts a flat `field -> string` object. Internally the draft keeps
//! the nested groups (phone, postal code, address, plan + options) typed, and
//! converts back to exactly the same flat form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Flat wire representation of a draft.
pub type FlatForm = BTreeMap<String, String>;

const OPTION_PREFIX: &str = "option_codes[";

/// Every scalar field of the draft, keyed by its flat name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    LastName,
    FirstName,
    LastNameKana,
    FirstNameKana,
    Email,
    EmailConfirmation,
    Phone1,
    Phone2,
    Phone3,
    PostalCode1,
    PostalCode2,
    Prefecture,
    City,
    Town,
    District,
    Block,
    SubBlock,
    Building,
    Room,
    PlanCode,
}

impl Field {
    pub const ALL: [Field; 20] = [
        Field::LastName,
        Field::FirstName,
        Field::LastNameKana,
        Field::FirstNameKana,
        Field::Email,
        Field::EmailConfirmation,
        Field::Phone1,
        Field::Phone2,
        Field::Phone3,
        Field::PostalCode1,
        Field::PostalCode2,
        Field::Prefecture,
        Field::City,
        Field::Town,
        Field::District,
        Field::Block,
        Field::SubBlock,
        Field::Building,
        Field::Room,
        Field::PlanCode,
    ];

    /// Flat key used on the wire and in error details.
    pub fn key(&self) -> &'static str {
        match self {
            Field::LastName => "last_name",
            Field::FirstName => "first_name",
            Field::LastNameKana => "last_name_kana",
            Field::FirstNameKana => "first_name_kana",
            Field::Email => "email",
            Field::EmailConfirmation => "email_confirmation",
            Field::Phone1 => "phone1",
            Field::Phone2 => "phone2",
            Field::Phone3 => "phone3",
            Field::PostalCode1 => "postal_code1",
            Field::PostalCode2 => "postal_code2",
            Field::Prefecture => "prefecture",
            Field::City => "city",
            Field::Town => "town",
            Field::District => "district",
            Field::Block => "block",
            Field::SubBlock => "sub_block",
            Field::Building => "building",
            Field::Room => "room",
            Field::PlanCode => "plan_code",
        }
    }

    pub fn from_key(key: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|f| f.key() == key)
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// Error path for the option at `index`.
pub fn option_path(index: usize) -> String {
    format!("{OPTION_PREFIX}{index}]")
}

/// Phone number split into three parts (e.g. `090` / `1234` / `5678`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoneNumber {
    pub part1: String,
    pub part2: String,
    pub part3: String,
}

impl PhoneNumber {
    pub fn new(part1: &str, part2: &str, part3: &str) -> Self {
        Self {
            part1: part1.to_string(),
            part2: part2.to_string(),
            part3: part3.to_string(),
        }
    }

    /// All three parts joined without separators.
    pub fn concatenated(&self) -> String {
        format!("{}{}{}", self.part1, self.part2, self.part3)
    }

    pub fn is_complete(&self) -> bool {
        !self.part1.is_empty() && !self.part2.is_empty() && !self.part3.is_empty()
    }
}

/// Postal code split as 3 + 4 digits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostalCode {
    pub part1: String,
    pub part2: String,
}

impl PostalCode {
    pub fn new(part1: &str, part2: &str) -> Self {
        Self {
            part1: part1.to_string(),
            part2: part2.to_string(),
        }
    }

    pub fn concatenated(&self) -> String {
        format!("{}{}", self.part1, self.part2)
    }
}

/// Up to eight address parts. Only prefecture, city and town are required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Address {
    pub prefecture: String,
    pub city: String,
    pub town: String,
    pub district: String,
    pub block: String,
    pub sub_block: String,
    pub building: String,
    pub room: String,
}

/// An in-progress registration payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FlatForm", into = "FlatForm")]
pub struct DraftSubmission {
    pub last_name: String,
    pub first_name: String,
    pub last_name_kana: String,
    pub first_name_kana: String,
    pub email: String,
    pub email_confirmation: String,
    pub phone: PhoneNumber,
    pub postal_code: PostalCode,
    pub address: Address,
    pub plan_code: String,
    pub option_codes: Vec<String>,
}

impl DraftSubmission {
    /// Read a scalar field.
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::LastName => &self.last_name,
            Field::FirstName => &self.first_name,
            Field::LastNameKana => &self.last_name_kana,
            Field::FirstNameKana => &self.first_name_kana,
            Field::Email => &self.email,
            Field::EmailConfirmation => &self.email_confirmation,
            Field::Phone1 => &self.phone.part1,
            Field::Phone2 => &self.phone.part2,
            Field::Phone3 => &self.phone.part3,
            Field::PostalCode1 => &self.postal_code.part1,
            Field::PostalCode2 => &self.postal_code.part2,
            Field::Prefecture => &self.address.prefecture,
            Field::City => &self.address.city,
            Field::Town => &self.address.town,
            Field::District => &self.address.district,
            Field::Block => &self.address.block,
            Field::SubBlock => &self.address.sub_block,
            Field::Building => &self.address.building,
            Field::Room => &self.address.room,
            Field::PlanCode => &self.plan_code,
        }
    }

    /// Mutable access to a scalar field.
    pub fn get_mut(&mut self, field: Field) -> &mut String {
        match field {
            Field::LastName => &mut self.last_name,
            Field::FirstName => &mut self.first_name,
            Field::LastNameKana => &mut self.last_name_kana,
            Field::FirstNameKana => &mut self.first_name_kana,
            Field::Email => &mut self.email,
            Field::EmailConfirmation => &mut self.email_confirmation,
            Field::Phone1 => &mut self.phone.part1,
            Field::Phone2 => &mut self.phone.part2,
            Field::Phone3 => &mut self.phone.part3,
            Field::PostalCode1 => &mut self.postal_code.part1,
            Field::PostalCode2 => &mut self.postal_code.part2,
            Field::Prefecture => &mut self.address.prefecture,
            Field::City => &mut self.address.city,
            Field::Town => &mut self.address.town,
            Field::District => &mut self.address.district,
            Field::Block => &mut self.address.block,
            Field::SubBlock => &mut self.address.sub_block,
            Field::Building => &mut self.address.building,
            Field::Room => &mut self.address.room,
            Field::PlanCode => &mut self.plan_code,
        }
    }

    pub fn set(&mut self, field: Field, value: impl Into<String>) {
        *self.get_mut(field) = value.into();
    }

    /// Parse the flat wire form. Unknown keys are dropped; option indices are
    /// compacted in ascending order.
    pub fn from_flat(form: &FlatForm) -> Self {
        let mut draft = DraftSubmission::default();
        let mut options: BTreeMap<usize, String> = BTreeMap::new();

        for (key, value) in form {
            if let Some(field) = Field::from_key(key) {
                draft.set(field, value.clone());
            } else if let Some(index) = parse_option_index(key) {
                options.insert(index, value.clone());
            } else {
                tracing::debug!(key = %key, "Dropping unknown draft field");
            }
        }

        draft.option_codes = options.into_values().collect();
        draft
    }

    /// Render back to the flat wire form. Empty scalar fields are kept so the
    /// form round-trips exactly.
    pub fn to_flat(&self) -> FlatForm {
        let mut form = FlatForm::new();
        for field in Field::ALL {
            form.insert(field.key().to_string(), self.get(field).to_string());
        }
        for (index, code) in self.option_codes.iter().enumerate() {
            form.insert(option_path(index), code.clone());
        }
        form
    }
}

impl From<FlatForm> for DraftSubmission {
    fn from(form: FlatForm) -> Self {
        DraftSubmission::from_flat(&form)
    }
}

impl From<DraftSubmission> for FlatForm {
    fn from(draft: DraftSubmission) -> Self {
        draft.to_flat()
    }
}

fn parse_option_index(key: &str) -> Option<usize> {
    key.strip_prefix(OPTION_PREFIX)?
        .strip_suffix(']')?
        .parse()
        .ok()
}
