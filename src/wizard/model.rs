//! Questionnaire records: the user profile, the trip plan, and the two
//! generated artifacts.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Vibe used for packing generation when the trip plan has none.
pub const FALLBACK_PRIMARY_VIBE: &str = "adventure";

/// Default gender id for a fresh profile.
pub const DEFAULT_GENDER: &str = "male";

/// Default destination type id for a fresh profile.
pub const DEFAULT_DESTINATION_TYPE: &str = "beaches";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Self::Male, Self::Female, Self::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.as_str() == id)
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed catalog of destination types offered in the vibe step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationType {
    Beaches,
    Mountains,
    Cities,
    Countryside,
    Desert,
    Islands,
}

impl DestinationType {
    pub const ALL: [DestinationType; 6] = [
        Self::Beaches,
        Self::Mountains,
        Self::Cities,
        Self::Countryside,
        Self::Desert,
        Self::Islands,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beaches => "beaches",
            Self::Mountains => "mountains",
            Self::Cities => "cities",
            Self::Countryside => "countryside",
            Self::Desert => "desert",
            Self::Islands => "islands",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.as_str() == id)
    }
}

impl std::fmt::Display for DestinationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse traveller archetype chosen in the first step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Persona {
    Adventurer,
    Relaxer,
    CultureSeeker,
    Foodie,
}

impl Persona {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adventurer => "adventurer",
            Self::Relaxer => "relaxer",
            Self::CultureSeeker => "culture_seeker",
            Self::Foodie => "foodie",
        }
    }
}

impl std::fmt::Display for Persona {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Travel-party composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Companions {
    #[default]
    Solo,
    Couple,
    Family,
    Friends,
}

impl Companions {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Solo => "solo",
            Self::Couple => "couple",
            Self::Family => "family",
            Self::Friends => "friends",
        }
    }
}

impl std::fmt::Display for Companions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a free-text age field the way the vibe form does: take the leading
/// integer, and treat anything non-numeric as 0.
pub fn parse_age(raw: &str) -> i32 {
    let trimmed = raw.trim_start();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end]
        .parse::<i32>()
        .map(|n| sign * n)
        .unwrap_or(0)
}

/// The intermediate user record collected in the persona and vibe steps.
///
/// Gender and destination type are kept as the ids the presentation
/// submitted; `validate_profile` decides whether they belong to their
/// catalogs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub age: i32,
    pub gender: String,
    pub preferred_destination_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<Persona>,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            age: 0,
            gender: DEFAULT_GENDER.to_string(),
            preferred_destination_type: DEFAULT_DESTINATION_TYPE.to_string(),
            persona: None,
        }
    }
}

impl UserProfile {
    /// Shallow merge: fields present in `update` replace ours.
    pub fn merge(&mut self, update: ProfileUpdate) {
        if let Some(age) = update.age {
            self.age = age;
        }
        if let Some(gender) = update.gender {
            self.gender = gender;
        }
        if let Some(destination_type) = update.preferred_destination_type {
            self.preferred_destination_type = destination_type;
        }
        if let Some(persona) = update.persona {
            self.persona = Some(persona);
        }
    }

    /// Render the profile for a generation prompt.
    pub fn to_prompt_section(&self) -> String {
        let mut parts = vec!["# Traveller".to_string()];
        parts.push(format!("- **Age:** {}", self.age));
        parts.push(format!("- **Gender:** {}", self.gender));
        parts.push(format!(
            "- **Preferred destination type:** {}",
            self.preferred_destination_type
        ));
        if let Some(persona) = self.persona {
            parts.push(format!("- **Persona:** {}", persona));
        }
        parts.join("\n")
    }
}

/// Partial profile update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    /// Accepts a number or the raw form text; text goes through
    /// `parse_age`.
    #[serde(
        default,
        deserialize_with = "deserialize_age",
        skip_serializing_if = "Option::is_none"
    )]
    pub age: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_destination_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona: Option<Persona>,
}

/// Age as submitted by the vibe form: a number, numeric text, or free
/// text. `null` leaves the age untouched.
fn deserialize_age<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AgeInput {
        Whole(i64),
        Fractional(f64),
        Text(String),
    }

    Ok(Option::<AgeInput>::deserialize(deserializer)?.map(|input| match input {
        AgeInput::Whole(n) => i32::try_from(n).unwrap_or(0),
        AgeInput::Fractional(n) => parse_age(&n.to_string()),
        AgeInput::Text(text) => parse_age(&text),
    }))
}

/// Trip parameters collected in the planning step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPlan {
    pub destination: String,
    pub from_location: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub companions: Companions,
    /// Mood tags in the order the user picked them; the first is primary.
    pub vibes: Vec<String>,
}

impl TripPlan {
    /// A fresh plan departing from `origin`.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            destination: String::new(),
            from_location: origin.into(),
            start_date: None,
            end_date: None,
            companions: Companions::default(),
            vibes: Vec::new(),
        }
    }

    /// Shallow merge. `vibes` is replaced wholesale when present.
    pub fn merge(&mut self, update: TripPlanUpdate) {
        if let Some(destination) = update.destination {
            self.destination = destination;
        }
        if let Some(from_location) = update.from_location {
            self.from_location = from_location;
        }
        if let Some(start_date) = update.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = update.end_date {
            self.end_date = end_date;
        }
        if let Some(companions) = update.companions {
            self.companions = companions;
        }
        if let Some(vibes) = update.vibes {
            self.vibes = vibes;
        }
    }

    /// The vibe that parameterizes packing generation.
    pub fn primary_vibe(&self) -> &str {
        self.vibes
            .first()
            .map(String::as_str)
            .unwrap_or(FALLBACK_PRIMARY_VIBE)
    }

    /// Inclusive trip length in days, when both dates are set and ordered.
    pub fn duration_days(&self) -> Option<i64> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if end >= start => Some((end - start).num_days() + 1),
            _ => None,
        }
    }

    pub fn to_prompt_section(&self) -> String {
        let mut parts = vec!["# Trip".to_string()];
        if self.destination.is_empty() {
            parts.push("- **Destination:** open, suggest one".to_string());
        } else {
            parts.push(format!("- **Destination:** {}", self.destination));
        }
        parts.push(format!("- **Departing from:** {}", self.from_location));
        parts.push(format!("- **Dates:** {}", format_date_range(self.start_date, self.end_date)));
        if let Some(days) = self.duration_days() {
            parts.push(format!("- **Length:** {} day(s)", days));
        }
        parts.push(format!("- **Companions:** {}", self.companions));
        if !self.vibes.is_empty() {
            parts.push(format!("- **Vibes:** {}", self.vibes.join(", ")));
        }
        parts.join("\n")
    }
}

/// Render an optional date range, using "TBD" for unknown ends.
pub fn format_date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> String {
    let fmt = |d: Option<NaiveDate>| match d {
        Some(d) => d.format("%b %-d, %Y").to_string(),
        None => "Date TBD".to_string(),
    };
    format!("{} - {}", fmt(start), fmt(end))
}

/// Partial trip-plan update. Absent fields are left untouched.
///
/// Dates distinguish "absent" (outer `None`) from "clear to null"
/// (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripPlanUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_location: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub companions: Option<Companions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibes: Option<Vec<String>>,
}

/// Any value that is present in the input, including `null`, becomes `Some`.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Trip recommendation from the generation service. Opaque to the wizard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TripRecommendation(pub serde_json::Value);

/// One packable item with a short tip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackingItem {
    pub item: String,
    pub tip: String,
}

/// A suggested product for the trip's look.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShopItem {
    pub name: String,
    pub description: String,
    pub price: String,
}

/// Packing list from the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackingRecommendation {
    /// Clothing grouped by category name.
    pub clothing: BTreeMap<String, Vec<PackingItem>>,
    pub essentials: Vec<PackingItem>,
    #[serde(default)]
    pub shop_the_look: Vec<ShopItem>,
}

impl PackingRecommendation {
    /// Total number of clothing and essential items.
    pub fn item_count(&self) -> usize {
        self.clothing.values().map(Vec::len).sum::<usize>() + self.essentials.len()
    }
}
