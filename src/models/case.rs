use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// Detection case the backend runs against a submitted video.
///
/// The snake_case identifier is what the backend expects in the
/// `case_type` form field.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CaseType {
    #[default]
    Anpr,
    WrongSide,
    Helmet,
    Triple,
    WrongLane,
    Stalled,
    Seatbelt,
    Blacklist,
}

impl CaseType {
    pub fn title(self) -> &'static str {
        match self {
            Self::Anpr => "Number Plate",
            Self::WrongSide => "Wrong Side",
            Self::Helmet => "No Helmet",
            Self::Triple => "Triple Riding",
            Self::WrongLane => "Wrong Lane",
            Self::Stalled => "Stalled Vehicle",
            Self::Seatbelt => "No Seatbelt",
            Self::Blacklist => "Security Alert",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Anpr => "AI License Plate recognition",
            Self::WrongSide => "Illegal direction detection",
            Self::Helmet => "Two-wheeler safety check",
            Self::Triple => "Overloading detection",
            Self::WrongLane => "Lane discipline monitoring",
            Self::Stalled => "Stationary traffic alert",
            Self::Seatbelt => "Occupant safety check",
            Self::Blacklist => "Blacklist/Theft detection",
        }
    }

    /// All known cases, in catalog order.
    pub fn catalog() -> impl Iterator<Item = CaseType> {
        Self::iter()
    }
}
