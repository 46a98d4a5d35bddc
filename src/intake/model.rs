//! Plain-data models shared by the conversation and the recommendation engine.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Gender recorded on a candidate record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
        }
    }
}

/// The user's answer to the gender question.
///
/// `Any` is a real answer. An unanswered question is `None` at the
/// `Option<GenderPreference>` level, never a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenderPreference {
    Male,
    Female,
    Any,
}

impl GenderPreference {
    /// Whether a candidate of `gender` passes this preference.
    pub fn accepts(&self, gender: Gender) -> bool {
        match self {
            Self::Any => true,
            Self::Male => gender == Gender::Male,
            Self::Female => gender == Gender::Female,
        }
    }

    pub fn all() -> [GenderPreference; 3] {
        [Self::Male, Self::Female, Self::Any]
    }
}

impl std::fmt::Display for GenderPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
            Self::Any => write!(f, "any"),
        }
    }
}

impl std::str::FromStr for GenderPreference {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            "any" => Ok(Self::Any),
            _ => Err(format!("Unknown gender preference: {}", s)),
        }
    }
}

/// Age bracket a user may pick for their specialist.
///
/// Boundaries are inclusive on both ends, so adjacent brackets overlap at
/// 35 and 45.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AgeRange {
    #[serde(rename = "25-35")]
    From25To35,
    #[serde(rename = "35-45")]
    From35To45,
    #[serde(rename = "45+")]
    From45,
}

impl AgeRange {
    pub fn all() -> [AgeRange; 3] {
        [Self::From25To35, Self::From35To45, Self::From45]
    }

    /// Inclusive `(min, max)` bounds; `None` means unbounded above.
    pub fn bounds(&self) -> (u32, Option<u32>) {
        match self {
            Self::From25To35 => (25, Some(35)),
            Self::From35To45 => (35, Some(45)),
            Self::From45 => (45, None),
        }
    }

    pub fn contains(&self, age: u32) -> bool {
        let (min, max) = self.bounds();
        age >= min && max.is_none_or(|max| age <= max)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::From25To35 => "25-35",
            Self::From35To45 => "35-45",
            Self::From45 => "45+",
        }
    }
}

impl std::fmt::Display for AgeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl std::str::FromStr for AgeRange {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "25-35" => Ok(Self::From25To35),
            "35-45" => Ok(Self::From35To45),
            "45+" => Ok(Self::From45),
            _ => Err(format!("Unknown age range: {}", s)),
        }
    }
}

/// A psychologist record from the external candidate table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub gender: Gender,
    pub age: u32,
    /// Internal specialization tags, related to symptoms through the catalog.
    #[serde(default)]
    pub specializations: BTreeSet<String>,
    /// Therapy methods as written on the profile, e.g. "Когнитивно-поведенческая терапия (КПТ)".
    #[serde(default)]
    pub methods: Vec<String>,
    pub rating: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience_years: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
}

/// Filter constraints accumulated across the conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    pub symptoms: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<GenderPreference>,
    #[serde(default)]
    pub age_ranges: BTreeSet<AgeRange>,
    #[serde(default)]
    pub methods: BTreeSet<String>,
}

impl Criteria {
    /// True when no filter would apply.
    pub fn is_unconstrained(&self) -> bool {
        self.symptoms.is_empty()
            && matches!(self.gender, None | Some(GenderPreference::Any))
            && self.age_ranges.is_empty()
            && self.methods.is_empty()
    }
}

/// A candidate returned by the engine with its display annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub candidate: Candidate,
    /// Requested symptoms whose specialization tags this candidate covers.
    pub matched_symptoms: BTreeSet<String>,
}

/// Output of a search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub results: Vec<RankedCandidate>,
    /// Set when the filters eliminated everyone and the list is the
    /// top-rated fallback instead of a genuine match.
    pub is_fallback: bool,
    /// Union of the per-candidate matched symptoms.
    pub matched_symptoms: BTreeSet<String>,
}

impl Recommendation {
    pub fn candidate_ids(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.candidate.id.as_str()).collect()
    }
}
