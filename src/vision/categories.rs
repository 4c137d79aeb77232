//! Follow-up information categories offered after a detection

use std::fmt;
use std::str::FromStr;

use crate::error::FoodVisionError;

/// A kind of follow-up question about a detected food.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FollowUpCategory {
    /// Energy content.
    Calories,
    /// Suitability for diabetics.
    DiabeticFriendly,
    /// How the dish is prepared.
    PreparationMethod,
    /// What goes into it.
    Ingredients,
    /// Macro and micro nutrients.
    NutritionalContent,
    /// Common allergens.
    AllergenInfo,
    /// Suitability for people with high blood pressure.
    HypertensionFriendly,
    /// Suitability for people with kidney disease.
    KidneySafe,
}

impl FollowUpCategory {
    /// Every category, in display order.
    pub const ALL: [FollowUpCategory; 8] = [
        Self::Calories,
        Self::DiabeticFriendly,
        Self::PreparationMethod,
        Self::Ingredients,
        Self::NutritionalContent,
        Self::AllergenInfo,
        Self::HypertensionFriendly,
        Self::KidneySafe,
    ];

    /// Wire value sent as `info_type`.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Calories => "calories",
            Self::DiabeticFriendly => "diabetic_friendly",
            Self::PreparationMethod => "preparation_method",
            Self::Ingredients => "ingredients",
            Self::NutritionalContent => "nutritional_content",
            Self::AllergenInfo => "allergen_info",
            Self::HypertensionFriendly => "hypertension_friendly",
            Self::KidneySafe => "kidney_safe",
        }
    }

    /// Human label shown above the answer.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Calories => "Calories",
            Self::DiabeticFriendly => "Diabetic Friendly",
            Self::PreparationMethod => "Preparation Method",
            Self::Ingredients => "Ingredients",
            Self::NutritionalContent => "Nutritional Content",
            Self::AllergenInfo => "Allergen Info",
            Self::HypertensionFriendly => "Hypertension Guidelines",
            Self::KidneySafe => "Kidney Safe",
        }
    }

    /// Looks a category up by its wire key.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.key() == key)
    }
}

/// Label for an `info_type` returned by the server; unknown keys are shown
/// as-is.
pub fn label_for_key(key: &str) -> String {
    FollowUpCategory::from_key(key)
        .map(|c| c.label().to_string())
        .unwrap_or_else(|| key.to_string())
}

impl fmt::Display for FollowUpCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FollowUpCategory {
    type Err = FoodVisionError;

    /// Accepts the wire key or the label, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|c| c.key() == wanted || c.label().to_lowercase() == wanted)
            .ok_or_else(|| {
                let keys: Vec<&str> = Self::ALL.iter().map(|c| c.key()).collect();
                FoodVisionError::Validation(format!(
                    "Unknown category '{}'. Expected one of: {}",
                    s.trim(),
                    keys.join(", ")
                ))
            })
    }
}
