//! Ingredient analysis
//!
//! Flags each extracted ingredient against the animal and alcohol keyword
//! sets, runs it through the harm classifier and sorts it into the report
//! buckets.

pub mod keywords;

pub use keywords::KeywordSets;

use anyhow::Result;
use serde::Serialize;
use tracing::debug;

use crate::classifier::{Classification, IngredientClassifier};
use crate::extract::ExtractedLabel;

/// One flagged ingredient in the report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngredientItem {
    pub name: String,
    /// Classifier label was anything other than `harmless`
    pub harmful: bool,
    pub confidence: f32,
}

/// Summary flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Detected {
    pub has_animal_ingredients: bool,
    pub has_alcohol: bool,
}

/// Response for one scanned label
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanReport {
    pub product_name: String,
    pub ingredients_full_text: String,
    pub ingredients_list: Vec<String>,
    pub detected: Detected,
    pub animal_ingredients: Vec<IngredientItem>,
    pub alcohol_ingredients: Vec<IngredientItem>,
    pub harmless_ingredients: Vec<String>,
}

/// Classify every ingredient and build the report
///
/// Buckets are exclusive: alcohol wins over animal, and only unflagged
/// ingredients labelled `harmless` land in the harmless bucket. Unflagged
/// ingredients with any other label appear in no bucket.
///
/// A classifier error on any ingredient fails the whole report.
pub fn aggregate(
    label: ExtractedLabel,
    keywords: &KeywordSets,
    classifier: &dyn IngredientClassifier,
) -> Result<ScanReport> {
    let mut animal_ingredients = Vec::new();
    let mut alcohol_ingredients = Vec::new();
    let mut harmless_ingredients = Vec::new();

    for ingredient in &label.ingredients {
        let is_animal = keywords.matches_animal(ingredient);
        let is_alcohol = keywords.matches_alcohol(ingredient);

        let classification = if ingredient.trim().is_empty() {
            Classification::harmless()
        } else {
            classifier.classify(ingredient)?
        };

        let item = IngredientItem {
            name: ingredient.clone(),
            harmful: !classification.is_harmless(),
            confidence: classification.confidence,
        };

        if is_alcohol {
            alcohol_ingredients.push(item);
        } else if is_animal {
            animal_ingredients.push(item);
        } else if classification.is_harmless() {
            harmless_ingredients.push(item.name);
        } else {
            debug!(
                "Ingredient {:?} labelled {} ({}) is not in any bucket",
                item.name, classification.label, item.confidence
            );
        }
    }

    Ok(ScanReport {
        product_name: label.product_name,
        ingredients_full_text: label.cleaned_text,
        ingredients_list: label.ingredients,
        detected: Detected {
            has_animal_ingredients: !animal_ingredients.is_empty(),
            has_alcohol: !alcohol_ingredients.is_empty(),
        },
        animal_ingredients,
        alcohol_ingredients,
        harmless_ingredients,
    })
}
