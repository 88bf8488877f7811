//! Animal and alcohol keyword sets
//!
//! Membership is substring containment on lowercase text, so `"milk"`
//! flags `"whole milk powder"` and `"wine"` flags `"red wine vinegar"`.

/// Built-in animal-derived ingredient keywords
pub const DEFAULT_ANIMAL_KEYWORDS: &[&str] = &[
    "milk", "butter", "cream", "cheese", "whey", "casein", "caseinate", "lactose", "ghee",
    "yogurt", "egg", "albumin", "gelatin", "gelatine", "collagen", "honey", "beeswax",
    "royal jelly", "lard", "tallow", "suet", "beef", "pork", "bacon", "chicken", "turkey",
    "lamb", "mutton", "duck", "fish", "anchovy", "tuna", "salmon", "sardine", "shrimp",
    "prawn", "crab", "lobster", "oyster", "shellfish", "meat", "bone", "carmine",
    "cochineal", "shellac", "isinglass", "lanolin", "rennet", "pepsin", "animal fat",
];

/// Built-in alcohol-derived ingredient keywords
pub const DEFAULT_ALCOHOL_KEYWORDS: &[&str] = &[
    "alcohol", "ethanol", "ethyl alcohol", "wine", "beer", "lager", "stout", "rum",
    "vodka", "whisky", "whiskey", "brandy", "cognac", "liqueur", "liquor", "sake",
    "mirin", "sherry", "port wine", "champagne", "cider", "malt liquor", "spirit",
    "bourbon", "tequila", "kirsch", "marsala",
];

/// The two keyword sets used to flag ingredients
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordSets {
    animal: Vec<String>,
    alcohol: Vec<String>,
}

impl Default for KeywordSets {
    fn default() -> Self {
        Self::new(DEFAULT_ANIMAL_KEYWORDS, DEFAULT_ALCOHOL_KEYWORDS)
    }
}

impl KeywordSets {
    /// Build keyword sets, normalizing entries to trimmed lowercase
    pub fn new<A, B>(animal: &[A], alcohol: &[B]) -> Self
    where
        A: AsRef<str>,
        B: AsRef<str>,
    {
        Self {
            animal: normalize(animal),
            alcohol: normalize(alcohol),
        }
    }

    /// Defaults with either list optionally replaced
    pub fn with_overrides(animal: Option<&[String]>, alcohol: Option<&[String]>) -> Self {
        Self {
            animal: animal.map(normalize).unwrap_or_else(|| normalize(DEFAULT_ANIMAL_KEYWORDS)),
            alcohol: alcohol.map(normalize).unwrap_or_else(|| normalize(DEFAULT_ALCOHOL_KEYWORDS)),
        }
    }

    /// Whether the token contains any animal keyword
    pub fn matches_animal(&self, token: &str) -> bool {
        contains_any(&self.animal, token)
    }

    /// Whether the token contains any alcohol keyword
    pub fn matches_alcohol(&self, token: &str) -> bool {
        contains_any(&self.alcohol, token)
    }

    pub fn animal(&self) -> &[String] {
        &self.animal
    }

    pub fn alcohol(&self) -> &[String] {
        &self.alcohol
    }
}

fn normalize<S: AsRef<str>>(entries: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(entries.len());
    for entry in entries {
        let keyword = entry.as_ref().trim().to_lowercase();
        if !keyword.is_empty() && !out.contains(&keyword) {
            out.push(keyword);
        }
    }
    out
}

fn contains_any(keywords: &[String], token: &str) -> bool {
    let token = token.to_lowercase();
    keywords.iter().any(|keyword| token.contains(keyword.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substring_membership() {
        let sets = KeywordSets::default();
        assert!(sets.matches_animal("whole milk powder"));
        assert!(sets.matches_alcohol("red wine vinegar"));
        assert!(!sets.matches_animal("wheat flour"));
        assert!(!sets.matches_alcohol("salt"));
    }

    #[test]
    fn test_membership_is_case_insensitive() {
        let sets = KeywordSets::new(&["Milk"], &["RUM"]);
        assert!(sets.matches_animal("SKIMMED MILK"));
        assert!(sets.matches_alcohol("Rum Flavouring"));
    }

    #[test]
    fn test_both_sets_can_match() {
        let sets = KeywordSets::new(&["cream"], &["liqueur"]);
        let token = "cream liqueur";
        assert!(sets.matches_animal(token));
        assert!(sets.matches_alcohol(token));
    }

    #[test]
    fn test_normalize_drops_blank_and_duplicate_entries() {
        let sets = KeywordSets::new(&[" Egg ", "", "egg", "   "], &["beer"]);
        assert_eq!(sets.animal(), ["egg".to_string()]);
        assert_eq!(sets.alcohol(), ["beer".to_string()]);
    }

    #[test]
    fn test_overrides_replace_only_given_list() {
        let animal = vec!["gelatin".to_string()];
        let sets = KeywordSets::with_overrides(Some(animal.as_slice()), None);
        assert_eq!(sets.animal(), ["gelatin".to_string()]);
        assert!(sets.matches_alcohol("white wine"));
        assert!(!sets.matches_animal("milk"));
    }

    #[test]
    fn test_empty_sets_never_match() {
        let empty: [&str; 0] = [];
        let sets = KeywordSets::new(&empty, &empty);
        assert!(!sets.matches_animal("milk"));
        assert!(!sets.matches_alcohol("wine"));
    }
}
