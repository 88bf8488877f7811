//! Ingredient block extraction
//!
//! Turns the raw text block returned by OCR into a product name, a cleaned
//! ingredient paragraph and a list of discrete ingredient tokens.
//!
//! Labels are messy: the ingredient paragraph may start on the same line as
//! the `INGREDIENTS:` header, wrap over several lines, and be followed by
//! nutrition or allergen panels. The heuristics below pick a small window of
//! lines after the header (or after the product name when no header exists)
//! and cut it at the first panel marker.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Product name reported when OCR produced no usable lines
pub const UNKNOWN_PRODUCT: &str = "UNKNOWN";

/// Header word that starts the ingredient paragraph
const INGREDIENTS_HEADER: &str = "INGREDIENTS";

/// Header with colon; text after it on the same line is the first fragment
const INGREDIENTS_LABEL: &str = "INGREDIENTS:";

/// Panels that follow the ingredient paragraph on most labels
const STOP_MARKERS: [&str; 6] = [
    "NUTRITION",
    "ALLERGEN",
    "DIRECTIONS",
    "NET WT",
    "DISTRIBUTED",
    "MANUFACTURED",
];

/// Lines taken after the product name when no header was found
const FALLBACK_WINDOW: usize = 6;

/// Lines inspected after the header before giving up on a stop marker
const CAPTURE_WINDOW: usize = 7;

static SEPARATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",|\s+and\s+|\s+or\s+|\s*;\s*|\n").unwrap());

/// Result of running extraction over one OCR text block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedLabel {
    /// First non-blank line of the label, or [`UNKNOWN_PRODUCT`]
    pub product_name: String,
    /// Ingredient window, lowercased with whitespace collapsed
    pub cleaned_text: String,
    /// Unique ingredient tokens in first-seen order
    pub ingredients: Vec<String>,
}

impl ExtractedLabel {
    fn unknown() -> Self {
        Self {
            product_name: UNKNOWN_PRODUCT.to_string(),
            cleaned_text: String::new(),
            ingredients: Vec::new(),
        }
    }
}

/// Extract product name, ingredient paragraph and ingredient tokens
pub fn extract_label(raw: &str) -> ExtractedLabel {
    let lines = split_lines(raw);
    let Some(first) = lines.first() else {
        return ExtractedLabel::unknown();
    };
    let product_name = first.to_string();

    let mut fragments: Vec<&str> = Vec::new();
    let mut capture = false;
    let mut start_idx = 1;

    for (i, line) in lines.iter().enumerate() {
        if line.to_uppercase().contains(INGREDIENTS_HEADER) {
            capture = true;
            if let Some(pos) = find_ascii_case_insensitive(line, INGREDIENTS_LABEL) {
                let remainder = line[pos + INGREDIENTS_LABEL.len()..].trim();
                if !remainder.is_empty() {
                    fragments.push(remainder);
                }
            }
            start_idx = i + 1;
            break;
        }
    }

    let rest = lines.get(start_idx..).unwrap_or(&[]);
    if capture {
        for line in rest.iter().take(CAPTURE_WINDOW) {
            if is_stop_line(line) {
                break;
            }
            fragments.push(line);
        }
    } else {
        fragments.extend(rest.iter().take(FALLBACK_WINDOW));
    }

    let window = fragments.join(" ");
    let cleaned_text = normalize_whitespace(&window.to_lowercase());
    let ingredients = tokenize_ingredients(&window);

    ExtractedLabel {
        product_name,
        cleaned_text,
        ingredients,
    }
}

/// Split a text block into trimmed, non-blank lines
///
/// Breaks on every line boundary OCR output may carry, including bare `\r`,
/// form feeds and the Unicode line and paragraph separators.
pub fn split_lines(raw: &str) -> Vec<&str> {
    raw.split(is_line_break)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Split an ingredient paragraph into unique lowercase tokens
///
/// Separators are commas, semicolons, newlines and the words `and` / `or`
/// surrounded by whitespace. Parentheses and periods are stripped from both
/// ends of each token; tokens shorter than two characters are dropped.
pub fn tokenize_ingredients(window: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tokens = Vec::new();

    for fragment in SEPARATOR_RE.split(window) {
        let token = fragment
            .trim()
            .trim_matches(|c| matches!(c, ')' | '(' | '.'))
            .to_lowercase();
        if token.chars().count() <= 1 {
            continue;
        }
        if seen.insert(token.clone()) {
            tokens.push(token);
        }
    }

    tokens
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\x0b' | '\x0c' | '\x1c' | '\x1d' | '\x1e' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn is_stop_line(line: &str) -> bool {
    let upper = line.to_uppercase();
    STOP_MARKERS.iter().any(|marker| upper.contains(marker))
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Byte offset of an ASCII needle, ignoring ASCII case
fn find_ascii_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(tokens: &[String]) -> HashSet<&str> {
        tokens.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_empty_text_is_unknown() {
        for raw in ["", "   ", "\n\n  \n\t"] {
            let label = extract_label(raw);
            assert_eq!(label.product_name, UNKNOWN_PRODUCT);
            assert_eq!(label.cleaned_text, "");
            assert!(label.ingredients.is_empty());
        }
    }

    #[test]
    fn test_product_name_is_first_non_blank_line() {
        let label = extract_label("\n   \n  Oat Bites  \nsugar, oats\n");
        assert_eq!(label.product_name, "Oat Bites");
    }

    #[test]
    fn test_split_lines_trims_and_drops_blanks() {
        let lines = split_lines("  a \n\n b\r\n   \nc");
        assert_eq!(lines, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_lines_breaks_on_all_line_boundaries() {
        let lines = split_lines("a\rb\x0bc\x0cd\x1ce\u{85}f\u{2028}g\u{2029}h");
        assert_eq!(lines, vec!["a", "b", "c", "d", "e", "f", "g", "h"]);
    }

    #[test]
    fn test_carriage_return_separated_label() {
        let label = extract_label("NAME\rINGREDIENTS: salt, sugar\rNUTRITION");
        assert_eq!(label.product_name, "NAME");
        assert_eq!(label.cleaned_text, "salt, sugar");
        assert_eq!(label.ingredients, vec!["salt", "sugar"]);
    }

    #[test]
    fn test_header_remainder_seeds_window() {
        let raw = "CHOCO BAR\nINGREDIENTS: sugar, cocoa butter\nmilk powder\nNET WT 50g";
        let label = extract_label(raw);
        assert_eq!(label.cleaned_text, "sugar, cocoa butter milk powder");
        assert_eq!(
            label.ingredients,
            vec!["sugar", "cocoa butter milk powder"]
        );
    }

    #[test]
    fn test_header_without_colon_contributes_no_fragment() {
        let raw = "SOUP\nMain Ingredients\ncarrot, onion\nDIRECTIONS: heat";
        let label = extract_label(raw);
        assert_eq!(label.cleaned_text, "carrot, onion");
        assert_eq!(label.ingredients, vec!["carrot", "onion"]);
    }

    #[test]
    fn test_mixed_case_header_remainder() {
        let raw = "ACME CRACKERS\nIngredients: wheat flour, butter, salt\nNUTRITION FACTS\n...";
        let label = extract_label(raw);
        assert_eq!(label.product_name, "ACME CRACKERS");
        assert_eq!(label.cleaned_text, "wheat flour, butter, salt");
        assert_eq!(label.ingredients, vec!["wheat flour", "butter", "salt"]);
    }

    #[test]
    fn test_first_header_wins() {
        let raw = "X\nINGREDIENTS: rice\nINGREDIENTS: corn";
        let label = extract_label(raw);
        assert_eq!(label.cleaned_text, "rice ingredients: corn");
    }

    #[test]
    fn test_fallback_window_is_six_lines_after_name() {
        let raw = "NAME\nl1\nl2\nl3\nl4\nl5\nl6\nl7\nl8";
        let label = extract_label(raw);
        assert_eq!(label.cleaned_text, "l1 l2 l3 l4 l5 l6");
    }

    #[test]
    fn test_fallback_window_ignores_stop_markers() {
        let raw = "NAME\nsugar\nNUTRITION FACTS\nsalt";
        let label = extract_label(raw);
        assert_eq!(label.cleaned_text, "sugar nutrition facts salt");
    }

    #[test]
    fn test_fallback_with_only_product_name() {
        let label = extract_label("JUST A NAME");
        assert_eq!(label.product_name, "JUST A NAME");
        assert_eq!(label.cleaned_text, "");
        assert!(label.ingredients.is_empty());
    }

    #[test]
    fn test_capture_window_is_seven_lines() {
        let raw = "NAME\nINGREDIENTS:\na1\na2\na3\na4\na5\na6\na7\na8";
        let label = extract_label(raw);
        assert_eq!(label.cleaned_text, "a1 a2 a3 a4 a5 a6 a7");
    }

    #[test]
    fn test_every_stop_marker_halts_capture() {
        for marker in STOP_MARKERS {
            let raw = format!("NAME\nINGREDIENTS: oats\nhoney\n{} here\nsalt", marker.to_lowercase());
            let label = extract_label(&raw);
            assert_eq!(label.cleaned_text, "oats honey", "marker {marker}");
        }
    }

    #[test]
    fn test_header_on_last_line() {
        let label = extract_label("NAME\nINGREDIENTS: water");
        assert_eq!(label.ingredients, vec!["water"]);
    }

    #[test]
    fn test_cleaned_text_collapses_whitespace() {
        let raw = "NAME\nINGREDIENTS:   Water,\tSugar   \nSALT";
        let label = extract_label(raw);
        assert_eq!(label.cleaned_text, "water, sugar salt");
    }

    #[test]
    fn test_tokenize_and_separator() {
        let tokens = tokenize_ingredients("milk, sugar and salt");
        assert_eq!(set(&tokens), HashSet::from(["milk", "sugar", "salt"]));
    }

    #[test]
    fn test_tokenize_or_and_semicolon() {
        let tokens = tokenize_ingredients("canola or sunflower oil ; yeast;salt");
        assert_eq!(tokens, vec!["canola", "sunflower oil", "yeast", "salt"]);
    }

    #[test]
    fn test_tokenize_keeps_words_containing_and() {
        let tokens = tokenize_ingredients("sandalwood, orange");
        assert_eq!(tokens, vec!["sandalwood", "orange"]);
    }

    #[test]
    fn test_tokenize_strips_parens_and_periods() {
        let tokens = tokenize_ingredients("(emulsifier), salt., spices (paprika).");
        assert_eq!(tokens, vec!["emulsifier", "salt", "spices (paprika"]);
    }

    #[test]
    fn test_tokenize_drops_short_tokens() {
        let tokens = tokenize_ingredients("a, b., salt, (c)");
        assert_eq!(tokens, vec!["salt"]);
    }

    #[test]
    fn test_tokenize_dedups_case_insensitively() {
        let tokens = tokenize_ingredients("Salt, SALT, salt, sugar");
        assert_eq!(tokens, vec!["salt", "sugar"]);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let raw = "BAR\nINGREDIENTS: dates, almonds, cocoa and sea salt\nALLERGENS: nuts";
        assert_eq!(extract_label(raw), extract_label(raw));
    }

    #[test]
    fn test_find_ascii_case_insensitive() {
        assert_eq!(find_ascii_case_insensitive("x Ingredients: y", "INGREDIENTS:"), Some(2));
        assert_eq!(find_ascii_case_insensitive("ingredients", "INGREDIENTS:"), None);
        assert_eq!(find_ascii_case_insensitive("", "INGREDIENTS:"), None);
    }
}
