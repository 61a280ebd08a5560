/*!
 * Tests for language utility functions
 */

use anyhow::Result;
use subweave::language_utils::{
    get_language_name, language_codes_match, normalize_detected_language, normalize_to_part1_or_part2t,
    validate_language_code,
};

#[test]
fn test_validate_language_code_should_accept_part1_and_part2() {
    for code in ["en", "fr", "eng", "fra", "fre", "ger", " EN "] {
        assert!(validate_language_code(code).is_ok(), "{} should be valid", code);
    }
    for code in ["xyz", "123", "e", ""] {
        assert!(validate_language_code(code).is_err(), "{} should be invalid", code);
    }
}

#[test]
fn test_normalize_to_part1_should_prefer_two_letter_codes() -> Result<()> {
    assert_eq!(normalize_to_part1_or_part2t("eng")?, "en");
    assert_eq!(normalize_to_part1_or_part2t("ger")?, "de");
    assert_eq!(normalize_to_part1_or_part2t("JA")?, "ja");
    // No ISO 639-1 code exists for Hawaiian
    assert_eq!(normalize_to_part1_or_part2t("haw")?, "haw");
    Ok(())
}

#[test]
fn test_language_codes_match_across_code_forms() {
    assert!(language_codes_match("en", "eng"));
    assert!(language_codes_match("fre", "fr"));
    assert!(!language_codes_match("en", "fr"));
    assert!(!language_codes_match("en", "xyz"));
}

#[test]
fn test_get_language_name_should_return_english_name() -> Result<()> {
    assert_eq!(get_language_name("ja")?, "Japanese");
    assert_eq!(get_language_name("spa")?, "Spanish");
    assert!(get_language_name("zz").is_err());
    Ok(())
}

#[test]
fn test_normalize_detected_language_should_accept_names_and_codes() {
    assert_eq!(normalize_detected_language("english").as_deref(), Some("en"));
    assert_eq!(normalize_detected_language("Japanese").as_deref(), Some("ja"));
    assert_eq!(normalize_detected_language("SPANISH").as_deref(), Some("es"));
    assert_eq!(normalize_detected_language("deu").as_deref(), Some("de"));
    assert_eq!(normalize_detected_language("  ").as_deref(), None);
    assert_eq!(normalize_detected_language("klingonese").as_deref(), None);
}
