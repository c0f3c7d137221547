/*!
 * Tests for ISO language code utilities
 */

use mdtranslate::language_utils::{
    get_language_name, language_codes_match, normalize_to_part1_or_part2t, normalize_to_part2t,
    validate_language_code, LanguageCodeType,
};

#[test]
fn test_validateLanguageCode_withValidCodes_shouldReturnType() {
    assert_eq!(validate_language_code("en").unwrap(), LanguageCodeType::Part1);
    assert_eq!(validate_language_code("fra").unwrap(), LanguageCodeType::Part2T);
    assert_eq!(validate_language_code("fre").unwrap(), LanguageCodeType::Part2B);
    assert_eq!(validate_language_code(" ZH ").unwrap(), LanguageCodeType::Part1);
}

#[test]
fn test_validateLanguageCode_withInvalidCodes_shouldFail() {
    assert!(validate_language_code("").is_err());
    assert!(validate_language_code("q").is_err());
    assert!(validate_language_code("english").is_err());
}

#[test]
fn test_normalizeToPart2t_shouldConvertAllForms() {
    assert_eq!(normalize_to_part2t("zh").unwrap(), "zho");
    assert_eq!(normalize_to_part2t("chi").unwrap(), "zho");
    assert_eq!(normalize_to_part2t("deu").unwrap(), "deu");
    assert!(normalize_to_part2t("zz").is_err());
}

#[test]
fn test_normalizeToPart1OrPart2t_shouldPreferShortCode() {
    assert_eq!(normalize_to_part1_or_part2t("zho").unwrap(), "zh");
    assert_eq!(normalize_to_part1_or_part2t("ja").unwrap(), "ja");
}

#[test]
fn test_languageCodesMatch_acrossForms_shouldMatch() {
    assert!(language_codes_match("zh", "chi"));
    assert!(language_codes_match("fr", "FRA"));
    assert!(!language_codes_match("fr", "de"));
    assert!(!language_codes_match("fr", "not-a-code"));
}

#[test]
fn test_getLanguageName_shouldReturnEnglishName() {
    assert_eq!(get_language_name("zh").unwrap(), "Chinese");
    assert_eq!(get_language_name("ger").unwrap(), "German");
    assert!(get_language_name("xx").is_err());
}
