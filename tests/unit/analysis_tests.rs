/*!
 * Tests for document analysis
 */

use mdtranslate::translation::analysis::{extract_key_terms, identify_format_elements, FormatElements};

use crate::common::SAMPLE_MARKDOWN;

#[test]
fn test_identifyFormatElements_withSampleDocument_shouldCountStructure() {
    let elements = identify_format_elements(SAMPLE_MARKDOWN);

    assert_eq!(
        elements,
        FormatElements {
            code_blocks: 1,
            headers: 3,
            lists: 0,
            tables: 1,
        }
    );
}

#[test]
fn test_identifyFormatElements_withNestedList_shouldCountOneRun() {
    let text = "- first\n  - nested\n- second\n\nParagraph\n";

    assert_eq!(identify_format_elements(text).lists, 1);
}

#[test]
fn test_identifyFormatElements_withHashWithoutSpace_shouldNotCountHeader() {
    assert_eq!(identify_format_elements("#hashtag\n").headers, 0);
}

#[test]
fn test_extractKeyTerms_withCaseVariants_shouldCountThemSeparately() {
    let text = "The scheduler wakes the worker. The scheduler parks the worker. Scheduler metrics.";

    assert_eq!(
        extract_key_terms(text, 2),
        vec!["scheduler".to_string(), "worker".to_string()]
    );
}

#[test]
fn test_extractKeyTerms_shouldNeverExceedLimit() {
    let terms = extract_key_terms(SAMPLE_MARKDOWN, 3);

    assert!(terms.len() <= 3);
    assert!(terms.iter().all(|t| t.chars().count() > 3));
}
