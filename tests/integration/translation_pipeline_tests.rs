/*!
 * End-to-end tests of the translation pipeline
 */

use anyhow::Result;
use parking_lot::Mutex;
use std::sync::Arc;

use mdtranslate::errors::{ProviderError, TranslationError};
use mdtranslate::providers::mock::MockProvider;
use mdtranslate::providers::CompletionRequest;
use mdtranslate::translation::elements::TOKEN_RE;
use mdtranslate::translation::{chunk, protect, ProgressCallback, TranslationRequest};

use crate::common::recording_provider::RecordingProvider;
use crate::common::{self, SAMPLE_MARKDOWN};

const SHORT_DOCUMENT: &str = "# Title\n\nSee [docs](http://x.com) and `code`.";

#[test]
fn test_protectAndChunk_withShortDocument_shouldYieldOneTaggedChunk() {
    let protected = protect(SHORT_DOCUMENT);
    let chunks = chunk(&protected.text, 1000);

    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].section, "Title");
    assert_eq!(protected.elements.len(), 2);

    let tokens: Vec<&str> = TOKEN_RE.find_iter(&chunks[0].body).map(|m| m.as_str()).collect();
    assert_eq!(tokens.len(), 2);
    assert_ne!(tokens[0], tokens[1]);
    assert!(chunks[0].body.contains("[docs]("));
}

#[tokio::test]
async fn test_translate_withEchoBackend_shouldReturnInputExactly() -> Result<()> {
    let config = common::test_config();
    let provider = Arc::new(RecordingProvider::new());
    let service = common::service_with(&config, provider.clone());

    let response = service.translate(&TranslationRequest::new(SHORT_DOCUMENT)).await?;

    assert_eq!(response.translated_text, SHORT_DOCUMENT);
    assert_eq!(response.chunks, 1);
    assert_eq!(response.success_rate, 1.0);
    assert_eq!(response.protected_elements, 2);
    assert!(response.unresolved_placeholders.is_empty());
    assert_eq!(provider.call_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_translate_withSampleDocument_shouldRoundTripUnderEcho() -> Result<()> {
    let config = common::test_config();
    let service = common::service_with(&config, Arc::new(MockProvider::working()));

    let response = service.translate(&TranslationRequest::new(SAMPLE_MARKDOWN)).await?;

    assert_eq!(response.translated_text, SAMPLE_MARKDOWN);
    assert!(response.failed_chunks.is_empty());
    assert_eq!(response.protected_elements, 10);
    assert_eq!(response.format_elements.headers, 3);
    Ok(())
}

#[tokio::test]
async fn test_translate_withTranslatedLinkText_shouldKeepDestination() -> Result<()> {
    let config = common::test_config();
    let provider = MockProvider::working().with_custom_response(|request: &CompletionRequest| {
        request
            .user_text()
            .unwrap_or_default()
            .replace("See", "参见")
            .replace("[docs]", "[文档]")
            .replace("and", "和")
    });
    let service = common::service_with(&config, Arc::new(provider));

    let response = service.translate(&TranslationRequest::new(SHORT_DOCUMENT)).await?;

    assert_eq!(response.translated_text, "# Title\n\n参见 [文档](http://x.com) 和 `code`.");
    Ok(())
}

#[tokio::test]
async fn test_translate_withUppercasingBackend_shouldRestoreTokens() -> Result<()> {
    let config = common::test_config();
    let provider = MockProvider::working()
        .with_custom_response(|request: &CompletionRequest| request.user_text().unwrap_or_default().to_uppercase());
    let service = common::service_with(&config, Arc::new(provider));

    let response = service.translate(&TranslationRequest::new(SHORT_DOCUMENT)).await?;

    assert_eq!(response.translated_text, "# TITLE\n\nSEE [DOCS](http://x.com) AND `code`.");
    assert!(response.unresolved_placeholders.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_translate_withInventedToken_shouldLeaveItAndReport() -> Result<()> {
    common::init_test_logging();
    let config = common::test_config();
    let provider = MockProvider::working().with_custom_response(|request: &CompletionRequest| {
        format!("{} MD_latex_block_00000000", request.user_text().unwrap_or_default())
    });
    let service = common::service_with(&config, Arc::new(provider));

    let response = service.translate(&TranslationRequest::new("Plain words only.")).await?;

    assert_eq!(response.translated_text, "Plain words only. MD_latex_block_00000000");
    assert_eq!(response.unresolved_placeholders, vec!["MD_latex_block_00000000".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_translate_withOversizedInput_shouldRejectWithoutCalls() {
    let config = common::test_config();
    let provider = Arc::new(RecordingProvider::new());
    let service = common::service_with(&config, provider.clone());

    let text = "a".repeat(50_001);
    let result = service.translate(&TranslationRequest::new(text)).await;

    assert!(matches!(
        result,
        Err(TranslationError::InputTooLong { length: 50_001, max: 50_000 })
    ));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_translate_withInputAtLimit_shouldBeAccepted() -> Result<()> {
    let config = common::test_config();
    let service = common::service_with(&config, Arc::new(MockProvider::working()));

    let text = "word ".repeat(10_000);
    assert_eq!(text.chars().count(), 50_000);

    let response = service.translate(&TranslationRequest::new(text.clone())).await?;
    assert_eq!(response.translated_text, text);
    Ok(())
}

#[tokio::test]
async fn test_translate_withBlankInput_shouldRejectAsEmpty() {
    let config = common::test_config();
    let service = common::service_with(&config, Arc::new(MockProvider::working()));

    let result = service.translate(&TranslationRequest::new("  \n\t ")).await;

    assert!(matches!(result, Err(TranslationError::EmptyInput)));
}

#[tokio::test]
async fn test_translate_repeatedRequest_shouldHitCacheOnce() -> Result<()> {
    let config = common::test_config();
    let provider = Arc::new(RecordingProvider::new());
    let service = common::service_with(&config, provider.clone());
    let request = TranslationRequest::new("Caching makes the second run free.");

    let first = service.translate(&request).await?;
    let second = service.translate(&request).await?;

    assert_eq!(provider.call_count(), 1);
    assert_eq!(first.translated_text, second.translated_text);
    assert_eq!(service.cache().stats().0, 1);
    Ok(())
}

#[tokio::test]
async fn test_translate_withDifferentTemperature_shouldMissCache() -> Result<()> {
    let config = common::test_config();
    let provider = Arc::new(RecordingProvider::new());
    let service = common::service_with(&config, provider.clone());

    service.translate(&TranslationRequest::new("Same text.").with_temperature(0.1)).await?;
    service.translate(&TranslationRequest::new("Same text.").with_temperature(0.7)).await?;

    assert_eq!(provider.call_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_translate_withOnlyProtectedContent_shouldNotCallBackend() -> Result<()> {
    let config = common::test_config();
    let provider = Arc::new(RecordingProvider::new());
    let service = common::service_with(&config, provider.clone());
    let text = "```\nlet x = 1;\n```\n\n| a | b |\n|---|---|\n| 1 | 2 |\n";

    let response = service.translate(&TranslationRequest::new(text)).await?;

    assert_eq!(response.translated_text, text);
    assert_eq!(provider.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_translate_instruction_shouldCarrySectionLanguageAndTerms() -> Result<()> {
    let config = common::test_config();
    let provider = Arc::new(RecordingProvider::new());
    let service = common::service_with(&config, provider.clone());

    service.translate(&TranslationRequest::new(SAMPLE_MARKDOWN)).await?;

    let calls = provider.calls();
    assert!(!calls.is_empty());
    let first = &calls[0];
    assert!(first.system.contains("Chinese"));
    assert!(first.system.contains("\"User Guide\""));
    assert!(!first.user.contains("[Section:"));
    assert!(calls.iter().all(|call| !call.user.contains("https://")));
    Ok(())
}

#[tokio::test]
async fn test_translate_withSmallChunks_shouldReportProgressForEveryChunk() -> Result<()> {
    let mut config = common::test_config();
    config.translation.common.max_chunk_chars = 40;
    let service = common::service_with(&config, Arc::new(MockProvider::working()));

    let text = (0..6)
        .map(|i| format!("Paragraph number {} is here.", i))
        .collect::<Vec<_>>()
        .join("\n\n");

    let seen: Arc<Mutex<Vec<(usize, usize)>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: ProgressCallback = Arc::new(move |done: usize, total: usize| sink.lock().push((done, total)));

    let response = service
        .translate_with_progress(&TranslationRequest::new(text.clone()), Some(callback))
        .await?;

    assert_eq!(response.chunks, 6);
    assert_eq!(response.translated_text, text);

    let seen = seen.lock();
    assert_eq!(seen.len(), 6);
    assert!(seen.iter().all(|(_, total)| *total == 6));
    assert_eq!(seen.iter().map(|(done, _)| *done).max(), Some(6));
    Ok(())
}

#[tokio::test]
async fn test_translate_withFailingBackend_shouldInsertMarkerAndKeepStructure() -> Result<()> {
    common::init_test_logging();
    let config = common::test_config();
    let provider = Arc::new(RecordingProvider::with_script(vec![
        Err(ProviderError::AuthenticationError("bad key".to_string())),
    ]));
    let service = common::service_with(&config, provider.clone());

    let response = service.translate(&TranslationRequest::new("Hello there.\n")).await?;

    assert_eq!(response.failed_chunks, vec![0]);
    assert_eq!(response.success_rate, 0.0);
    assert!(response.translated_text.starts_with("[Translation failed:"));
    assert!(response.translated_text.ends_with("]\n"));
    Ok(())
}
