/*!
 * Tests for retry, ordering, concurrency and fault containment
 */

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use mdtranslate::errors::ProviderError;
use mdtranslate::providers::mock::MockProvider;
use mdtranslate::providers::CompletionRequest;
use mdtranslate::translation::{
    Chunk, Orchestrator, PromptTemplate, RetryPolicy, TranslationCache, TranslationParams, TranslationRequest,
    TranslationResult,
};

use crate::common;
use crate::common::recording_provider::RecordingProvider;

fn paragraphs(count: usize) -> String {
    (0..count)
        .map(|i| format!("Paragraph number {} is here.", i))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Later paragraphs answer sooner
fn delay_by_paragraph(request: &CompletionRequest) -> u64 {
    let digit = request
        .user_text()
        .and_then(|text| text.chars().find(|c| c.is_ascii_digit()))
        .and_then(|c| c.to_digit(10))
        .unwrap_or(0) as u64;
    (6 - digit.min(6)) * 15
}

fn tag_response(request: &CompletionRequest) -> String {
    format!("ZH:{}", request.user_text().unwrap_or_default())
}

fn panic_on_boom(request: &CompletionRequest) -> String {
    let text = request.user_text().unwrap_or_default();
    if text.contains("boom") {
        panic!("kaboom");
    }
    text.to_string()
}

#[tokio::test]
async fn test_translate_withAlwaysFailingBackend_shouldStopAfterThreeAttempts() -> Result<()> {
    let mut config = common::test_config();
    config.translation.common.retry_backoff_ms = 40;
    let provider = Arc::new(MockProvider::failing());
    let service = common::service_with(&config, provider.clone());

    let response = service.translate(&TranslationRequest::new("Hello there.")).await?;

    assert_eq!(provider.request_count(), 3);
    assert_eq!(response.failed_chunks, vec![0]);
    assert!(response.translated_text.starts_with("[Translation failed:"));
    assert!(response.translated_text.contains("500"));

    let instants = provider.call_instants();
    let first_gap = instants[1].duration_since(instants[0]);
    let second_gap = instants[2].duration_since(instants[1]);
    assert!(first_gap >= Duration::from_millis(40), "first gap {:?}", first_gap);
    assert!(second_gap >= Duration::from_millis(80), "second gap {:?}", second_gap);
    Ok(())
}

#[tokio::test]
async fn test_translate_withTransientFailures_shouldSucceedOnThirdAttempt() -> Result<()> {
    let config = common::test_config();
    let provider = Arc::new(RecordingProvider::with_script(vec![
        Err(ProviderError::ApiError { status_code: 503, message: "busy".to_string() }),
        Err(ProviderError::ConnectionError("reset".to_string())),
        Ok("Bonjour.".to_string()),
    ]));
    let service = common::service_with(&config, provider.clone());

    let response = service.translate(&TranslationRequest::new("Hello.")).await?;

    assert_eq!(response.translated_text, "Bonjour.");
    assert_eq!(response.success_rate, 1.0);
    assert_eq!(provider.call_count(), 3);
    Ok(())
}

#[tokio::test]
async fn test_translate_withRateLimit_shouldRetry() -> Result<()> {
    let config = common::test_config();
    let provider = Arc::new(RecordingProvider::with_script(vec![
        Err(ProviderError::RateLimitExceeded("slow down".to_string())),
        Ok("Hallo.".to_string()),
    ]));
    let service = common::service_with(&config, provider.clone());

    let response = service.translate(&TranslationRequest::new("Hello.")).await?;

    assert_eq!(response.translated_text, "Hallo.");
    assert_eq!(provider.call_count(), 2);
    Ok(())
}

#[tokio::test]
async fn test_translate_withEmptyResponses_shouldRetryThenFail() -> Result<()> {
    let config = common::test_config();
    let provider = Arc::new(MockProvider::empty());
    let service = common::service_with(&config, provider.clone());

    let response = service.translate(&TranslationRequest::new("Hello.")).await?;

    assert_eq!(provider.request_count(), 3);
    assert!(response.translated_text.contains("empty response"));
    Ok(())
}

#[tokio::test]
async fn test_translate_withUnauthorizedBackend_shouldNotRetry() -> Result<()> {
    let config = common::test_config();
    let provider = Arc::new(MockProvider::unauthorized());
    let service = common::service_with(&config, provider.clone());

    let response = service.translate(&TranslationRequest::new("Hello.")).await?;

    assert_eq!(provider.request_count(), 1);
    assert_eq!(response.translated_text, "[Translation failed: Authentication error: Invalid API key]");
    Ok(())
}

#[tokio::test]
async fn test_translate_withReversedLatencies_shouldKeepDocumentOrder() -> Result<()> {
    let mut config = common::test_config();
    config.translation.common.max_chunk_chars = 40;
    config.translation.common.concurrent_requests = 6;
    let provider = MockProvider::working()
        .with_custom_response(tag_response)
        .with_custom_delay(delay_by_paragraph);
    let service = common::service_with(&config, Arc::new(provider));

    let response = service.translate(&TranslationRequest::new(paragraphs(6))).await?;

    let expected = (0..6)
        .map(|i| format!("ZH:Paragraph number {} is here.", i))
        .collect::<Vec<_>>()
        .join("\n\n");
    assert_eq!(response.chunks, 6);
    assert_eq!(response.translated_text, expected);
    Ok(())
}

#[tokio::test]
async fn test_translate_withTwoWorkers_shouldNeverExceedTwoCalls() -> Result<()> {
    let mut config = common::test_config();
    config.translation.common.max_chunk_chars = 40;
    config.translation.common.concurrent_requests = 2;
    let provider = Arc::new(MockProvider::slow(30));
    let service = common::service_with(&config, provider.clone());

    let response = service.translate(&TranslationRequest::new(paragraphs(8))).await?;

    assert_eq!(response.chunks, 8);
    assert_eq!(provider.request_count(), 8);
    assert_eq!(provider.peak_in_flight(), 2);
    Ok(())
}

#[tokio::test]
async fn test_translate_withSingleWorker_shouldRunSequentially() -> Result<()> {
    let mut config = common::test_config();
    config.translation.common.max_chunk_chars = 40;
    config.translation.common.concurrent_requests = 1;
    let provider = Arc::new(MockProvider::slow(5));
    let service = common::service_with(&config, provider.clone());

    service.translate(&TranslationRequest::new(paragraphs(4))).await?;

    assert_eq!(provider.peak_in_flight(), 1);
    Ok(())
}

#[tokio::test]
async fn test_translate_withPanickingChunk_shouldFailOnlyThatChunk() -> Result<()> {
    let mut config = common::test_config();
    config.translation.common.max_chunk_chars = 30;
    let provider = MockProvider::working().with_custom_response(panic_on_boom);
    let service = common::service_with(&config, Arc::new(provider));
    let text = "First part is fine.\n\nThe boom happens here.\n\nLast part is fine.";

    let response = service.translate(&TranslationRequest::new(text)).await?;

    assert_eq!(response.chunks, 3);
    assert_eq!(response.failed_chunks, vec![1]);
    assert_eq!(
        response.translated_text,
        "First part is fine.\n\n[Translation failed: internal error: kaboom]\n\nLast part is fine."
    );
    Ok(())
}

#[tokio::test]
async fn test_translateAll_withSlowBackend_shouldTimeOutEachAttempt() {
    let provider = Arc::new(MockProvider::slow(500));
    let orchestrator = Orchestrator::new(
        provider.clone(),
        TranslationCache::disabled(),
        RetryPolicy::new(1, 1, Duration::from_millis(50)),
        PromptTemplate::default(),
    );
    let chunks = vec![Chunk {
        section: "Intro".to_string(),
        body: "Slow text.".to_string(),
    }];

    let results = orchestrator.translate_all(&chunks, &TranslationParams::default(), None).await;

    assert_eq!(provider.request_count(), 2);
    assert_eq!(
        results,
        vec![TranslationResult::Failed("Request timed out after 50 ms".to_string())]
    );
}

#[tokio::test]
async fn test_translateAll_withNoChunks_shouldReturnNothing() {
    let provider = Arc::new(MockProvider::working());
    let orchestrator = Orchestrator::new(
        provider.clone(),
        TranslationCache::in_memory(),
        RetryPolicy::default(),
        PromptTemplate::default(),
    );

    let results = orchestrator.translate_all(&[], &TranslationParams::default(), None).await;

    assert!(results.is_empty());
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_translateAll_withIntermittentBackend_shouldRecoverEveryChunk() {
    let provider = Arc::new(MockProvider::intermittent(2));
    let orchestrator = Orchestrator::new(
        provider.clone(),
        TranslationCache::disabled(),
        RetryPolicy::new(2, 1, Duration::from_secs(5)),
        PromptTemplate::default(),
    );
    let chunks: Vec<Chunk> = (0..4)
        .map(|i| Chunk {
            section: "Body".to_string(),
            body: format!("Sentence {}.", i),
        })
        .collect();
    let params = TranslationParams {
        concurrency: 1,
        ..TranslationParams::default()
    };

    let results = orchestrator.translate_all(&chunks, &params, None).await;

    assert!(results.iter().all(TranslationResult::is_success));
    for (chunk, result) in chunks.iter().zip(&results) {
        assert_eq!(result, &TranslationResult::Translated(chunk.body.clone()));
    }
}

#[tokio::test]
async fn test_translateAll_withSharedCacheAndOtherLanguage_shouldCallBackendAgain() {
    let provider = Arc::new(MockProvider::working());
    let orchestrator = Orchestrator::new(
        provider.clone(),
        TranslationCache::in_memory(),
        RetryPolicy::default(),
        PromptTemplate::default(),
    );
    let chunks = vec![Chunk {
        section: "Intro".to_string(),
        body: "Same words.".to_string(),
    }];
    let french = TranslationParams {
        target_language: "French".to_string(),
        ..TranslationParams::default()
    };

    orchestrator.translate_all(&chunks, &TranslationParams::default(), None).await;
    orchestrator.translate_all(&chunks, &french, None).await;
    orchestrator.translate_all(&chunks, &french, None).await;

    assert_eq!(provider.request_count(), 2);
    assert_eq!(orchestrator.cache().stats().0, 1);
}

#[tokio::test]
async fn test_translateAll_withSharedCacheAndOtherPrompt_shouldCallBackendAgain() {
    let provider = Arc::new(MockProvider::working());
    let cache = TranslationCache::in_memory();
    let chunks = vec![Chunk {
        section: "Intro".to_string(),
        body: "Same words.".to_string(),
    }];

    for template in [PromptTemplate::default(), PromptTemplate::new("Rewrite in {target_language}.")] {
        Orchestrator::new(provider.clone(), cache.clone(), RetryPolicy::default(), template)
            .translate_all(&chunks, &TranslationParams::default(), None)
            .await;
    }

    assert_eq!(provider.request_count(), 2);
}
