/*!
 * Full app lifecycle tests: files in, translated files out
 */

use anyhow::Result;
use std::fs;
use std::sync::Arc;

use mdtranslate::app_controller::{Controller, ISSUES_LOG_FILE};
use mdtranslate::providers::mock::MockProvider;
use mdtranslate::providers::CompletionRequest;

use crate::common::{self, SAMPLE_MARKDOWN};

fn shout(request: &CompletionRequest) -> String {
    request.user_text().unwrap_or_default().to_uppercase()
}

fn controller_with(provider: MockProvider) -> Controller {
    let config = common::test_config();
    let service = common::service_with(&config, Arc::new(provider));
    Controller::with_service(config, service)
}

#[tokio::test]
async fn test_run_withMarkdownFile_shouldWriteLanguageSuffixedOutput() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "guide.md", SAMPLE_MARKDOWN)?;
    let output_dir = temp_dir.path().join("out");

    let controller = controller_with(MockProvider::working());
    let written = controller.run(input, output_dir.clone(), false).await?;

    let expected = output_dir.join("guide.zh.md");
    assert_eq!(written, Some(expected.clone()));
    assert_eq!(fs::read_to_string(&expected)?, SAMPLE_MARKDOWN);
    assert!(!output_dir.join(ISSUES_LOG_FILE).exists());
    Ok(())
}

#[tokio::test]
async fn test_run_withExistingOutput_shouldSkipUnlessForced() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let input = common::create_test_file(&dir, "notes.md", "Some notes.")?;
    let existing = common::create_test_file(&dir, "notes.zh.md", "old translation")?;

    let controller = controller_with(MockProvider::working().with_custom_response(shout));

    let skipped = controller.run(input.clone(), dir.clone(), false).await?;
    assert_eq!(skipped, None);
    assert_eq!(fs::read_to_string(&existing)?, "old translation");

    let forced = controller.run(input, dir, true).await?;
    assert_eq!(forced, Some(existing.clone()));
    assert_eq!(fs::read_to_string(&existing)?, "SOME NOTES.");
    Ok(())
}

#[test]
fn test_run_withMissingInput_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = controller_with(MockProvider::working());

    let result = tokio_test::block_on(async {
        controller
            .run(temp_dir.path().join("absent.md"), temp_dir.path().to_path_buf(), false)
            .await
    });

    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_run_withFailingBackend_shouldWriteMarkersAndIssuesLog() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let dir = temp_dir.path().to_path_buf();
    let input = common::create_test_file(&dir, "broken.md", "# Heading\n\nText that fails.\n")?;

    let controller = controller_with(MockProvider::unauthorized());
    let written = controller.run(input, dir.clone(), false).await?;

    let output = fs::read_to_string(written.expect("output should be written"))?;
    assert!(output.contains("[Translation failed:"));

    let issues = fs::read_to_string(dir.join(ISSUES_LOG_FILE))?;
    assert!(issues.contains("broken.md"));
    assert!(issues.contains("failed chunks [0]"));
    Ok(())
}

#[tokio::test]
async fn test_runFolder_shouldTranslateEachDocumentOnce() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let root = temp_dir.path().to_path_buf();
    common::create_test_file(&root, "a.md", "Alpha text.")?;
    common::create_test_file(&root, "sub/b.markdown", "Beta text.")?;
    common::create_test_file(&root, "notes.txt", "ignored")?;
    common::create_test_file(&root, "old.zh.md", "已经翻译")?;

    let provider = MockProvider::working().with_custom_response(shout);
    let counter = provider.clone();
    let controller = controller_with(provider);

    let summary = controller.run_folder(root.clone(), None, false).await?;
    assert_eq!((summary.processed, summary.skipped, summary.errors), (2, 0, 0));
    assert_eq!(counter.request_count(), 2);
    assert_eq!(fs::read_to_string(root.join("a.zh.md"))?, "ALPHA TEXT.");
    assert_eq!(fs::read_to_string(root.join("sub/b.zh.md"))?, "BETA TEXT.");
    assert!(!root.join("old.zh.zh.md").exists());

    let second = controller.run_folder(root, None, false).await?;
    assert_eq!((second.processed, second.skipped, second.errors), (0, 2, 0));
    Ok(())
}

#[tokio::test]
async fn test_runFolder_withOutputDir_shouldCollectOutputsThere() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input_dir = temp_dir.path().join("docs");
    let output_dir = temp_dir.path().join("translated");
    common::create_test_file(&input_dir, "one.md", "One.")?;
    common::create_test_file(&input_dir, "two.md", "Two.")?;

    let controller = controller_with(MockProvider::working());
    let summary = controller.run_folder(input_dir, Some(output_dir.clone()), false).await?;

    assert_eq!(summary.processed, 2);
    assert!(output_dir.join("one.zh.md").exists());
    assert!(output_dir.join("two.zh.md").exists());
    Ok(())
}

#[tokio::test]
async fn test_runFolder_withoutMarkdownFiles_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "readme.txt", "plain")?;

    let controller = controller_with(MockProvider::working());
    let result = controller.run_folder(temp_dir.path().to_path_buf(), None, false).await;

    assert!(result.is_err());
    Ok(())
}
