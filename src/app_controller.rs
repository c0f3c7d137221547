use anyhow::{anyhow, Result};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::file_utils::FileManager;
use crate::language_utils;
use crate::translation::orchestrator::ProgressCallback;
use crate::translation::{TranslationRequest, TranslationResponse, TranslationService};

// @module: Application controller for Markdown file processing

/// Name of the per-folder file collecting documents that need attention
pub const ISSUES_LOG_FILE: &str = "mdtranslate.issues.log";

/// Counts reported after processing a folder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderSummary {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Main application controller for Markdown translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Translation pipeline shared by all files
    service: TranslationService,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let service = TranslationService::new(&config)?;
        Ok(Self { config, service })
    }

    /// Create a controller around an existing service
    pub fn with_service(config: Config, service: TranslationService) -> Self {
        Self { config, service }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn service(&self) -> &TranslationService {
        &self.service
    }

    /// Translate one Markdown file into `output_dir`.
    ///
    /// Returns the written path, or `None` when the output already exists
    /// and `force_overwrite` is off.
    pub async fn run(&self, input_file: PathBuf, output_dir: PathBuf, force_overwrite: bool) -> Result<Option<PathBuf>> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(&input_file, &output_dir, &multi_progress, force_overwrite)
            .await
    }

    async fn run_with_progress(
        &self,
        input_file: &Path,
        output_dir: &Path,
        multi_progress: &MultiProgress,
        force_overwrite: bool,
    ) -> Result<Option<PathBuf>> {
        let start_time = Instant::now();

        if !FileManager::file_exists(input_file) {
            return Err(anyhow!("Input file does not exist: {:?}", input_file));
        }

        FileManager::ensure_dir(output_dir)?;

        let output_path = self.output_path_for(input_file, output_dir);
        if output_path.exists() && !force_overwrite {
            warn!(
                "Skipping {:?}, translation already exists (use -f to force overwrite)",
                input_file
            );
            return Ok(None);
        }

        let text = FileManager::read_to_string(input_file)?;
        let response = self.translate_with_progress_bar(&text, multi_progress).await?;

        FileManager::write_to_file(&output_path, &response.translated_text)?;

        if !response.failed_chunks.is_empty() || !response.unresolved_placeholders.is_empty() {
            self.record_issues(input_file, output_dir, &response);
        }

        info!(
            "Success: {:?} ({} chunks, {:.0}% translated, {})",
            output_path,
            response.chunks,
            response.success_rate * 100.0,
            Self::format_duration(start_time.elapsed())
        );

        Ok(Some(output_path))
    }

    async fn translate_with_progress_bar(&self, text: &str, multi_progress: &MultiProgress) -> Result<TranslationResponse> {
        let progress_bar = multi_progress.add(ProgressBar::new(0));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(template_result.progress_chars("█▓▒░"));

        info!(
            "Translating into {} with {}",
            self.config.target_language,
            self.config.translation.get_model()
        );
        progress_bar.set_message("Translating");

        let pb = progress_bar.clone();
        let callback: ProgressCallback = Arc::new(move |completed: usize, total: usize| {
            pb.set_length(total as u64);
            pb.set_position(completed as u64);
        });

        let common = &self.config.translation.common;
        let request = TranslationRequest::new(text)
            .with_model(self.config.translation.get_model())
            .with_temperature(common.temperature);

        let result = self.service.translate_with_progress(&request, Some(callback)).await;

        // Leave only the folder bar visible when several files are processed
        progress_bar.finish_and_clear();

        Ok(result?)
    }

    fn record_issues(&self, input_file: &Path, output_dir: &Path, response: &TranslationResponse) {
        let mut message = format!("{}:", input_file.display());
        if !response.failed_chunks.is_empty() {
            warn!(
                "{} of {} chunks could not be translated in {:?}",
                response.failed_chunks.len(),
                response.chunks,
                input_file
            );
            message.push_str(&format!(" failed chunks {:?};", response.failed_chunks));
        }
        if !response.unresolved_placeholders.is_empty() {
            message.push_str(&format!(
                " unresolved placeholders {};",
                response.unresolved_placeholders.join(", ")
            ));
        }

        let log_path = output_dir.join(ISSUES_LOG_FILE);
        if let Err(e) = FileManager::append_to_log_file(&log_path, &message) {
            warn!("Failed to write issues log {:?}: {}", log_path, e);
        }
    }

    /// Output path `<stem>.<lang>.md` inside `output_dir`
    pub fn output_path_for(&self, input_file: &Path, output_dir: &Path) -> PathBuf {
        let language = language_utils::normalize_to_part1_or_part2t(&self.config.target_language)
            .unwrap_or_else(|_| self.config.target_language.to_lowercase());
        FileManager::generate_output_path(input_file, output_dir, &language, "md")
    }

    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }

    /// Translate every Markdown file below `input_dir`.
    ///
    /// Outputs go next to each input unless `output_dir` is given. Files that
    /// are themselves translations into the target language are ignored.
    pub async fn run_folder(&self, input_dir: PathBuf, output_dir: Option<PathBuf>, force_overwrite: bool) -> Result<FolderSummary> {
        let start_time = Instant::now();

        if !FileManager::dir_exists(&input_dir) {
            return Err(anyhow!("Input directory does not exist: {:?}", input_dir));
        }

        let documents: Vec<PathBuf> = FileManager::find_markdown_files(&input_dir)?
            .into_iter()
            .filter(|path| !FileManager::is_translated_output(path, &self.config.target_language))
            .collect();

        if documents.is_empty() {
            return Err(anyhow!("No Markdown files found in directory: {:?}", input_dir));
        }
        debug!("Found {} Markdown files in {:?}", documents.len(), input_dir);

        let multi_progress = MultiProgress::new();

        let folder_pb = multi_progress.add(ProgressBar::new(documents.len() as u64));
        let template_result = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg} {eta}")
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        folder_pb.set_style(template_result.progress_chars("█▓▒░"));
        folder_pb.set_message("Processing files");

        let mut summary = FolderSummary::default();

        for document in documents.iter() {
            let file_name = document
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());

            folder_pb.set_message(format!("Processing: {}", file_name));

            let target_dir = match (&output_dir, document.parent()) {
                (Some(dir), _) => dir.clone(),
                (None, Some(parent)) => parent.to_path_buf(),
                (None, None) => input_dir.clone(),
            };

            match self
                .run_with_progress(document, &target_dir, &multi_progress, force_overwrite)
                .await
            {
                Ok(Some(_)) => summary.processed += 1,
                Ok(None) => summary.skipped += 1,
                Err(e) => {
                    error!("Error processing file {}: {}", file_name, e);
                    summary.errors += 1;
                }
            }

            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");

        info!(
            "Folder processing completed: {} processed, {} skipped, {} errors ({})",
            summary.processed,
            summary.skipped,
            summary.errors,
            Self::format_duration(start_time.elapsed())
        );

        Ok(summary)
    }
}
