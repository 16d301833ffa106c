use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, error, info, info_span, warn};

use crate::document::{resolve, FrameMapping, NarrativeRequest, RenderRequest, Resolution};
use crate::error::{ProcessError, RedactionError};
use crate::extraction::TextRegion;
use crate::frames::{sample_evenly, FrameSelector};
use crate::job::{Job, JobPhase, JobRepository, JobStatus, ReviewMode};
use crate::pii::{EnabledCategories, PiiDetector, PiiMatch};
use crate::redaction::RedactionEngine;
use crate::sanitize;
use crate::storage::filesystem::ensure_directory;
use crate::storage::{FileStorage, JobWorkspace};
use crate::worker::job::{WorkKind, WorkResult};

use super::collaborators::Collaborators;
use super::config::PipelineConfig;
use super::context::PipelineContext;
use super::error::{PipelineError, StageOutcome, StageWarning};
use super::progress::{ProgressEvent, ProgressReporter};

pub struct Pipeline {
    config: Arc<PipelineConfig>,
    jobs: Arc<dyn JobRepository>,
    collaborators: Collaborators,
    engine: RedactionEngine,
    storage: FileStorage,
}

impl Pipeline {
    pub fn new(
        config: Arc<PipelineConfig>,
        jobs: Arc<dyn JobRepository>,
        collaborators: Collaborators,
    ) -> Self {
        let engine = RedactionEngine::from_config(&config.redaction);
        let storage = FileStorage::new(&config.output_directory);

        Self {
            config,
            jobs,
            collaborators,
            engine,
            storage,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn detector(&self) -> &PiiDetector {
        &self.collaborators.detector
    }

    pub fn context_for(&self, job: Job) -> PipelineContext {
        PipelineContext::new(job, &self.config.work_directory)
    }

    /// Runs a freshly started job up to the review point, or straight to a
    /// finished text-only document for legacy jobs.
    pub fn process(
        &self,
        mut ctx: PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> (WorkResult, PipelineContext) {
        let video = sanitize::redact_path(&ctx.job.video);
        let _pipeline_span = info_span!("pipeline",
            job_id = %ctx.job.id,
            video = %video,
            work = "process",
        )
        .entered();

        if let Err(e) = self.run_process(&mut ctx, progress) {
            self.abort(&mut ctx, e);
        }

        let result = self.finish(&ctx, WorkKind::Process, progress);
        (result, ctx)
    }

    /// Applies the reviewed decisions and assembles the final document.
    pub fn generate(
        &self,
        mut ctx: PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> (WorkResult, PipelineContext) {
        let video = sanitize::redact_path(&ctx.job.video);
        let _pipeline_span = info_span!("pipeline",
            job_id = %ctx.job.id,
            video = %video,
            work = "generate",
        )
        .entered();

        let outcome = ctx
            .job
            .require_status(JobStatus::ReadyForReview)
            .map_err(PipelineError::from)
            .and_then(|()| self.run_assembly(&mut ctx, progress));
        if let Err(e) = outcome {
            self.abort(&mut ctx, e);
        }

        let result = self.finish(&ctx, WorkKind::Generate, progress);
        (result, ctx)
    }

    /// Recomputes matches for `requested` from the cached text regions and
    /// redraws the previews. Never runs OCR.
    pub fn redetect(
        &self,
        ctx: &mut PipelineContext,
        requested: &BTreeSet<String>,
    ) -> Result<(), PipelineError> {
        let _span = info_span!("redetect", job_id = %ctx.job.id).entered();

        let outcome = self.step_detect_pii(&ctx.job.text_regions, requested);
        let (enabled, matches) = ctx.absorb(outcome)?;
        ctx.job.enabled_optional = enabled.enabled;
        ctx.job.unavailable_categories = enabled.unavailable;
        ctx.job.replace_matches(matches);

        let outcome = self.step_render_previews(&ctx.job, &ctx.workspace);
        ctx.job.previews = ctx.absorb(outcome)?;
        Ok(())
    }

    fn run_process(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        ctx.job.require_status(JobStatus::Processing)?;

        // Step 1: Extract frames
        {
            let _step = info_span!("extract_frames").entered();
            self.enter_phase(ctx, JobPhase::ExtractingFrames, "Extracting frames...", progress);
            let outcome = self.step_extract_frames(&ctx.job, &ctx.workspace);
            ctx.job.frames = ctx.absorb(outcome)?;
        }

        // Step 2: Select context and key frames
        {
            let _step = info_span!("select_frames").entered();
            self.enter_phase(ctx, JobPhase::SelectingFrames, "Selecting key frames...", progress);
            let (context_frames, key_frames) =
                self.step_select_frames(&ctx.job.frames, ctx.job.review_mode);
            ctx.job.context_frames = context_frames;
            ctx.job.key_frames = key_frames;
        }

        if ctx.job.review_mode == ReviewMode::Legacy {
            return self.run_assembly(ctx, progress);
        }

        // Step 3: Extract text regions
        {
            let _step = info_span!("extract_text").entered();
            self.enter_phase(ctx, JobPhase::ExtractingText, "Extracting text from key frames...", progress);
            let outcome = self.step_extract_text(&ctx.job.key_frames);
            ctx.job.text_regions = ctx.absorb(outcome)?;
        }

        // Step 4: Detect PII
        {
            let _step = info_span!("detect_pii").entered();
            self.enter_phase(ctx, JobPhase::DetectingPii, "Detecting PII...", progress);
            let requested = ctx.job.enabled_optional.clone();
            let outcome = self.step_detect_pii(&ctx.job.text_regions, &requested);
            let (enabled, matches) = ctx.absorb(outcome)?;
            ctx.job.enabled_optional = enabled.enabled;
            ctx.job.unavailable_categories = enabled.unavailable;
            ctx.job.replace_matches(matches);
        }

        // Step 5: Render annotated previews
        {
            let _step = info_span!("render_previews").entered();
            self.enter_phase(ctx, JobPhase::RenderingPreviews, "Rendering previews...", progress);
            let outcome = self.step_render_previews(&ctx.job, &ctx.workspace);
            ctx.job.previews = ctx.absorb(outcome)?;
        }

        ctx.job.transition(JobStatus::ReadyForReview)?;
        ctx.job.phase = JobPhase::AwaitingReview;
        info!(
            "Job {} ready for review: {} matches on {} key frames",
            ctx.job.id,
            ctx.job.match_count(),
            ctx.job.key_frames.len()
        );
        Ok(())
    }

    /// Final redaction through stored document; ends in `Complete`.
    fn run_assembly(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        // Step 6: Apply redactions
        {
            let _step = info_span!("redact").entered();
            self.enter_phase(ctx, JobPhase::Redacting, "Applying redactions...", progress);
            let outcome = self.step_redact(&ctx.job, &ctx.workspace);
            ctx.job.redacted_frames = ctx.absorb(outcome)?;
        }

        // Step 7: Generate narrative
        let narrative = {
            let _step = info_span!("generate_narrative").entered();
            self.enter_phase(ctx, JobPhase::GeneratingNarrative, "Generating narrative...", progress);
            let outcome = self.step_generate_narrative(&ctx.job);
            ctx.absorb(outcome)?
        };

        // Step 8+9: Resolve frame references, render and store
        {
            let _step = info_span!("render_document").entered();
            self.enter_phase(ctx, JobPhase::RenderingDocument, "Rendering document...", progress);

            let outcome = self.step_resolve(&narrative, &ctx.job.redacted_frames);
            let resolution = ctx.absorb(outcome)?;

            let outcome = self.step_render_document(&ctx.job.title, &narrative, &resolution);
            ctx.job.output_path = Some(ctx.absorb(outcome)?);

            ctx.narrative = Some(narrative);
            ctx.resolution = Some(resolution);
        }

        ctx.job.transition(JobStatus::Complete)?;
        ctx.job.phase = JobPhase::Done;
        Ok(())
    }

    fn step_extract_frames(&self, job: &Job, workspace: &JobWorkspace) -> StageOutcome<Vec<PathBuf>> {
        if let Err(e) = workspace.create() {
            return StageOutcome::fatal(e);
        }

        let source = &self.collaborators.frame_source;
        match source.extract_frames(&job.video, &workspace.frames_dir()) {
            Ok(frames) if frames.is_empty() => {
                StageOutcome::fatal(PipelineError::NoFrames(sanitize::redact_path(&job.video)))
            }
            Ok(frames) => {
                debug!("{} produced {} frames", source.name(), frames.len());
                StageOutcome::Success(frames)
            }
            Err(e) => StageOutcome::fatal(e),
        }
    }

    /// Context frames are sampled evenly; key frames come from the selector.
    /// Legacy jobs embed no frames at all.
    fn step_select_frames(&self, frames: &[PathBuf], mode: ReviewMode) -> (Vec<PathBuf>, Vec<PathBuf>) {
        let context_frames = sample_evenly(frames, self.config.max_context_frames);
        let key_frames = match mode {
            ReviewMode::Interactive => FrameSelector::select(frames, self.config.max_embed_frames),
            ReviewMode::Legacy => Vec::new(),
        };

        debug!(
            "Selected {} context and {} key frames out of {}",
            context_frames.len(),
            key_frames.len(),
            frames.len()
        );
        (context_frames, key_frames)
    }

    /// A frame whose extraction fails counts as having no text.
    fn step_extract_text(&self, key_frames: &[PathBuf]) -> StageOutcome<Vec<Vec<TextRegion>>> {
        let extractor = &self.collaborators.extractor;
        let mut regions = Vec::with_capacity(key_frames.len());
        let mut warnings = Vec::new();

        for (frame_id, frame) in key_frames.iter().enumerate() {
            match extractor.extract(frame) {
                Ok(found) => {
                    debug!("Frame {}: {} text regions", frame_id, found.len());
                    regions.push(found);
                }
                Err(ProcessError::OcrUnavailable) => {
                    warnings.push(StageWarning::new(
                        JobPhase::ExtractingText,
                        format!(
                            "Text extraction ({}) is unavailable; frames are treated as having no text",
                            extractor.name()
                        ),
                    ));
                    regions.resize(key_frames.len(), Vec::new());
                    break;
                }
                Err(e) => {
                    warnings.push(StageWarning::new(
                        JobPhase::ExtractingText,
                        format!("Frame {}: {}", frame_id, e),
                    ));
                    regions.push(Vec::new());
                }
            }
        }

        StageOutcome::with_warnings(regions, warnings)
    }

    fn step_detect_pii(
        &self,
        regions: &[Vec<TextRegion>],
        requested: &BTreeSet<String>,
    ) -> StageOutcome<(EnabledCategories, Vec<Vec<PiiMatch>>)> {
        let detector = &self.collaborators.detector;
        let enabled = detector.resolve_enabled(requested);

        let mut warnings = Vec::new();
        for name in &enabled.unavailable {
            warnings.push(StageWarning::new(
                JobPhase::DetectingPii,
                format!("Category '{}' is unavailable and was skipped", name),
            ));
        }
        for name in &enabled.unknown {
            warnings.push(StageWarning::new(
                JobPhase::DetectingPii,
                format!("Unknown category '{}' was ignored", name),
            ));
        }

        let matches = detector.detect_frames(regions, &enabled.enabled);
        StageOutcome::with_warnings((enabled, matches), warnings)
    }

    fn step_render_previews(
        &self,
        job: &Job,
        workspace: &JobWorkspace,
    ) -> StageOutcome<Vec<Option<PathBuf>>> {
        if let Err(e) = ensure_directory(&workspace.previews_dir()) {
            return StageOutcome::Partial(
                vec![None; job.key_frames.len()],
                vec![StageWarning::new(
                    JobPhase::RenderingPreviews,
                    format!("No previews rendered: {}", e),
                )],
            );
        }

        let engine = &self.engine;
        let results: Vec<Result<PathBuf, RedactionError>> = job
            .key_frames
            .par_iter()
            .enumerate()
            .map(|(frame_id, frame)| {
                let dest = workspace.preview_path(frame_id);
                let matches = job.matches.get(frame_id).map(Vec::as_slice).unwrap_or(&[]);
                engine.preview_file(frame, &dest, matches).map(|()| dest)
            })
            .collect();

        let mut warnings = Vec::new();
        let previews = results
            .into_iter()
            .enumerate()
            .map(|(frame_id, result)| match result {
                Ok(path) => Some(path),
                Err(e) => {
                    warnings.push(StageWarning::new(
                        JobPhase::RenderingPreviews,
                        format!("Frame {} has no preview: {}", frame_id, e),
                    ));
                    None
                }
            })
            .collect();

        StageOutcome::with_warnings(previews, warnings)
    }

    /// Frames that cannot be redacted are left out of the document rather
    /// than embedded unredacted.
    fn step_redact(&self, job: &Job, workspace: &JobWorkspace) -> StageOutcome<Vec<PathBuf>> {
        if let Err(e) = ensure_directory(&workspace.redacted_dir()) {
            return StageOutcome::Partial(
                Vec::new(),
                vec![StageWarning::new(
                    JobPhase::Redacting,
                    format!("All {} frames left out of the document: {}", job.key_frames.len(), e),
                )],
            );
        }

        let engine = &self.engine;
        let mode = job.redaction_mode;
        let results: Vec<Result<(PathBuf, usize), RedactionError>> = job
            .key_frames
            .par_iter()
            .enumerate()
            .map(|(frame_id, frame)| {
                let dest = workspace.redacted_path(frame_id, frame);
                let decisions = job.decisions_for_frame(frame_id);
                engine
                    .redact_file(frame, &dest, &decisions, mode)
                    .map(|count| (dest, count))
            })
            .collect();

        let mut warnings = Vec::new();
        let mut redacted = Vec::with_capacity(results.len());
        let mut regions = 0;
        for (frame_id, result) in results.into_iter().enumerate() {
            match result {
                Ok((path, count)) => {
                    regions += count;
                    redacted.push(path);
                }
                Err(e) => warnings.push(StageWarning::new(
                    JobPhase::Redacting,
                    format!("Frame {} left out of the document: {}", frame_id, e),
                )),
            }
        }

        info!(
            "Redacted {} regions on {} frames ({} mode)",
            regions,
            redacted.len(),
            mode
        );
        StageOutcome::with_warnings(redacted, warnings)
    }

    fn step_generate_narrative(&self, job: &Job) -> StageOutcome<String> {
        let generator = &self.collaborators.narrative;
        let request = NarrativeRequest {
            title: &job.title,
            context_frames: &job.context_frames,
            key_frames: &job.redacted_frames,
        };

        match generator.generate(&request) {
            Ok(text) => {
                debug!("{} produced {} bytes of narrative", generator.name(), text.len());
                StageOutcome::Success(text)
            }
            Err(e) => StageOutcome::fatal(e),
        }
    }

    fn step_resolve(&self, narrative: &str, redacted: &[PathBuf]) -> StageOutcome<Resolution> {
        let mapping = FrameMapping::from_key_frames(redacted);
        let resolution = resolve(narrative, &mapping);

        let warnings = resolution
            .warnings
            .iter()
            .map(|w| {
                StageWarning::new(
                    JobPhase::RenderingDocument,
                    format!("Dropped frame reference {}", w),
                )
            })
            .collect();

        StageOutcome::with_warnings(resolution, warnings)
    }

    fn step_render_document(
        &self,
        title: &str,
        narrative: &str,
        resolution: &Resolution,
    ) -> StageOutcome<PathBuf> {
        let renderer = &self.collaborators.renderer;
        let request = RenderRequest {
            title,
            narrative,
            resolution,
        };

        let bytes = match renderer.render(&request) {
            Ok(bytes) => bytes,
            Err(e) => return StageOutcome::fatal(e),
        };

        let filename = FileStorage::document_name(title, renderer.extension());
        match self.storage.store(&bytes, &filename) {
            Ok(path) => {
                debug!("Stored document -> {}", sanitize::redact_path(&path));
                StageOutcome::Success(path)
            }
            Err(e) => StageOutcome::fatal(e),
        }
    }

    /// Publishes the phase to pollers and subscribers.
    fn enter_phase(
        &self,
        ctx: &mut PipelineContext,
        phase: JobPhase,
        message: &str,
        progress: &dyn ProgressReporter,
    ) {
        ctx.job.phase = phase;
        if let Err(e) = self.jobs.update(&ctx.job.id, &mut |stored| {
            stored.phase = phase;
            Ok(())
        }) {
            warn!("Could not publish phase for job {}: {}", ctx.job.id, e);
        }

        progress.report(ProgressEvent::Phase {
            status: ctx.job.status(),
            phase,
            message: message.to_string(),
        });
    }

    fn abort(&self, ctx: &mut PipelineContext, error: PipelineError) {
        let cause = error.to_string();
        error!("Job {} failed: {}", ctx.job.id, cause);
        if !ctx.job.fail(cause.as_str()) {
            warn!(
                "Job {} is already {}; failure not recorded",
                ctx.job.id,
                ctx.job.status()
            );
        }
    }

    /// Stores the working copy and announces where the job ended up.
    fn finish(
        &self,
        ctx: &PipelineContext,
        kind: WorkKind,
        progress: &dyn ProgressReporter,
    ) -> WorkResult {
        self.commit(&ctx.job);

        match ctx.job.status() {
            JobStatus::ReadyForReview => progress.report(ProgressEvent::AwaitingReview {
                match_count: ctx.job.match_count(),
            }),
            JobStatus::Complete => progress.report(ProgressEvent::Completed {
                output_path: ctx
                    .job
                    .output_path
                    .as_deref()
                    .map(Path::display)
                    .map(|p| p.to_string())
                    .unwrap_or_default(),
            }),
            JobStatus::Error => progress.report(ProgressEvent::Failed {
                error: ctx.job.error.clone().unwrap_or_default(),
            }),
            JobStatus::Uploaded | JobStatus::Processing => {}
        }

        WorkResult::from_job(&ctx.job, kind, ctx.warnings.len())
    }

    fn commit(&self, job: &Job) {
        let snapshot = job.clone();
        if let Err(e) = self.jobs.update(&job.id, &mut |stored| {
            *stored = snapshot.clone();
            Ok(())
        }) {
            warn!("Could not store job {}: {}", job.id, e);
        }
    }
}
