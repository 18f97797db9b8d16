//! Stage Workers (C3): intake, acquire, transcribe, summarize, finalize,
//! wired by bounded queues, plus the error-consumer task that fails jobs on
//! abnormal stage termination (§4.3).

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use digest_adapters::{MediaAcquirer, Summarizer, Transcriber};
use digest_store::{ArtifactStore, FailureTracker};

use crate::error::CoreError;
use crate::job::Status;
use crate::registry::{JobHandle, JobRegistry};
use crate::stages::error::StageError;
use crate::stages::format::{chunk_segments_for_summary, dedupe_caption_segments};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bounds the intake channel; a full intake queue is what `enqueue`
    /// reports as [`CoreError::IntakeFull`] (§6.1, HTTP 429).
    pub intake_queue_capacity: usize,
    /// Bounds the four inter-stage channels (pending/downloaded/summarizable/done).
    pub stage_queue_capacity: usize,
    pub chunk_duration_secs: u64,
    pub summary_chunk_char_budget: usize,
    pub summarizer_system_prompt: Arc<str>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            intake_queue_capacity: 1024,
            stage_queue_capacity: 1024,
            chunk_duration_secs: 20 * 60,
            summary_chunk_char_budget: 30_000 * 4,
            summarizer_system_prompt: Arc::from(
                "You summarize video transcripts into a concise Markdown summary.",
            ),
        }
    }
}

/// Handle returned by [`Pipeline::spawn`]; holds the intake sender callers
/// use to enqueue work. Worker tasks run for the lifetime of the process.
pub struct Pipeline {
    intake_tx: mpsc::Sender<String>,
}

impl Pipeline {
    pub fn spawn<A, T, S>(
        registry: Arc<JobRegistry>,
        artifacts: Arc<ArtifactStore>,
        failures: Arc<FailureTracker>,
        acquirer: Arc<A>,
        transcriber: Arc<T>,
        summarizer: Arc<S>,
        config: PipelineConfig,
    ) -> Self
    where
        A: MediaAcquirer,
        T: Transcriber,
        S: Summarizer,
    {
        let (intake_tx, intake_rx) = mpsc::channel::<String>(config.intake_queue_capacity);
        let (pending_tx, pending_rx) = mpsc::channel::<JobHandle>(config.stage_queue_capacity);
        let (downloaded_tx, downloaded_rx) = mpsc::channel::<JobHandle>(config.stage_queue_capacity);
        let (summarizable_tx, summarizable_rx) = mpsc::channel::<JobHandle>(config.stage_queue_capacity);
        let (done_tx, done_rx) = mpsc::channel::<JobHandle>(config.stage_queue_capacity);
        let (error_tx, error_rx) = mpsc::unbounded_channel::<StageError>();

        spawn_error_consumer(registry.clone(), failures.clone(), error_rx);

        spawn_intake(registry.clone(), intake_rx, pending_tx, error_tx.clone());

        spawn_acquire(
            registry.clone(),
            artifacts.clone(),
            acquirer,
            pending_rx,
            downloaded_tx,
            summarizable_tx.clone(),
            error_tx.clone(),
        );

        spawn_transcribe(
            registry.clone(),
            artifacts.clone(),
            transcriber,
            config.chunk_duration_secs,
            downloaded_rx,
            summarizable_tx,
            error_tx.clone(),
        );

        spawn_summarize(
            registry.clone(),
            artifacts,
            summarizer,
            config.summarizer_system_prompt,
            config.summary_chunk_char_budget,
            summarizable_rx,
            done_tx,
            error_tx.clone(),
        );

        spawn_finalize(registry, failures, done_rx, error_tx);

        Self { intake_tx }
    }

    /// Enqueues `video_id` for intake; rejects synchronously when the
    /// intake queue is at capacity (§4.3, §6.1 maps this to HTTP 429).
    pub fn enqueue(&self, video_id: String) -> Result<(), CoreError> {
        self.intake_tx
            .try_send(video_id)
            .map_err(|_| CoreError::IntakeFull)
    }
}

/// Runs `fut` in its own task and reports panics/errors on `error_tx`
/// instead of letting them take down the worker loop.
fn spawn_guarded<F, Fut>(
    stage: &'static str,
    video_id: String,
    error_tx: mpsc::UnboundedSender<StageError>,
    fut: F,
) -> JoinHandle<()>
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), CoreError>> + Send + 'static,
{
    tokio::spawn(async move {
        let inner = tokio::spawn(fut());
        match inner.await {
            Ok(Ok(())) => {}
            Ok(Err(cause)) => {
                let _ = error_tx.send(StageError {
                    stage,
                    video_id,
                    cause: cause.to_string(),
                });
            }
            Err(join_err) => {
                let _ = error_tx.send(StageError {
                    stage,
                    video_id,
                    cause: format!("panicked: {join_err}"),
                });
            }
        }
    })
}

fn spawn_error_consumer(
    registry: Arc<JobRegistry>,
    failures: Arc<FailureTracker>,
    mut error_rx: mpsc::UnboundedReceiver<StageError>,
) {
    tokio::spawn(async move {
        while let Some(err) = error_rx.recv().await {
            tracing::error!(stage = err.stage, video_id = %err.video_id, cause = %err.cause, "stage failed");
            if let Some(handle) = registry.get(&err.video_id) {
                let cause = err.cause.clone();
                registry.mutate(&handle, |job| job.fail(cause)).await;
            }
            if let Err(store_err) = failures.set_failed(&err.video_id, true, &err.cause).await {
                tracing::error!(?store_err, video_id = %err.video_id, "failed to persist failure flag");
            }
        }
    });
}

fn spawn_intake(
    registry: Arc<JobRegistry>,
    mut intake_rx: mpsc::Receiver<String>,
    pending_tx: mpsc::Sender<JobHandle>,
    error_tx: mpsc::UnboundedSender<StageError>,
) {
    tokio::spawn(async move {
        while let Some(video_id) = intake_rx.recv().await {
            let registry = registry.clone();
            let pending_tx = pending_tx.clone();
            let vid = video_id.clone();
            spawn_guarded("intake", video_id, error_tx.clone(), move || async move {
                let (existed_alive, handle) = registry.create_or_revive(&vid).await;
                if !existed_alive {
                    let _ = pending_tx.send(handle).await;
                }
                Ok(())
            })
            .await
            .ok();
        }
    });
}

#[allow(clippy::too_many_arguments)]
fn spawn_acquire<A: MediaAcquirer>(
    registry: Arc<JobRegistry>,
    artifacts: Arc<ArtifactStore>,
    acquirer: Arc<A>,
    mut pending_rx: mpsc::Receiver<JobHandle>,
    downloaded_tx: mpsc::Sender<JobHandle>,
    summarizable_tx: mpsc::Sender<JobHandle>,
    error_tx: mpsc::UnboundedSender<StageError>,
) {
    tokio::spawn(async move {
        while let Some(job) = pending_rx.recv().await {
            let video_id = job.lock().await.video_id.clone();
            let registry = registry.clone();
            let artifacts = artifacts.clone();
            let acquirer = acquirer.clone();
            let downloaded_tx = downloaded_tx.clone();
            let summarizable_tx = summarizable_tx.clone();
            spawn_guarded("acquire", video_id, error_tx.clone(), move || {
                run_acquire(job, registry, artifacts, acquirer, downloaded_tx, summarizable_tx)
            })
            .await
            .ok();
        }
    });
}

async fn run_acquire<A: MediaAcquirer>(
    job: JobHandle,
    registry: Arc<JobRegistry>,
    artifacts: Arc<ArtifactStore>,
    acquirer: Arc<A>,
    downloaded_tx: mpsc::Sender<JobHandle>,
    summarizable_tx: mpsc::Sender<JobHandle>,
) -> Result<(), CoreError> {
    let video_id = job.lock().await.video_id.clone();

    registry
        .mutate(&job, |j| {
            j.transition_to(Status::CheckingForCaptions)
                .expect("pending -> checking_for_captions")
        })
        .await;

    let meta = acquirer.fetch_metadata(&video_id).await?;
    registry
        .mutate(&job, |j| j.progress.video_meta = Some(meta))
        .await;

    let captions = acquirer.probe_captions(&video_id).await?;
    if let Some(segments) = captions {
        let deduped = dedupe_caption_segments(segments);
        artifacts.write_segments(&video_id, &deduped).await?;

        registry
            .mutate(&job, |j| {
                j.progress.had_captions = true;
                j.transition_to(Status::DownloadedCaptions)
                    .expect("checking_for_captions -> downloaded_captions")
            })
            .await;
        registry
            .mutate(&job, |j| {
                j.transition_to(Status::Summarizing)
                    .expect("downloaded_captions -> summarizing")
            })
            .await;

        let _ = summarizable_tx.send(job).await;
        return Ok(());
    }

    registry
        .mutate(&job, |j| {
            j.transition_to(Status::DownloadingAudio)
                .expect("checking_for_captions -> downloading_audio")
        })
        .await;

    let audio_path = artifacts.audio_path(&video_id);
    if !artifacts.audio_exists(&video_id).await {
        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<String>();
        let progress_registry = registry.clone();
        let progress_job = job.clone();
        let progress_task = tokio::spawn(async move {
            while let Some(pct) = progress_rx.recv().await {
                progress_registry
                    .mutate(&progress_job, |j| j.progress.percentage_string = pct)
                    .await;
            }
        });

        let on_progress: Box<dyn Fn(String) + Send + Sync> =
            Box::new(move |pct: String| {
                let _ = progress_tx.send(pct);
            });

        let result = acquirer
            .download_audio(&video_id, &audio_path, on_progress.as_ref())
            .await;
        drop(on_progress);
        let _ = progress_task.await;
        result?;
    }

    registry
        .mutate(&job, |j| {
            j.transition_to(Status::ExtractingAudio)
                .expect("downloading_audio -> extracting_audio")
        })
        .await;

    let _ = downloaded_tx.send(job).await;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn spawn_transcribe<T: Transcriber>(
    registry: Arc<JobRegistry>,
    artifacts: Arc<ArtifactStore>,
    transcriber: Arc<T>,
    chunk_duration_secs: u64,
    mut downloaded_rx: mpsc::Receiver<JobHandle>,
    summarizable_tx: mpsc::Sender<JobHandle>,
    error_tx: mpsc::UnboundedSender<StageError>,
) {
    tokio::spawn(async move {
        while let Some(job) = downloaded_rx.recv().await {
            let video_id = job.lock().await.video_id.clone();
            let registry = registry.clone();
            let artifacts = artifacts.clone();
            let transcriber = transcriber.clone();
            let summarizable_tx = summarizable_tx.clone();
            spawn_guarded("transcribe", video_id, error_tx.clone(), move || {
                run_transcribe(
                    job,
                    registry,
                    artifacts,
                    transcriber,
                    chunk_duration_secs,
                    summarizable_tx,
                )
            })
            .await
            .ok();
        }
    });
}

async fn run_transcribe<T: Transcriber>(
    job: JobHandle,
    registry: Arc<JobRegistry>,
    artifacts: Arc<ArtifactStore>,
    transcriber: Arc<T>,
    chunk_duration_secs: u64,
    summarizable_tx: mpsc::Sender<JobHandle>,
) -> Result<(), CoreError> {
    let video_id = job.lock().await.video_id.clone();

    registry
        .mutate(&job, |j| {
            j.transition_to(Status::Chunking)
                .expect("extracting_audio -> chunking")
        })
        .await;

    if artifacts.segments_exist(&video_id).await {
        registry
            .mutate(&job, |j| {
                j.transition_to(Status::Transcribing)
                    .expect("chunking -> transcribing")
            })
            .await;
        registry
            .mutate(&job, |j| {
                j.transition_to(Status::Summarizing)
                    .expect("transcribing -> summarizing")
            })
            .await;
        let _ = summarizable_tx.send(job).await;
        return Ok(());
    }

    let audio_path = artifacts.audio_path(&video_id);
    let chunks_dir = artifacts.ensure_chunks_dir(&video_id).await?;
    let chunk_paths = transcriber
        .segment_audio(&audio_path, chunk_duration_secs, &chunks_dir)
        .await?;

    registry
        .mutate(&job, |j| {
            j.progress.transcription_chunks = chunk_paths.len() as u32;
            j.transition_to(Status::Transcribing)
                .expect("chunking -> transcribing")
        })
        .await;

    let mut merged = Vec::new();
    let mut offset = 0.0f64;
    for (i, chunk_path) in chunk_paths.iter().enumerate() {
        let segments = transcriber.transcribe_chunk(chunk_path).await?;
        for segment in segments {
            merged.push(digest_adapters::RawSegment {
                start: segment.start + offset,
                end: segment.end + offset,
                text: segment.text,
            });
        }
        offset += chunk_duration_secs as f64;

        let done = (i + 1) as u32;
        registry
            .mutate(&job, |j| j.progress.transcription_chunks_done = done)
            .await;
    }

    let deduped = dedupe_caption_segments(merged);
    artifacts.write_segments(&video_id, &deduped).await?;

    registry
        .mutate(&job, |j| {
            j.transition_to(Status::Summarizing)
                .expect("transcribing -> summarizing")
        })
        .await;

    let _ = summarizable_tx.send(job).await;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn spawn_summarize<S: Summarizer>(
    registry: Arc<JobRegistry>,
    artifacts: Arc<ArtifactStore>,
    summarizer: Arc<S>,
    system_prompt: Arc<str>,
    char_budget: usize,
    mut summarizable_rx: mpsc::Receiver<JobHandle>,
    done_tx: mpsc::Sender<JobHandle>,
    error_tx: mpsc::UnboundedSender<StageError>,
) {
    tokio::spawn(async move {
        while let Some(job) = summarizable_rx.recv().await {
            let video_id = job.lock().await.video_id.clone();
            let registry = registry.clone();
            let artifacts = artifacts.clone();
            let summarizer = summarizer.clone();
            let system_prompt = system_prompt.clone();
            let done_tx = done_tx.clone();
            // Unbounded parallelism (§4.3): fire-and-forget, no await here.
            spawn_guarded("summarize", video_id, error_tx.clone(), move || {
                run_summarize(job, registry, artifacts, summarizer, system_prompt, char_budget, done_tx)
            });
        }
    });
}

async fn run_summarize<S: Summarizer>(
    job: JobHandle,
    registry: Arc<JobRegistry>,
    artifacts: Arc<ArtifactStore>,
    summarizer: Arc<S>,
    system_prompt: Arc<str>,
    char_budget: usize,
    done_tx: mpsc::Sender<JobHandle>,
) -> Result<(), CoreError> {
    let video_id = job.lock().await.video_id.clone();
    let segments = artifacts.read_segments(&video_id).await?;
    let chunks = chunk_segments_for_summary(&segments, char_budget);

    let total = chunks.len() as u32;
    registry
        .mutate(&job, |j| j.progress.summary_chunks = total)
        .await;

    let mut summary = String::new();
    for (i, chunk_text) in chunks.iter().enumerate() {
        summary = summarizer
            .summarize_chunk(&system_prompt, chunk_text, &summary)
            .await?;
        let done = (i + 1) as u32;
        registry
            .mutate(&job, |j| j.progress.summary_chunks_done = done)
            .await;
    }

    artifacts.write_summary(&video_id, &summary).await?;
    let _ = done_tx.send(job).await;
    Ok(())
}

fn spawn_finalize(
    registry: Arc<JobRegistry>,
    failures: Arc<FailureTracker>,
    mut done_rx: mpsc::Receiver<JobHandle>,
    error_tx: mpsc::UnboundedSender<StageError>,
) {
    tokio::spawn(async move {
        while let Some(job) = done_rx.recv().await {
            let video_id = job.lock().await.video_id.clone();
            let registry = registry.clone();
            let failures = failures.clone();
            spawn_guarded("finalize", video_id, error_tx.clone(), move || {
                run_finalize(job, registry, failures)
            })
            .await
            .ok();
        }
    });
}

async fn run_finalize(
    job: JobHandle,
    registry: Arc<JobRegistry>,
    failures: Arc<FailureTracker>,
) -> Result<(), CoreError> {
    let video_id = job.lock().await.video_id.clone();
    registry
        .mutate(&job, |j| {
            j.transition_to(Status::Finished)
                .expect("summarizing -> finished")
        })
        .await;
    if let Err(err) = failures.set_failed(&video_id, false, "").await {
        tracing::error!(?err, video_id, "failed to clear persisted failure flag");
    }
    Ok(())
}
