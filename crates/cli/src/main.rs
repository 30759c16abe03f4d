use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use rollcall_core::alignment::domain::landmark_aligner::LandmarkAligner;
use rollcall_core::alignment::infrastructure::lmeds_similarity_estimator::LmedsSimilarityEstimator;
use rollcall_core::detection::infrastructure::onnx_scrfd_detector::OnnxScrfdDetector;
use rollcall_core::pipeline::enroll_identity_use_case::EnrollIdentityUseCase;
use rollcall_core::pipeline::frame_analyzer::FrameAnalyzer;
use rollcall_core::pipeline::infrastructure::threaded_frame_pipeline::ThreadedFramePipeline;
use rollcall_core::pipeline::manage_identities_use_case::ManageIdentitiesUseCase;
use rollcall_core::pipeline::pipeline_logger::{LogPipelineLogger, PipelineLogger};
use rollcall_core::pipeline::recognition_state::RecognitionState;
use rollcall_core::pipeline::recognize_frame_use_case::{FrameResult, RecognizeFrameUseCase};
use rollcall_core::recognition::domain::gallery_matcher::GalleryMatcher;
use rollcall_core::recognition::domain::gallery_store::GalleryStore;
use rollcall_core::recognition::infrastructure::json_gallery_store::JsonGalleryStore;
use rollcall_core::recognition::infrastructure::onnx_arcface_embedder::OnnxArcfaceEmbedder;
use rollcall_core::shared::config::EngineConfig;
use rollcall_core::shared::constants::{
    DETECTION_MODEL_NAME, DETECTION_MODEL_URL, EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL,
};
use rollcall_core::shared::model_resolver::{self, ModelSpec};
use rollcall_core::video::domain::frame_reader::FrameReader;
use rollcall_core::video::infrastructure::image_sequence_reader::ImageSequenceReader;

/// Face enrollment and per-frame identity recognition.
#[derive(Parser)]
#[command(name = "rollcall")]
struct Cli {
    /// Engine config JSON (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Gallery JSON file (defaults to the platform data directory).
    #[arg(long, global = true)]
    gallery: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add reference images for an identity.
    Enroll {
        identity: String,
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
    /// Delete an identity from the gallery.
    Remove { identity: String },
    /// List enrolled identities with their embedding counts.
    List,
    /// Recognize faces in image frames (files or directories), printing one
    /// JSON line per frame.
    Recognize {
        #[arg(required = true)]
        frames: Vec<PathBuf>,

        /// Only report faces whose stable label is a known identity.
        #[arg(long)]
        known_only: bool,

        /// Minimum cosine similarity for a match (-1.0 to 1.0).
        #[arg(long)]
        similarity_threshold: Option<f32>,

        /// Process frames on the calling thread only.
        #[arg(long)]
        sequential: bool,
    },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = EngineConfig::load(cli.config.as_deref())?;
    let store = open_store(cli.gallery)?;
    let state = Arc::new(RecognitionState::new(store.load()?, config.tracker.clone()));

    match cli.command {
        Command::Enroll { identity, images } => {
            validate_inputs(&images)?;
            let analyzer = build_analyzer(&config)?;
            let mut use_case = EnrollIdentityUseCase::new(
                analyzer,
                state,
                Box::new(store),
                config.detector.enroll_score_threshold,
                config.detector.score_threshold,
            );
            let added = use_case.execute(&identity, &images)?;
            if added == 0 {
                return Err(format!("No embeddings enrolled for {identity}").into());
            }
            println!("Enrolled {added} embedding(s) for {identity}");
        }
        Command::Remove { identity } => {
            let use_case = ManageIdentitiesUseCase::new(state, Box::new(store));
            if !use_case.remove(&identity)? {
                return Err(format!("Identity not enrolled: {identity}").into());
            }
            println!("Removed {identity}");
        }
        Command::List => {
            let use_case = ManageIdentitiesUseCase::new(state, Box::new(store));
            for (identity, count) in use_case.list()? {
                println!("{identity}\t{count}");
            }
        }
        Command::Recognize {
            frames,
            known_only,
            similarity_threshold,
            sequential,
        } => {
            validate_inputs(&frames)?;
            if let Some(t) = similarity_threshold {
                if !(-1.0..=1.0).contains(&t) {
                    return Err(
                        format!("Similarity threshold must be between -1.0 and 1.0, got {t}").into(),
                    );
                }
                config.recognition.similarity_threshold = t;
            }
            run_recognize(&config, state, &frames, known_only, sequential)?;
        }
    }

    Ok(())
}

fn run_recognize(
    config: &EngineConfig,
    state: Arc<RecognitionState>,
    inputs: &[PathBuf],
    known_only: bool,
    sequential: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let reader = ImageSequenceReader::from_inputs(inputs)?;
    if reader.is_empty() {
        return Err("No image frames found in the given inputs".into());
    }
    let total = reader.len();
    if state.gallery_snapshot()?.is_empty() {
        log::warn!("Gallery is empty; every face will be reported as Unknown");
    }

    let analyzer = build_analyzer(config)?;
    let matcher = GalleryMatcher::new(
        config.recognition.similarity_threshold,
        config.recognition.top_k,
    );
    let mut logger = LogPipelineLogger::default();
    logger.info(&format!("Recognizing {total} frame(s)"));
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut emit = |result: FrameResult| -> Result<(), Box<dyn std::error::Error>> {
        serde_json::to_writer(&mut out, &result)?;
        writeln!(out)?;
        Ok(())
    };

    if sequential {
        let mut reader: Box<dyn FrameReader> = Box::new(reader);
        let mut use_case = RecognizeFrameUseCase::new(analyzer, matcher, state, known_only);
        for (i, frame) in reader.frames().enumerate() {
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    log::error!("frame {i}: {e}");
                    continue;
                }
            };
            match use_case.execute(&frame) {
                Ok(result) => emit(result)?,
                Err(e) => log::error!("frame {i}: {e}"),
            }
            logger.progress(i + 1, total);
        }
    } else {
        let summary = ThreadedFramePipeline::new(analyzer, matcher, state, known_only).run(
            Box::new(reader),
            total,
            &mut logger,
            &mut emit,
        )?;
        if summary.failed_frames > 0 {
            log::warn!(
                "{} of {} frames could not be processed",
                summary.failed_frames,
                summary.frames
            );
        }
    }

    logger.summary();
    Ok(())
}

fn open_store(path: Option<PathBuf>) -> Result<JsonGalleryStore, Box<dyn std::error::Error>> {
    let path = path
        .or_else(JsonGalleryStore::default_path)
        .ok_or("Could not determine gallery location; pass --gallery")?;
    log::debug!("Gallery at {}", path.display());
    Ok(JsonGalleryStore::new(path))
}

fn build_analyzer(config: &EngineConfig) -> Result<FrameAnalyzer, Box<dyn std::error::Error>> {
    let detector_path = resolve_model(DETECTION_MODEL_NAME, DETECTION_MODEL_URL)?;
    let embedder_path = resolve_model(EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL)?;

    let detector = OnnxScrfdDetector::new(&detector_path, config.detector.clone())?;
    let embedder = OnnxArcfaceEmbedder::new(&embedder_path)?;
    Ok(FrameAnalyzer::new(
        Box::new(detector),
        LandmarkAligner::new(Box::new(LmedsSimilarityEstimator::new())),
        Arc::new(embedder),
        config.recognition.min_face_size,
    ))
}

fn resolve_model(name: &str, url: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {name}");
    let path = model_resolver::resolve(
        &ModelSpec::new(name, url),
        bundled_model_dir().as_deref(),
        Some(Box::new(download_progress)),
    )?;
    Ok(path)
}

/// `models/` next to the executable, if present.
fn bundled_model_dir() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let dir = exe.parent()?.join("models");
    dir.is_dir().then_some(dir)
}

fn validate_inputs(paths: &[PathBuf]) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(missing) = paths.iter().find(|p| !Path::new(p).exists()) {
        return Err(format!("Input not found: {}", missing.display()).into());
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading model... {pct}%");
        if downloaded >= total {
            eprintln!();
        }
    } else {
        eprint!("\rDownloading model... {downloaded} bytes");
    }
}
