use std::path::Path;

use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;

/// Open an ONNX model with full graph optimization and the preferred
/// execution provider for this platform.
///
/// `intra_threads` defaults to the machine's available parallelism.
pub fn open_session(
    model_path: &Path,
    intra_threads: Option<usize>,
) -> Result<Session, Box<dyn std::error::Error>> {
    let intra_threads = intra_threads.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    });
    log::debug!(
        "Loading {} with {intra_threads} intra-op threads",
        model_path.display()
    );
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_inter_threads(1)?
        .with_intra_threads(intra_threads)?
        .with_execution_providers(execution_providers())?
        .commit_from_file(model_path)?;
    Ok(session)
}

/// CoreML on macOS, DirectML on Windows, plain CPU elsewhere.
fn execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}
