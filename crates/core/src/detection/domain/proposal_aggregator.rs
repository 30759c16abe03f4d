use crate::detection::domain::proposal::Proposal;
use crate::detection::domain::stride_decoder::ShapeMismatch;

/// Concatenate per-stride decode results into one unordered candidate set.
///
/// Strides whose tensors failed the shape check are skipped with a warning;
/// the remaining strides still contribute. No deduplication happens here.
pub fn aggregate<I>(per_stride: I) -> Vec<Proposal>
where
    I: IntoIterator<Item = Result<Vec<Proposal>, ShapeMismatch>>,
{
    let mut all = Vec::new();
    for result in per_stride {
        match result {
            Ok(proposals) => all.extend(proposals),
            Err(mismatch) => log::warn!("Skipping stride: {mismatch}"),
        }
    }
    all
}
