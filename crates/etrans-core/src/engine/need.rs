use crate::core::models::record::CacheRecord;

/// Why new samples are (or are not) required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeedReason {
    /// Nothing is cached for the key.
    Missing,
    /// The caller asked to replace the cached record.
    Overwrite,
    /// The cache holds fewer samples than requested.
    Insufficient { cached: usize },
    /// The cache already satisfies the request.
    Satisfied { cached: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NeedAssessment {
    pub must_run: bool,
    pub additional_needed: usize,
    pub reason: NeedReason,
}

/// Decides how many new samples are required to satisfy `requested_total`.
///
/// Overwriting is a full replacement, never an increment: the whole request is
/// sampled again regardless of what is cached.
pub fn assess(
    existing: Option<&CacheRecord>,
    requested_total: usize,
    overwrite: bool,
) -> NeedAssessment {
    let (must_run, additional_needed, reason) = match existing {
        None => (true, requested_total, NeedReason::Missing),
        Some(_) if overwrite => (true, requested_total, NeedReason::Overwrite),
        Some(record) if record.sample_count < requested_total => (
            true,
            requested_total - record.sample_count,
            NeedReason::Insufficient {
                cached: record.sample_count,
            },
        ),
        Some(record) => (
            false,
            0,
            NeedReason::Satisfied {
                cached: record.sample_count,
            },
        ),
    };
    NeedAssessment {
        must_run,
        additional_needed,
        reason,
    }
}
