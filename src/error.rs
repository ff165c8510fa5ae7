use thiserror::Error;

/// Caller-distinguishable failures of the ingestion pipeline.
///
/// Per-source trouble is handled inside the pipeline (logged, source
/// skipped); only the kinds a caller needs to react to differently are
/// surfaced here.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Every URL x proxy combination for one source failed.
    #[error("source {year}: all url/proxy combinations failed")]
    SourceUnreachable { year: i32 },

    /// Every configured source was unreachable. Distinct from "no data" so
    /// the caller can tell a dead network apart from empty sheets.
    #[error("all configured sources failed")]
    AllSourcesFailed,

    /// Cache write failed. Non-fatal: the in-memory table is still valid.
    #[error("store write failed")]
    StoreWriteFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Cache read failed; callers fall back to a full re-fetch.
    #[error("store read failed")]
    StoreReadFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A row narrower than the schema after padding. Internal-consistency
    /// assertion; must not happen if the normalizer invariants hold.
    #[error("row width {got} does not match schema width {want}")]
    MalformedRow { got: usize, want: usize },
}
