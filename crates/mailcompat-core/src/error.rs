/// Errors surfaced by the scoring core.
///
/// Per-token and per-feature problems (unknown tokens, odd dataset shapes,
/// broken markup) are absorbed into the report and never show up here.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The compatibility dataset could not be parsed.
    #[error("Invalid compatibility dataset: {message}")]
    Dataset { message: String },

    /// A validation request was run without any HTML.
    #[error("Missing HTML input")]
    MissingHtml,

    /// Options handed to the JSON API could not be decoded.
    #[error("Invalid options: {message}")]
    InvalidOptions { message: String },
}

pub type Result<T> = std::result::Result<T, Error>;
