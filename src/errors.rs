use thiserror::Error;

#[derive(Error, Debug)]
pub enum AsmError {
    #[error("cannot read pattern file {path}: {reason}")]
    PatternFile { path: String, reason: String },

    #[error("cannot write {path}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
