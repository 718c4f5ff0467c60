use loopscope_host::LoopscopeHostError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoopscopeError {
    #[error("Error talking to the instrumentation host")]
    Host(#[from] LoopscopeHostError),
    #[error("ERROR, can't open file: {}", path.display())]
    ReportOpen {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed writing the loop report")]
    ReportWrite(#[from] std::io::Error),
}
