use thiserror::Error;

#[derive(Debug, Error)]
pub enum EncoderError {
    /// The encoder could not be launched or exited straight after launch
    #[error("Encoder for {device} failed to start: {diagnostics}")]
    SpawnFailure { device: String, diagnostics: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
