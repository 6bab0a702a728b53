/// Rejected engine configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid sample rate: {0}Hz")]
    InvalidSampleRate(f32),
    #[error("Voice pool needs at least one voice")]
    NoVoices,
    #[error("Command channel needs a non-zero capacity")]
    NoCommandCapacity,
}

/// Control-side failures talking to a running engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    #[error("Command queue full, dropped {0}")]
    QueueFull(&'static str),
}
