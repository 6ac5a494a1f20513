use super::{types::Config, ConfigError};

/// Largest accepted relay chunk, in KiB.
pub const MAX_CHUNK_SIZE_KB: usize = 16 * 1024;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Public URL is an http(s) URL
/// - Timeouts are non-zero
/// - Chunk size is between 1 KiB and `MAX_CHUNK_SIZE_KB`
/// - Swarm listen port, when set, fits a one-port range
/// - Baseline tracker list and extension list are not empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    let public_url = config.server.public_url.as_str();
    if !(public_url.starts_with("http://") || public_url.starts_with("https://")) {
        return Err(ConfigError::ValidationError(format!(
            "server.public_url must be an http(s) URL, got {:?}",
            public_url
        )));
    }

    if config.source.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "source.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.swarm.join_timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "swarm.join_timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.swarm.listen_port == Some(0) || config.swarm.listen_port == Some(u16::MAX) {
        return Err(ConfigError::ValidationError(format!(
            "swarm.listen_port must be between 1 and {}",
            u16::MAX - 1
        )));
    }

    if config.stream.chunk_size_kb == 0 {
        return Err(ConfigError::ValidationError(
            "stream.chunk_size_kb cannot be 0".to_string(),
        ));
    }

    if config.stream.chunk_size_kb > MAX_CHUNK_SIZE_KB {
        return Err(ConfigError::ValidationError(format!(
            "stream.chunk_size_kb cannot exceed {}",
            MAX_CHUNK_SIZE_KB
        )));
    }

    if config.stream.extensions.is_empty() {
        return Err(ConfigError::ValidationError(
            "stream.extensions cannot be empty".to_string(),
        ));
    }

    if config.trackers.baseline.iter().all(|t| t.trim().is_empty()) {
        return Err(ConfigError::ValidationError(
            "trackers.baseline must list at least one tracker".to_string(),
        ));
    }

    Ok(())
}
