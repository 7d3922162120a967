use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Upload limit is not 0
/// - Separator program and stem are set
/// - Vocals and backing artifacts have distinct names
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.server.max_upload_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "server.max_upload_bytes cannot be 0".to_string(),
        ));
    }

    let separator = &config.separator;
    if separator.program.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "separator.program cannot be empty".to_string(),
        ));
    }

    if separator.two_stems.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "separator.two_stems cannot be empty".to_string(),
        ));
    }

    if separator.vocals_file == separator.backing_file {
        return Err(ConfigError::ValidationError(format!(
            "separator.vocals_file and separator.backing_file must differ (both are {:?})",
            separator.vocals_file
        )));
    }

    Ok(())
}
