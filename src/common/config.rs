use super::{ConfigSnafu, Result};

/// Resolves a secret setting. A value starting with '@' names a file whose
/// trimmed contents are the secret, anything else is the secret itself.
///
/// `prefix` names the setting in error messages.
pub fn key_file_or_string(value: String, prefix: &str) -> Result<String> {
    let secret: String = match value.strip_prefix('@') {
        Some(key_file) => std::fs::read_to_string(key_file)
            .map_err(|err| {
                ConfigSnafu {
                    message: format!("Failed to read key from {key_file}: {err}"),
                    prefix,
                }
                .build()
            })?
            .trim()
            .into(),
        None => value,
    };

    if secret.is_empty() {
        return ConfigSnafu {
            message: "token must not be empty",
            prefix,
        }
        .fail();
    }
    Ok(secret)
}
