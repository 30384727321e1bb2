/// Result of validating an uploaded file name.
#[derive(Debug, PartialEq, Eq)]
pub enum FilenameError {
    /// Filename is empty or whitespace-only.
    Empty,
    /// Filename contains path separators (`/` or `\`).
    ContainsPathSeparator,
    /// Filename is `..`.
    PathTraversal,
    /// Filename contains control characters (NUL, CR, LF, etc.).
    ControlCharacter,
    /// Filename starts with a dot (hidden file).
    Hidden,
    /// Filename does not carry the `.apk` extension.
    NotApk,
}

impl FilenameError {
    /// Returns a human-readable error message.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Empty => "Filename cannot be empty",
            Self::ContainsPathSeparator => "Invalid filename: path separators are not allowed",
            Self::PathTraversal => "Invalid filename: '..' is not allowed",
            Self::ControlCharacter => "Invalid filename: control characters are not allowed",
            Self::Hidden => "Invalid filename: hidden files (starting with '.') are not allowed",
            Self::NotApk => "Only APK files are allowed",
        }
    }
}

/// Validates a flat filename (no directory components allowed).
pub fn validate_flat_filename(filename: &str) -> Result<&str, FilenameError> {
    let trimmed = filename.trim();

    if trimmed.is_empty() {
        return Err(FilenameError::Empty);
    }

    // Also rejects NUL and CRLF, which would otherwise reach Content-Disposition.
    if trimmed.chars().any(|c| c.is_ascii_control()) {
        return Err(FilenameError::ControlCharacter);
    }

    if trimmed.contains('/') || trimmed.contains('\\') {
        return Err(FilenameError::ContainsPathSeparator);
    }

    if trimmed == ".." {
        return Err(FilenameError::PathTraversal);
    }

    if trimmed.starts_with('.') {
        return Err(FilenameError::Hidden);
    }

    Ok(trimmed)
}

/// Validates a flat filename that must end in `.apk` (case-insensitive).
pub fn validate_apk_filename(filename: &str) -> Result<&str, FilenameError> {
    let name = validate_flat_filename(filename)?;
    if !name.to_ascii_lowercase().ends_with(".apk") {
        return Err(FilenameError::NotApk);
    }
    Ok(name)
}

/// Reduce a version name to characters that are safe inside a file name.
pub fn sanitize_version_name(version_name: &str) -> String {
    let cleaned: String = version_name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match cleaned.trim_matches('.') {
        "" => "unnamed".to_string(),
        s => s.to_string(),
    }
}

/// Stored name of a published APK: `cmo_app_v{version}_{millis}.apk`.
pub fn apk_storage_name(version_name: &str, epoch_millis: i64) -> String {
    format!(
        "cmo_app_v{}_{}.apk",
        sanitize_version_name(version_name),
        epoch_millis
    )
}
