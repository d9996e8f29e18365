use encore_core::MediaConfig;
use std::path::Path;

/// Reasons a staged file is turned away
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Not an image: {content_type}")]
    NotAnImage { content_type: String },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,
}

impl ValidationError {
    /// Message shown to the user for the file that failed, naming the file.
    pub fn user_message(&self, filename: &str) -> String {
        match self {
            ValidationError::FileTooLarge { max, .. } => format!(
                "{} is larger than {} MB and was not added",
                filename,
                max / (1024 * 1024)
            ),
            ValidationError::NotAnImage { .. } => {
                format!("{} is not an image file and was not added", filename)
            }
            ValidationError::InvalidFilename(_) => {
                format!("{} has an invalid file name and was not added", filename)
            }
            ValidationError::EmptyFile => format!("{} is empty and was not added", filename),
        }
    }
}

/// Image file validator
///
/// A file passes when it is non-empty, at most `max_file_size` bytes, and its MIME type
/// starts with `image/`.
#[derive(Debug, Clone)]
pub struct MediaValidator {
    max_file_size: usize,
    required_mime_prefix: String,
}

impl MediaValidator {
    pub fn new(max_file_size: usize, required_mime_prefix: impl Into<String>) -> Self {
        Self {
            max_file_size,
            required_mime_prefix: required_mime_prefix.into().to_lowercase(),
        }
    }

    pub fn from_config(config: &MediaConfig) -> Self {
        Self::new(config.max_image_size_bytes, config.required_mime_prefix.clone())
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate content type
    pub fn validate_content_type(&self, content_type: &str) -> Result<(), ValidationError> {
        if !content_type
            .trim()
            .to_lowercase()
            .starts_with(&self.required_mime_prefix)
        {
            return Err(ValidationError::NotAnImage {
                content_type: content_type.to_string(),
            });
        }

        Ok(())
    }

    pub fn validate_filename(&self, filename: &str) -> Result<(), ValidationError> {
        let name = Path::new(filename).file_name().and_then(|n| n.to_str());
        if name.map(str::trim).unwrap_or_default().is_empty() {
            return Err(ValidationError::InvalidFilename(filename.to_string()));
        }
        Ok(())
    }

    /// Validate all aspects of a file
    pub fn validate_all(
        &self,
        filename: &str,
        content_type: &str,
        file_size: usize,
    ) -> Result<(), ValidationError> {
        self.validate_filename(filename)?;
        self.validate_content_type(content_type)?;
        self.validate_file_size(file_size)?;
        Ok(())
    }
}

/// File extension to keep on the uploaded object, lowercased. Falls back to the MIME
/// subtype when the name has none.
pub fn file_extension(filename: &str, content_type: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .or_else(|| {
            content_type
                .split('/')
                .nth(1)
                .map(|sub| sub.split(['+', ';']).next().unwrap_or(sub).trim().to_lowercase())
                .filter(|sub| !sub.is_empty())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: usize = 1024 * 1024;

    fn test_validator() -> MediaValidator {
        MediaValidator::new(5 * MB, "image/")
    }

    #[test]
    fn accepts_any_image_subtype() {
        let validator = test_validator();
        assert!(validator.validate_all("a.jpg", "image/jpeg", MB).is_ok());
        assert!(validator.validate_all("b.heic", "image/heic", MB).is_ok());
        assert!(validator.validate_all("c.PNG", "IMAGE/PNG", MB).is_ok());
    }

    #[test]
    fn size_limit_is_inclusive() {
        let validator = test_validator();
        assert!(validator.validate_file_size(5 * MB).is_ok());
        assert!(matches!(
            validator.validate_file_size(5 * MB + 1),
            Err(ValidationError::FileTooLarge { .. })
        ));
        assert!(matches!(
            validator.validate_file_size(0),
            Err(ValidationError::EmptyFile)
        ));
    }

    #[test]
    fn rejects_non_images() {
        let validator = test_validator();
        assert!(matches!(
            validator.validate_all("notes.pdf", "application/pdf", MB),
            Err(ValidationError::NotAnImage { .. })
        ));
    }

    #[test]
    fn messages_name_the_file() {
        let validator = test_validator();
        let too_big = validator
            .validate_all("big.jpg", "image/jpeg", 6 * MB)
            .unwrap_err();
        let not_image = validator
            .validate_all("clip.mp4", "video/mp4", MB)
            .unwrap_err();

        assert_eq!(
            too_big.user_message("big.jpg"),
            "big.jpg is larger than 5 MB and was not added"
        );
        assert!(not_image.user_message("clip.mp4").starts_with("clip.mp4"));
        assert_ne!(too_big.user_message("x"), not_image.user_message("x"));
    }

    #[test]
    fn extension_from_name_or_mime() {
        assert_eq!(file_extension("photo.JPG", "image/jpeg").as_deref(), Some("jpg"));
        assert_eq!(file_extension("photo", "image/png").as_deref(), Some("png"));
        assert_eq!(file_extension("logo", "image/svg+xml").as_deref(), Some("svg"));
        assert_eq!(file_extension("blob", "").as_deref(), None);
    }
}
