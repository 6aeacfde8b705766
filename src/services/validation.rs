use crate::models::errors::ValidationError;

/// Returns true when the declared content type names an image.
pub fn is_image_mime(content_type: &str) -> bool {
    content_type
        .parse::<mime::Mime>()
        // Media types are case-insensitive, so `IMAGE/PNG` is an image too
        .map(|m| m.type_().as_str().eq_ignore_ascii_case("image"))
        .unwrap_or(false)
}

/// Returns true while `size` stays within `limit` bytes.
pub fn within_size_limit(size: usize, limit: usize) -> bool {
    size <= limit
}

/// Checks everything that is known about a file part before its bytes arrive.
pub fn validate_declared(content_type: Option<&str>) -> Result<(), ValidationError> {
    match content_type {
        Some(ct) if is_image_mime(ct) => Ok(()),
        _ => Err(ValidationError::NotAnImage),
    }
}

/// Tracks the running size of a file while it is streamed in.
#[derive(Debug, Clone, Copy)]
pub struct SizeGuard {
    limit: usize,
    received: usize,
}

impl SizeGuard {
    pub fn new(limit: usize) -> Self {
        Self { limit, received: 0 }
    }

    /// Accounts for another chunk; fails as soon as the limit is crossed.
    pub fn accept(&mut self, chunk_len: usize) -> Result<(), ValidationError> {
        self.received = self.received.saturating_add(chunk_len);
        if within_size_limit(self.received, self.limit) {
            Ok(())
        } else {
            Err(self.exceeded())
        }
    }

    pub fn exceeded(&self) -> ValidationError {
        ValidationError::TooLarge {
            limit_mb: self.limit.div_ceil(1024 * 1024),
        }
    }

    pub fn received(&self) -> usize {
        self.received
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mime_types() {
        assert!(is_image_mime("image/png"));
        assert!(is_image_mime("image/jpeg"));
        assert!(is_image_mime("image/svg+xml"));
        assert!(is_image_mime("IMAGE/PNG"));
        assert!(is_image_mime("Image/Jpeg"));

        assert!(!is_image_mime("text/plain"));
        assert!(!is_image_mime("application/octet-stream"));
        assert!(!is_image_mime("imagepng"));
        assert!(!is_image_mime(""));
    }

    #[test]
    fn test_validate_declared() {
        assert!(validate_declared(Some("image/webp")).is_ok());
        assert_eq!(validate_declared(Some("text/plain")), Err(ValidationError::NotAnImage));
        assert_eq!(validate_declared(None), Err(ValidationError::NotAnImage));
    }

    #[test]
    fn test_size_guard_allows_exact_limit() {
        let mut guard = SizeGuard::new(10);
        assert!(guard.accept(4).is_ok());
        assert!(guard.accept(6).is_ok());
        assert_eq!(guard.received(), 10);
        assert_eq!(guard.accept(1), Err(ValidationError::TooLarge { limit_mb: 1 }));
    }

    #[test]
    fn test_size_guard_reports_limit_in_megabytes() {
        let mut guard = SizeGuard::new(10 * 1024 * 1024);
        assert!(guard.accept(10 * 1024 * 1024).is_ok());
        assert_eq!(guard.accept(1), Err(ValidationError::TooLarge { limit_mb: 10 }));
    }
}
