//! Tests for error types.

#[cfg(test)]
mod tests {
    use super::super::*;
    use std::path::Path;

    #[test]
    fn test_error_display() {
        let err = Error::config("no watch directories");
        assert_eq!(
            err.to_string(),
            "configuration error: no watch directories"
        );
    }

    #[test]
    fn test_directory_not_found() {
        let err = WatcherError::not_found(Path::new("/data/p1"));
        assert_eq!(err.to_string(), "watch directory not found: /data/p1");
    }

    #[test]
    fn test_invalid_index_is_client_error() {
        let err: Error = WatcherError::InvalidDirectoryIndex { index: 3, count: 2 }.into();
        assert!(err.is_client_error());
        assert_eq!(
            err.to_string(),
            "watcher error: invalid directory index 3 (have 2)"
        );
    }

    #[test]
    fn test_other_errors_are_not_client_errors() {
        let err: Error = WatcherError::not_found(Path::new("/x")).into();
        assert!(!err.is_client_error());
        assert!(!Error::internal("boom").is_client_error());
    }

    #[test]
    fn test_watcher_error_conversion() {
        let watch_err = WatcherError::WatchFailed {
            path: "/tmp/test".to_string(),
            reason: "permission denied".to_string(),
        };
        let err: Error = watch_err.into();
        assert!(matches!(err, Error::Watcher(_)));
    }

    #[test]
    fn test_transform_error_conversion() {
        let err: Error = TransformError::MissingDate {
            path: "/a.jpg".to_string(),
        }
        .into();
        assert!(matches!(err, Error::Transform(_)));
        assert_eq!(
            err.to_string(),
            "transform error: no capture date in EXIF metadata of '/a.jpg'"
        );
    }

    #[test]
    fn test_transform_invalid_width() {
        let err = TransformError::InvalidWidth(-1);
        assert_eq!(err.to_string(), "invalid resize width: -1");
    }

    #[test]
    fn test_artifact_delete_failed() {
        let err = WatcherError::ArtifactDeleteFailed {
            path: "/out/a.jpg".to_string(),
            reason: "permission denied".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to delete artifact '/out/a.jpg': permission denied"
        );
    }

    #[test]
    fn test_server_error_conversion() {
        let server_err = ServerError::BindFailed {
            address: "127.0.0.1:8000".to_string(),
            reason: "address in use".to_string(),
        };
        let err: Error = server_err.into();
        assert!(matches!(err, Error::Server(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_propagation_with_question_mark() {
        fn inner() -> Result<i32> {
            Err(Error::config("inner error"))
        }

        fn outer() -> Result<i32> {
            let _ = inner()?;
            Ok(0)
        }

        assert_eq!(
            outer().unwrap_err().to_string(),
            "configuration error: inner error"
        );
    }
}
