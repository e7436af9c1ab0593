//! Source loading and path validation.

use std::fs;
use std::path::PathBuf;

use log::debug;

use crate::error::OrbitError;
use crate::phase::Phase;

/// File extension required of Orbit source files.
pub const SOURCE_EXTENSION: &str = "orb";

/// Reads a source path into a text buffer.
///
/// The file handle lives only for the duration of `execute`; it is
/// closed before the phase returns, whether the read succeeds or
/// fails.
#[derive(Debug, Default)]
pub struct SourceLoader;

impl SourceLoader {
    pub fn new() -> Self {
        SourceLoader
    }
}

impl Phase for SourceLoader {
    type Input = PathBuf;
    type Output = String;

    fn execute(&self, input: PathBuf) -> Result<String, OrbitError> {
        debug!("loading source from {}", input.display());
        let bytes = fs::read(&input).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => OrbitError::SourceNotFound(input.clone()),
            _ => OrbitError::SourceIo(input.clone(), err),
        })?;
        String::from_utf8(bytes).map_err(|_| OrbitError::SourceEncoding(input))
    }
}

/// Checks that a path carries the Orbit source extension.
///
/// Runs before the pipeline is invoked, so a misnamed file is
/// rejected without touching the filesystem.
#[derive(Debug, Default)]
pub struct SourceValidator;

impl SourceValidator {
    pub fn new() -> Self {
        SourceValidator
    }
}

impl Phase for SourceValidator {
    type Input = PathBuf;
    type Output = PathBuf;

    fn execute(&self, input: PathBuf) -> Result<PathBuf, OrbitError> {
        let extension = input.extension().and_then(|ext| ext.to_str());
        if extension != Some(SOURCE_EXTENSION) {
            return Err(OrbitError::Validation(format!(
                "expected a .{SOURCE_EXTENSION} source file, got {}",
                input.display()
            )));
        }
        Ok(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_source_text() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("main.orb");
        fs::write(&path, "api Foo {}").expect("write source");

        let text = SourceLoader::new().execute(path).expect("load");
        assert_eq!(text, "api Foo {}");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = SourceLoader::new()
            .execute(PathBuf::from("./no/such/file.orb"))
            .unwrap_err();
        assert!(matches!(err, OrbitError::SourceNotFound(_)));
        assert!(err.is_io());
    }

    #[test]
    fn invalid_utf8_is_an_encoding_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.orb");
        let mut file = fs::File::create(&path).expect("create");
        file.write_all(&[0xff, 0xfe, 0x80]).expect("write bytes");
        drop(file);

        let err = SourceLoader::new().execute(path).unwrap_err();
        assert!(matches!(err, OrbitError::SourceEncoding(_)));
    }

    #[test]
    fn rejects_wrong_extension() {
        let err = SourceValidator::new()
            .execute(PathBuf::from("x.txt"))
            .unwrap_err();
        assert!(matches!(err, OrbitError::Validation(_)));
    }

    #[test]
    fn rejects_missing_extension() {
        let err = SourceValidator::new()
            .execute(PathBuf::from("orbfile"))
            .unwrap_err();
        assert!(matches!(err, OrbitError::Validation(_)));
    }

    #[test]
    fn accepts_orb_extension_without_touching_disk() {
        let path = PathBuf::from("does-not-exist.orb");
        let out = SourceValidator::new().execute(path.clone()).expect("validate");
        assert_eq!(out, path);
    }
}
