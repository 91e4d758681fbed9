use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use super::types::{Language, OcrError};

/// Common install location on Windows, probed when TESSERACT_CMD is unset.
const WINDOWS_INSTALL_PATH: &str = r"C:\Program Files\Tesseract-OCR\tesseract.exe";

/// Where the Tesseract binary lives. Resolved once at startup and passed by
/// reference into the pipeline; never mutated afterwards.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    command: PathBuf,
}

impl EngineConfig {
    /// Resolution order: `TESSERACT_CMD` env var, the common Windows install
    /// path if it exists, else `tesseract` on the search path.
    pub fn from_env() -> Self {
        if let Ok(cmd) = std::env::var("TESSERACT_CMD") {
            if !cmd.trim().is_empty() {
                return Self { command: PathBuf::from(cmd) };
            }
        }
        if Path::new(WINDOWS_INSTALL_PATH).exists() {
            return Self {
                command: PathBuf::from(WINDOWS_INSTALL_PATH),
            };
        }
        Self {
            command: PathBuf::from("tesseract"),
        }
    }

    pub fn with_command(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
        }
    }

    pub fn command(&self) -> &Path {
        &self.command
    }

    /// Run the engine on an image file. Exactly one invocation, no retries.
    pub fn recognize(&self, image_path: &Path, lang: Language) -> Result<String, OcrError> {
        log::info!(
            "running {} on {} (lang={})",
            self.command.display(),
            image_path.display(),
            lang
        );

        let output = Command::new(&self.command)
            .arg(image_path)
            .arg("stdout")
            .args(["-l", lang.code()])
            .output();

        match output {
            Ok(output) if output.status.success() => {
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            Ok(output) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(OcrError::EngineFailure(stderr.trim().to_string()))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(OcrError::EngineNotFound {
                command: self.command.display().to_string(),
            }),
            Err(e) => Err(OcrError::Unknown(e.to_string())),
        }
    }

    /// Probe whether the engine binary answers at all. Used for diagnostics
    /// when recognition comes back empty.
    pub fn is_reachable(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .output()
            .map(|out| out.status.success())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_binary_is_engine_not_found() {
        let engine = EngineConfig::with_command("/nonexistent/tesseract-binary");
        let err = engine
            .recognize(Path::new("whatever.png"), Language::Eng)
            .unwrap_err();
        assert!(matches!(err, OcrError::EngineNotFound { .. }));
        assert!(err.to_string().contains("TESSERACT_CMD"));
    }

    #[test]
    fn missing_binary_is_not_reachable() {
        let engine = EngineConfig::with_command("/nonexistent/tesseract-binary");
        assert!(!engine.is_reachable());
    }

    #[cfg(unix)]
    mod stubbed {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        fn stub_engine(dir: &Path, script: &str) -> EngineConfig {
            let path = dir.join("tesseract-stub");
            std::fs::write(&path, script).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            EngineConfig::with_command(path)
        }

        #[test]
        fn captures_stdout_on_success() {
            let dir = tempfile::tempdir().unwrap();
            let engine = stub_engine(dir.path(), "#!/bin/sh\necho 'recognized text'\n");
            let text = engine
                .recognize(Path::new("shot.png"), Language::Eng)
                .unwrap();
            assert_eq!(text.trim(), "recognized text");
            assert!(engine.is_reachable());
        }

        #[test]
        fn nonzero_exit_carries_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let engine = stub_engine(
                dir.path(),
                "#!/bin/sh\necho 'Error opening data file khm.traineddata' >&2\nexit 1\n",
            );
            let err = engine
                .recognize(Path::new("shot.png"), Language::Khm)
                .unwrap_err();
            match err {
                OcrError::EngineFailure(msg) => assert!(msg.contains("khm.traineddata")),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }
}
