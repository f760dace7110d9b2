use std::path::{Path, PathBuf};

use thiserror::Error;

use super::constants::APP_DIR_NAME;

#[derive(Error, Debug)]
pub enum ModelResolveError {
    #[error("model {name} not found (searched: {searched:?})")]
    NotFound { name: String, searched: Vec<PathBuf> },
    #[error("could not determine cache directory")]
    NoCacheDir,
}

/// Resolve a model file by name from local disk only.
///
/// Resolution order:
/// 1. Explicit model directory (from configuration)
/// 2. User cache directory (platform-specific)
/// 3. Bundled path (for development / pre-packaged installs)
///
/// Nothing is ever downloaded; a missing model simply disqualifies the
/// backend that needs it.
pub fn resolve(
    name: &str,
    model_dir: Option<&Path>,
    bundled_dir: Option<&Path>,
) -> Result<PathBuf, ModelResolveError> {
    let mut searched = Vec::new();

    let candidates = [
        model_dir.map(Path::to_path_buf),
        model_cache_dir().ok(),
        bundled_dir.map(Path::to_path_buf),
    ];

    for dir in candidates.into_iter().flatten() {
        let path = dir.join(name);
        if path.is_file() {
            return Ok(path);
        }
        searched.push(path);
    }

    Err(ModelResolveError::NotFound {
        name: name.to_string(),
        searched,
    })
}

/// Platform-specific model cache directory.
///
/// - macOS: `~/Library/Application Support/Eyeline/models/`
/// - Linux: `$XDG_CACHE_HOME/Eyeline/models/` or `~/.cache/Eyeline/models/`
/// - Windows: `%LOCALAPPDATA%/Eyeline/models/`
pub fn model_cache_dir() -> Result<PathBuf, ModelResolveError> {
    #[cfg(target_os = "macos")]
    {
        dirs::data_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
    #[cfg(not(target_os = "macos"))]
    {
        dirs::cache_dir()
            .map(|d| d.join(APP_DIR_NAME).join("models"))
            .ok_or(ModelResolveError::NoCacheDir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_resolves_from_explicit_dir() {
        let dir = tempfile::tempdir().unwrap();
        let model = dir.path().join("face.onnx");
        fs::write(&model, b"onnx").unwrap();

        let resolved = resolve("face.onnx", Some(dir.path()), None).unwrap();
        assert_eq!(resolved, model);
    }

    #[test]
    fn test_explicit_dir_wins_over_bundled() {
        let explicit = tempfile::tempdir().unwrap();
        let bundled = tempfile::tempdir().unwrap();
        fs::write(explicit.path().join("m.onnx"), b"a").unwrap();
        fs::write(bundled.path().join("m.onnx"), b"b").unwrap();

        let resolved = resolve("m.onnx", Some(explicit.path()), Some(bundled.path())).unwrap();
        assert_eq!(resolved, explicit.path().join("m.onnx"));
    }

    #[test]
    fn test_falls_back_to_bundled_dir() {
        let explicit = tempfile::tempdir().unwrap();
        let bundled = tempfile::tempdir().unwrap();
        let name = "eyeline-test-bundled-only-7f3a.onnx";
        fs::write(bundled.path().join(name), b"b").unwrap();

        let resolved = resolve(name, Some(explicit.path()), Some(bundled.path())).unwrap();
        assert_eq!(resolved, bundled.path().join(name));
    }

    #[test]
    fn test_missing_model_reports_searched_paths() {
        let dir = tempfile::tempdir().unwrap();
        let name = "eyeline-test-missing-91c2.onnx";

        let err = resolve(name, Some(dir.path()), None).unwrap_err();
        match err {
            ModelResolveError::NotFound { name: n, searched } => {
                assert_eq!(n, name);
                assert!(searched.contains(&dir.path().join(name)));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_directory_with_model_name_is_not_a_model() {
        let dir = tempfile::tempdir().unwrap();
        let name = "eyeline-test-dir-as-model-55d0.onnx";
        fs::create_dir(dir.path().join(name)).unwrap();

        assert!(resolve(name, Some(dir.path()), None).is_err());
    }

    #[test]
    fn test_cache_dir_ends_with_models() {
        if let Ok(dir) = model_cache_dir() {
            assert!(dir.ends_with("models"));
        }
    }
}
