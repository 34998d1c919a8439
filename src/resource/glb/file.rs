use std::path::Path;

use crate::error::{LoadError, LoadResult};

/// Reads a `.glb` file into memory.
pub fn read_glb_file(glb_path: &Path) -> LoadResult<Vec<u8>> {
    let absolute_path = glb_path.canonicalize()?;

    if !absolute_path.is_file() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("The given path is not a file: {}", glb_path.display()),
        )
        .into());
    }

    match absolute_path.extension().and_then(|extension| extension.to_str()) {
        Some(extension) if extension.eq_ignore_ascii_case("glb") => {}
        Some(extension) if extension.eq_ignore_ascii_case("gltf") => {
            return Err(LoadError::NotSupported(format!(
                "Only binary .glb files can be loaded: {}",
                glb_path.display()
            )))
        }
        _ => log::warn!(
            "The given path does not have a .glb extension: {}",
            glb_path.display()
        ),
    }

    log::debug!("Reading GLB file: {}", absolute_path.display());

    Ok(std::fs::read(absolute_path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_files_are_io_errors() {
        let result = read_glb_file(Path::new("/nonexistent/model.glb"));
        assert!(matches!(result, Err(LoadError::Io(_))));
    }

    #[test]
    fn directories_are_rejected() {
        let result = read_glb_file(&std::env::temp_dir());
        assert!(matches!(result, Err(LoadError::Io(_))));
    }
}
