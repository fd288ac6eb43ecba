//! Local output directory for generated images and run summaries
//!
//! Images are stored as `generated_image_<index>.<ext>`, the extension coming
//! from the file's actual format rather than from what the service claims.

use crate::ai::GeneratedImage;
use crate::models::BlogOutcome;
use crate::Result;
use image::ImageReader;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Used when the downloaded bytes are not a format `image` recognizes.
pub const FALLBACK_EXTENSION: &str = "webp";
pub const SUMMARY_FILE: &str = "blog.json";

const KNOWN_EXTENSIONS: &[&str] = &["webp", "png", "jpg", "jpeg", "gif", "bmp", "avif"];

pub struct ImageStore {
    output_dir: PathBuf,
}

impl ImageStore {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Create the output directory if missing. Safe to call repeatedly.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir)?;
        tracing::debug!("Output directory ready: {}", self.output_dir.display());
        Ok(())
    }

    pub fn image_path(&self, index: u32, extension: &str) -> PathBuf {
        self.output_dir
            .join(format!("generated_image_{}.{}", index, extension))
    }

    /// Move a generated image into its slot, replacing whatever the slot held
    /// before, including files of another format left by an earlier run.
    pub fn store(&self, index: u32, image: GeneratedImage) -> Result<PathBuf> {
        let extension = detect_extension(image.file.path())?;
        let destination = self.image_path(index, extension);

        move_file(image.file, &destination)?;

        // Only clear out older formats once the new image is in place.
        for stale in KNOWN_EXTENSIONS.iter().filter(|ext| **ext != extension) {
            let path = self.image_path(index, stale);
            if path.exists() {
                tracing::debug!("Removing stale image {}", path.display());
                fs::remove_file(&path)?;
            }
        }

        Ok(destination)
    }

    pub fn write_summary(&self, outcome: &BlogOutcome) -> Result<PathBuf> {
        let path = self.output_dir.join(SUMMARY_FILE);
        let json = serde_json::to_string_pretty(outcome)?;
        fs::write(&path, json)?;
        Ok(path)
    }
}

fn detect_extension(path: &Path) -> Result<&'static str> {
    let format = ImageReader::open(path)?.with_guessed_format()?.format();

    match format.and_then(|f| f.extensions_str().first().copied()) {
        Some(ext) => Ok(ext),
        None => {
            tracing::warn!(
                "Unrecognized image format in {}, falling back to .{}",
                path.display(),
                FALLBACK_EXTENSION
            );
            Ok(FALLBACK_EXTENSION)
        }
    }
}

/// Rename the temp file onto `destination`, overwriting it. Renames fail across
/// filesystems, so fall back to copying; the temp file is removed either way.
fn move_file(file: NamedTempFile, destination: &Path) -> Result<()> {
    match file.persist(destination) {
        Ok(_) => Ok(()),
        Err(e) => {
            tracing::debug!(
                "Rename into {} failed ({}), copying instead",
                destination.display(),
                e.error
            );
            fs::copy(e.file.path(), destination)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::mock::MOCK_WEBP_BYTES;
    use image::ImageFormat;
    use std::io::Write;
    use tempfile::tempdir;

    fn temp_image(bytes: &[u8]) -> GeneratedImage {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        GeneratedImage { file, seed: None }
    }

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 128, 255, 255]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = ImageStore::new(&dir.path().join("nested").join("out"));

        store.ensure_dir().unwrap();
        store.ensure_dir().unwrap();
        assert!(store.output_dir().is_dir());
    }

    #[test]
    fn test_store_moves_webp_into_indexed_slot() {
        let dir = tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        let image = temp_image(MOCK_WEBP_BYTES);
        let temp_path = image.file.path().to_path_buf();

        let stored = store.store(1, image).unwrap();

        assert_eq!(stored, dir.path().join("generated_image_1.webp"));
        assert_eq!(fs::read(&stored).unwrap(), MOCK_WEBP_BYTES);
        assert!(!temp_path.exists());
    }

    #[test]
    fn test_store_uses_detected_extension() {
        let dir = tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let stored = store.store(2, temp_image(&png_bytes())).unwrap();
        assert_eq!(stored, dir.path().join("generated_image_2.png"));
    }

    #[test]
    fn test_store_falls_back_for_unknown_bytes() {
        let dir = tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let stored = store.store(3, temp_image(b"not an image")).unwrap();
        assert_eq!(stored, dir.path().join("generated_image_3.webp"));
    }

    #[test]
    fn test_store_overwrites_and_removes_other_formats() {
        let dir = tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let png = store.store(1, temp_image(&png_bytes())).unwrap();
        fs::write(dir.path().join("generated_image_1.webp"), b"old").unwrap();

        let webp = store.store(1, temp_image(MOCK_WEBP_BYTES)).unwrap();
        assert!(!png.exists());
        assert_eq!(fs::read(&webp).unwrap(), MOCK_WEBP_BYTES);
    }

    #[test]
    fn test_failed_move_keeps_previous_image() {
        let dir = tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let previous = store.store(1, temp_image(&png_bytes())).unwrap();
        fs::create_dir(dir.path().join("generated_image_1.webp")).unwrap();

        assert!(store.store(1, temp_image(MOCK_WEBP_BYTES)).is_err());
        assert!(previous.exists());
    }

    #[test]
    fn test_write_summary() {
        use crate::models::{BlogRequest, BlogResult};

        let dir = tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        let outcome = BlogOutcome {
            request: BlogRequest::new("Title".to_string(), vec![], 200, 1).unwrap(),
            blog: BlogResult::from_text("a b c"),
            images: vec![],
            generated_at: chrono::Utc::now(),
        };

        let path = store.write_summary(&outcome).unwrap();
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(json["blog"]["word_count"], 3);
        assert_eq!(json["request"]["title"], "Title");
    }
}
