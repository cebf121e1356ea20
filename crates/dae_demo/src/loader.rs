//! PNG-backed resource loader.
//!
//! Resource ids map to `<root>/<id>.png`. Decode failures come back as
//! errors for the cache to log and retry; they never panic.

use std::path::PathBuf;

use dae_scene::{Pixmap, ResourceId, ResourceLoader};

pub struct PngLoader {
    root: PathBuf,
}

impl PngLoader {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl ResourceLoader for PngLoader {
    fn load(&self, id: ResourceId) -> Result<Pixmap, String> {
        let path = self.root.join(format!("{id}.png"));
        let decoded = image::open(&path)
            .map_err(|e| format!("Failed to decode {}: {e}", path.display()))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        Pixmap::new(width, height, decoded.into_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "dae_loader_test_{}_{}_{}",
            name_hint,
            std::process::id(),
            nanos
        ));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn decodes_a_png_by_id() {
        let dir = temp_dir("decode");
        let path = dir.join("7.png");
        image::save_buffer(&path, &[255u8, 0, 0, 255], 1, 1, image::ColorType::Rgba8)
            .expect("write test png");

        let loader = PngLoader::new(dir.clone());
        let pixmap = loader.load(7).expect("png should decode");
        assert_eq!((pixmap.width, pixmap.height), (1, 1));
        assert_eq!(&pixmap.pixels, &[255, 0, 0, 255]);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = temp_dir("missing");
        let loader = PngLoader::new(dir.clone());
        let err = loader.load(99).expect_err("missing png should fail");
        assert!(err.contains("99.png"));
        let _ = std::fs::remove_dir_all(dir);
    }
}
