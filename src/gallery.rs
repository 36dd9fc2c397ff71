//! Writes a generated gallery to disk for the one-shot CLI.

use crate::models::GeneratedImage;
use crate::{Error, Result};
use image::ImageFormat;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub struct GalleryWriter {
    output_dir: PathBuf,
}

impl GalleryWriter {
    pub fn new(output_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(output_dir)?;
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Re-encode to PNG when the payload decodes; otherwise keep the bytes as sent.
    fn write_one_sync(image: GeneratedImage, path_stem: PathBuf) -> Result<PathBuf> {
        match image::load_from_memory(&image.data) {
            Ok(decoded) => {
                let path = path_stem.with_extension("png");
                decoded.save_with_format(&path, ImageFormat::Png)?;
                Ok(path)
            }
            Err(e) => {
                tracing::warn!("Could not decode generated image, saving raw bytes: {}", e);
                let path = path_stem.with_extension(image.extension());
                std::fs::write(&path, &image.data)?;
                Ok(path)
            }
        }
    }

    pub async fn write(&self, images: &[GeneratedImage], base_name: &str) -> Result<Vec<PathBuf>> {
        let batch = Uuid::new_v4();
        let mut paths = Vec::with_capacity(images.len());

        for (index, image) in images.iter().enumerate() {
            let stem = self
                .output_dir
                .join(format!("{}_{}_{}", base_name, batch, index));
            let image = image.clone();
            let path = tokio::task::spawn_blocking(move || Self::write_one_sync(image, stem))
                .await
                .map_err(|e| Error::Invariant(format!("Gallery write task join error: {}", e)))??;
            tracing::debug!("Saved image {} to {}", index, path.display());
            paths.push(path);
        }

        Ok(paths)
    }
}
