use chrono::{DateTime, Local, TimeZone};
use rand::Rng;
use std::fmt::Display;
use std::path::PathBuf;

use crate::error::Result;
use crate::types::{ImageResult, SavedImage};

/// `YYYYMMDD-HHMMSS-micros-random`, shared by every file of one batch.
pub fn batch_prefix<Tz>(now: &DateTime<Tz>, random: u32) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!("{}-{:06}", now.format("%Y%m%d-%H%M%S-%6f"), random % 1_000_000)
}

pub fn image_filename(prefix: &str, node_id: &str, index: usize) -> String {
    format!("output_{}_{}_{}.png", prefix, node_id, index)
}

/// Writes generated images under collision-resistant names.
///
/// Files are written one at a time; if a write fails, the images already
/// written stay on disk and the error is returned.
#[derive(Debug, Clone, Default)]
pub struct ImageSaver {
    output_dir: Option<PathBuf>,
}

impl ImageSaver {
    /// Save into the current working directory.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub async fn save(&self, images: &[ImageResult]) -> Result<Vec<SavedImage>> {
        let random: u32 = rand::rng().random_range(0..1_000_000);
        let prefix = batch_prefix(&Local::now(), random);
        self.save_with_prefix(images, &prefix).await
    }

    /// Save with an explicit batch prefix.
    pub async fn save_with_prefix(&self, images: &[ImageResult], prefix: &str) -> Result<Vec<SavedImage>> {
        let mut saved = Vec::with_capacity(images.len());
        for image in images {
            let name = image_filename(prefix, &image.node_id, image.index);
            let path = match &self.output_dir {
                Some(dir) => dir.join(&name),
                None => PathBuf::from(&name),
            };
            tokio::fs::write(&path, &image.data).await?;
            tracing::debug!(path = %path.display(), bytes = image.data.len(), "Saved image");
            saved.push(SavedImage {
                node_id: image.node_id.clone(),
                index: image.index,
                filename: path.to_string_lossy().into_owned(),
            });
        }
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn image(node_id: &str, index: usize, data: &[u8]) -> ImageResult {
        ImageResult {
            node_id: node_id.into(),
            index,
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_batch_prefix_format() {
        let now = NaiveDate::from_ymd_opt(2026, 3, 7)
            .unwrap()
            .and_hms_micro_opt(9, 5, 2, 4_321)
            .unwrap()
            .and_utc();
        assert_eq!(batch_prefix(&now, 42), "20260307-090502-004321-000042");
        assert_eq!(batch_prefix(&now, 999_999), "20260307-090502-004321-999999");
    }

    #[test]
    fn test_batch_prefix_is_fixed_width() {
        let prefix = batch_prefix(&Utc::now(), 7);
        assert_eq!(prefix.len(), "YYYYMMDD-HHMMSS-ffffff-rrrrrr".len());
        assert!(prefix.ends_with("-000007"));
    }

    #[test]
    fn test_image_filename() {
        assert_eq!(image_filename("p", "9", 2), "output_p_9_2.png");
    }

    #[tokio::test]
    async fn test_save_batch_shares_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let saver = ImageSaver::new().with_output_dir(dir.path());
        let images = vec![image("9", 0, b"one"), image("9", 1, b"two"), image("12", 0, b"three")];

        let saved = saver.save(&images).await.unwrap();
        assert_eq!(saved.len(), 3);

        let names: Vec<String> = saved
            .iter()
            .map(|s| {
                std::path::Path::new(&s.filename)
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .into_owned()
            })
            .collect();
        let prefix = names[0]
            .strip_prefix("output_")
            .and_then(|n| n.strip_suffix("_9_0.png"))
            .unwrap();
        assert_eq!(names[1], format!("output_{}_9_1.png", prefix));
        assert_eq!(names[2], format!("output_{}_12_0.png", prefix));

        for (record, original) in saved.iter().zip(&images) {
            assert_eq!(record.node_id, original.node_id);
            assert_eq!(record.index, original.index);
            assert_eq!(std::fs::read(&record.filename).unwrap(), original.data);
        }
    }

    #[tokio::test]
    async fn test_save_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let saver = ImageSaver::new().with_output_dir(dir.path());
        // A node id containing a missing subdirectory makes the second write fail.
        let images = vec![image("1", 0, b"ok"), image("missing/1", 0, b"bad")];

        let result = saver.save_with_prefix(&images, "p").await;
        assert!(result.is_err());
        assert!(dir.path().join("output_p_1_0.png").exists());
    }
}
