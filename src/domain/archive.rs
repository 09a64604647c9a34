// ============================================================
// Layer 3 — Archive Domain Types
// ============================================================
// The columnar archives the loaders read from. Each split
// (train / test) of a dataset is one archive.
//
// Image archive (Federated CIFAR-100), one entry per row:
//
//   image        [[f32; h*w*c], ...]   pixel rows
//   image_shape  [h, w, c]
//   label        [i64, ...]            class per row
//   id           [i64, ...]            owning client per row
//
// Text archive (StackOverflow), grouped by client key:
//
//   examples
//     └── "<client key>"
//           ├── tokens  ["...", ...]   post body
//           ├── title   ["...", ...]   post title
//           └── tags    ["a|b", ...]   '|'-joined tags
//
// Only plain data and validation live here; reading files is
// the infra layer's job.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{DataError, DataResult};

/// Anything that can be opened as one split of a federated dataset.
pub trait Archive: DeserializeOwned {
    /// Check that the columns agree with each other
    fn validate(&self) -> DataResult<()>;

    /// Number of examples in the archive
    fn row_count(&self) -> usize;
}

// ─── Image Archive ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageArchive {
    pub image: Vec<Vec<f32>>,
    pub image_shape: [usize; 3],
    pub label: Vec<i64>,
    pub id: Vec<i64>,
}

impl ImageArchive {
    /// Values per image row: height * width * channels
    pub fn pixels_per_image(&self) -> usize {
        self.image_shape.iter().product()
    }

    /// Distinct client IDs in ascending order
    pub fn client_ids(&self) -> Vec<i64> {
        self.id
            .iter()
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Row positions grouped by client ID
    pub fn rows_by_id(&self) -> HashMap<i64, Vec<usize>> {
        let mut rows: HashMap<i64, Vec<usize>> = HashMap::new();
        for (row, id) in self.id.iter().enumerate() {
            rows.entry(*id).or_default().push(row);
        }
        rows
    }

    /// Number of distinct labels
    pub fn class_num(&self) -> usize {
        self.label.iter().collect::<BTreeSet<_>>().len()
    }
}

impl Archive for ImageArchive {
    fn validate(&self) -> DataResult<()> {
        let rows = self.image.len();
        if self.label.len() != rows || self.id.len() != rows {
            return Err(DataError::MalformedArchive(format!(
                "column lengths differ: image={}, label={}, id={}",
                rows,
                self.label.len(),
                self.id.len()
            )));
        }

        let expected = self.pixels_per_image();
        if let Some((row, pixels)) = self
            .image
            .iter()
            .enumerate()
            .find(|(_, pixels)| pixels.len() != expected)
        {
            return Err(DataError::MalformedArchive(format!(
                "image row {} has {} values, shape {:?} needs {}",
                row,
                pixels.len(),
                self.image_shape,
                expected
            )));
        }
        Ok(())
    }

    fn row_count(&self) -> usize {
        self.image.len()
    }
}

// ─── Text Archive ─────────────────────────────────────────────────────────────
/// One client's posts. The three columns are parallel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientExamples {
    pub tokens: Vec<String>,
    pub title: Vec<String>,
    pub tags: Vec<String>,
}

impl ClientExamples {
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Body and title of every post joined with a single space
    pub fn token_title_pairs(&self) -> Vec<String> {
        self.tokens
            .iter()
            .zip(&self.title)
            .map(|(tokens, title)| format!("{tokens} {title}"))
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextArchive {
    pub examples: BTreeMap<String, ClientExamples>,
}

impl TextArchive {
    /// Client keys in ascending order
    pub fn client_keys(&self) -> Vec<String> {
        self.examples.keys().cloned().collect()
    }
}

impl Archive for TextArchive {
    fn validate(&self) -> DataResult<()> {
        for (key, group) in &self.examples {
            if group.title.len() != group.len() || group.tags.len() != group.len() {
                return Err(DataError::MalformedArchive(format!(
                    "client '{}' column lengths differ: tokens={}, title={}, tags={}",
                    key,
                    group.len(),
                    group.title.len(),
                    group.tags.len()
                )));
            }
        }
        Ok(())
    }

    fn row_count(&self) -> usize {
        self.examples.values().map(ClientExamples::len).sum()
    }
}
