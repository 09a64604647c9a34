// ============================================================
// Layer 4 — Shard Batchers
// ============================================================
// Implement burn's Batcher trait for the three item kinds a
// shard can hold. The DataLoader hands each batcher a Vec of
// up to batch_size items; the batcher stacks them into tensors
// whose first dimension is the number of items.
//
//   ImageItem    → images [n, h, w, c] float, labels [n] int
//   TagItem      → tokens [n, L + 1]   int,   tags   [n, T] float
//   SequenceItem → inputs [n, L]       int,   targets [n, L] int
//
// All rows of one kind already share one length (the encoder
// pads, the archive validates image sizes), so stacking is a
// flatten followed by a reshape.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::data::dataset::{ImageItem, SequenceItem, TagItem};

/// Row width of the first item, 0 for an empty batch
fn row_width(mut rows: impl Iterator<Item = usize>) -> usize {
    rows.next().unwrap_or(0)
}

fn flatten_ids<'a>(rows: impl Iterator<Item = &'a Vec<u32>>) -> Vec<i32> {
    rows.flat_map(|row| row.iter().map(|&id| id as i32)).collect()
}

// ─── Images ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Shape: [batch_size, height, width, channels]
    pub images: Tensor<B, 4>,
    /// Shape: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct ImageBatcher<B: Backend> {
    pub device: B::Device,
    pub image_shape: [usize; 3],
}

impl<B: Backend> ImageBatcher<B> {
    pub fn new(device: B::Device, image_shape: [usize; 3]) -> Self {
        Self { device, image_shape }
    }
}

impl<B: Backend> Batcher<ImageItem, ImageBatch<B>> for ImageBatcher<B> {
    fn batch(&self, items: Vec<ImageItem>) -> ImageBatch<B> {
        let batch_size = items.len();
        let [height, width, channels] = self.image_shape;

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|item| item.pixels.iter().copied())
            .collect();
        let labels: Vec<i64> = items.iter().map(|item| item.label).collect();

        let images = Tensor::<B, 1>::from_floats(pixels.as_slice(), &self.device)
            .reshape([batch_size, height, width, channels]);
        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        ImageBatch { images, labels }
    }
}

// ─── Tag prediction ───────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct TagBatch<B: Backend> {
    /// Shape: [batch_size, max_seq_len + 1]
    pub tokens: Tensor<B, 2, Int>,
    /// Shape: [batch_size, tag_vocab_size], 0/1 entries
    pub tags: Tensor<B, 2>,
}

#[derive(Clone, Debug)]
pub struct TagBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> TagBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<TagItem, TagBatch<B>> for TagBatcher<B> {
    fn batch(&self, items: Vec<TagItem>) -> TagBatch<B> {
        let batch_size = items.len();
        let seq_len = row_width(items.iter().map(|item| item.tokens.len()));
        let tag_len = row_width(items.iter().map(|item| item.tags.len()));

        let tokens = flatten_ids(items.iter().map(|item| &item.tokens));
        let tags: Vec<f32> = items
            .iter()
            .flat_map(|item| item.tags.iter().copied())
            .collect();

        let tokens = Tensor::<B, 1, Int>::from_ints(tokens.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let tags = Tensor::<B, 1>::from_floats(tags.as_slice(), &self.device)
            .reshape([batch_size, tag_len]);

        TagBatch { tokens, tags }
    }
}

// ─── Next-word prediction ─────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct SequenceBatch<B: Backend> {
    /// Shape: [batch_size, max_seq_len]
    pub inputs: Tensor<B, 2, Int>,
    /// Shape: [batch_size, max_seq_len]
    pub targets: Tensor<B, 2, Int>,
}

#[derive(Clone, Debug)]
pub struct SequenceBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> SequenceBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<SequenceItem, SequenceBatch<B>> for SequenceBatcher<B> {
    fn batch(&self, items: Vec<SequenceItem>) -> SequenceBatch<B> {
        let batch_size = items.len();
        let seq_len = row_width(items.iter().map(|item| item.inputs.len()));

        let inputs = flatten_ids(items.iter().map(|item| &item.inputs));
        let targets = flatten_ids(items.iter().map(|item| &item.targets));

        let inputs = Tensor::<B, 1, Int>::from_ints(inputs.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);
        let targets = Tensor::<B, 1, Int>::from_ints(targets.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);

        SequenceBatch { inputs, targets }
    }
}
