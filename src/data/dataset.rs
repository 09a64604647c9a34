use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};

/// One CIFAR-100 row: flattened pixels and its class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageItem {
    pub pixels: Vec<f32>,
    pub label: i64,
}

/// One StackOverflow post for tag prediction.
/// `tokens` is the encoded body + title, `tags` the multi-hot target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagItem {
    pub tokens: Vec<u32>,
    pub tags: Vec<f32>,
}

/// One StackOverflow post for next-word prediction,
/// already shifted so `targets[i] == inputs[i + 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceItem {
    pub inputs: Vec<u32>,
    pub targets: Vec<u32>,
}

/// The rows of one split of one shard, held in memory.
pub struct ShardDataset<I> {
    items: Vec<I>,
}

impl<I> ShardDataset<I> {
    pub fn new(items: Vec<I>) -> Self { Self { items } }

    pub fn sample_count(&self) -> usize { self.items.len() }
}

impl<I: Clone + Send + Sync> Dataset<I> for ShardDataset<I> {
    fn get(&self, index: usize) -> Option<I> {
        self.items.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dataset_get() {
        let ds = ShardDataset::new(vec![
            ImageItem { pixels: vec![0.0], label: 3 },
            ImageItem { pixels: vec![1.0], label: 4 },
        ]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.sample_count(), 2);
        assert_eq!(ds.get(1).map(|item| item.label), Some(4));
        assert!(ds.get(2).is_none());
    }
}
