//! Batching of images into tensors
//!
//! Shuffling, batching, and iteration are burn's `DataLoader`; this module only says how a
//! list of items becomes a batch of tensors.

use burn::{
    data::{dataloader::batcher::Batcher, dataset::InMemDataset},
    prelude::*,
};

use crate::datasets::{ImageItem, ImageSet};

/// A mini batch ready for the forward pass
#[derive(Debug, Clone)]
pub struct ImageBatch<B: Backend> {
    /// Flattened images, `[batch, width * height]`
    pub images: Tensor<B, 2>,
    /// Class index per image, `[batch]`
    pub targets: Tensor<B, 1, Int>,
    /// One hot encoded targets, `[batch, num_classes]`
    pub one_hot: Tensor<B, 2>,
}

impl<B: Backend> ImageBatch<B> {
    pub fn len(&self) -> usize {
        self.targets.dims()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stacks `ImageItem`s into an `ImageBatch` on any backend
#[derive(Debug, Clone)]
pub struct ImageBatcher {
    num_classes: usize,
}

impl ImageBatcher {
    pub fn new(num_classes: usize) -> Self {
        Self { num_classes }
    }
}

impl<B: Backend> Batcher<B, ImageItem, ImageBatch<B>> for ImageBatcher {
    fn batch(&self, items: Vec<ImageItem>, device: &B::Device) -> ImageBatch<B> {
        let batch_size = items.len();
        let input_size = items.first().map_or(0, |i| i.pixels.len());

        let pixels = items
            .iter()
            .flat_map(|i| i.pixels.iter().copied())
            .collect::<Vec<f32>>();
        let labels = items.iter().map(|i| i.label as i64).collect::<Vec<_>>();
        let one_hot = items
            .iter()
            .flat_map(|i| (0..self.num_classes).map(move |k| if k == i.label { 1.0f32 } else { 0.0 }))
            .collect::<Vec<_>>();

        let images = Tensor::<B, 2>::from_data(
            TensorData::new(pixels, [batch_size, input_size]).convert::<B::FloatElem>(),
            device,
        );
        let targets = Tensor::<B, 1, Int>::from_data(
            TensorData::new(labels, [batch_size]).convert::<B::IntElem>(),
            device,
        );
        let one_hot = Tensor::<B, 2>::from_data(
            TensorData::new(one_hot, [batch_size, self.num_classes]).convert::<B::FloatElem>(),
            device,
        );

        ImageBatch {
            images,
            targets,
            one_hot,
        }
    }
}

impl ImageSet {
    /// Hands the images to burn as an in-memory dataset
    pub fn into_dataset(self) -> InMemDataset<ImageItem> {
        InMemDataset::new(self.items)
    }

    /// A batcher matching this set's classes
    pub fn batcher(&self) -> ImageBatcher {
        ImageBatcher::new(self.num_classes())
    }
}
