use ndarray::Array3;

use crate::error::Result;

/// Width of the ResNet-50 classification head, and so of every embedding
pub const RESNET50_OUTPUT_DIM: usize = 1000;

/// Something that turns preprocessed image tensors into embedding vectors.
///
/// Implementations must return exactly one vector per input, in input order,
/// and every vector must have length [`Embedder::dimension`]. They must be
/// usable concurrently from several requests without external locking.
pub trait Embedder: Send + Sync + std::fmt::Debug {
    /// Embed a batch of `(3, 224, 224)` tensors.
    fn embed(&self, inputs: &[Array3<f32>]) -> Result<Vec<Vec<f32>>>;

    /// Length of every vector produced by this embedder
    fn dimension(&self) -> usize;
}

#[cfg(feature = "embeddings")]
pub use self::resnet::EmbeddingModel;

#[cfg(feature = "embeddings")]
mod resnet {
    use std::path::Path;
    use std::sync::Mutex;

    use ndarray::Array3;
    use tch::nn::{self, FuncT, ModuleT};
    use tch::{Device, Tensor};

    use super::{Embedder, RESNET50_OUTPUT_DIM};
    use crate::error::{AppError, Result, ResultExt};
    use crate::state::DevicePreference;

    /// A pretrained ResNet-50 used as a frozen feature extractor
    pub struct EmbeddingModel {
        // FuncT is Send but not Sync; the lock is what lets one instance be shared.
        model: Mutex<FuncT<'static>>,
        device: Device,
        _vs: nn::VarStore,
    }

    impl std::fmt::Debug for EmbeddingModel {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("EmbeddingModel")
                .field("architecture", &"resnet50")
                .field("device", &self.device)
                .finish()
        }
    }

    fn resolve_device(preference: DevicePreference) -> Device {
        match preference {
            DevicePreference::Auto => Device::cuda_if_available(),
            DevicePreference::Cpu => Device::Cpu,
            DevicePreference::Cuda(index) => Device::Cuda(index),
        }
    }

    impl EmbeddingModel {
        /// Build the network and load pretrained weights from `weights_path`.
        ///
        /// The checkpoint must be in tch's `.ot` format with the torchvision
        /// ResNet-50 parameter names. The model is put in evaluation mode and
        /// never updated afterwards.
        pub fn load<P: AsRef<Path>>(weights_path: P, device: DevicePreference) -> Result<Self> {
            let weights_path = weights_path.as_ref();
            if !weights_path.is_file() {
                return Err(AppError::Config(format!(
                    "model weights not found at {}",
                    weights_path.display()
                )));
            }

            let device = resolve_device(device);
            let mut vs = nn::VarStore::new(device);
            let model = tch::vision::resnet::resnet50(&vs.root(), RESNET50_OUTPUT_DIM as i64);
            vs.load(weights_path)
                .with_context(|| format!("loading weights from {}", weights_path.display()))?;
            vs.freeze();

            log::info!(
                "Loaded ResNet-50 weights from {} on {:?}",
                weights_path.display(),
                device
            );

            Ok(Self {
                model: Mutex::new(model),
                device,
                _vs: vs,
            })
        }

        /// Device the network runs on
        pub fn device(&self) -> Device {
            self.device
        }

        fn forward_one(&self, model: &FuncT<'static>, input: &Array3<f32>) -> Result<Vec<f32>> {
            let (channels, height, width) = input.dim();
            let data = input.as_standard_layout();
            let data = data
                .as_slice()
                .ok_or_else(|| AppError::Processing("input tensor is not contiguous".to_string()))?;

            let tensor = Tensor::of_slice(data)
                .view([1, channels as i64, height as i64, width as i64])
                .to_device(self.device);

            let output = model
                .forward_t(&tensor, false)
                .flatten(0, -1)
                .to_device(Device::Cpu);
            let embedding = Vec::<f32>::try_from(&output)?;

            if embedding.len() != RESNET50_OUTPUT_DIM {
                return Err(AppError::DimensionMismatch {
                    expected: RESNET50_OUTPUT_DIM,
                    actual: embedding.len(),
                });
            }
            if embedding.iter().any(|v| !v.is_finite()) {
                return Err(AppError::Processing(
                    "model produced non-finite activations".to_string(),
                ));
            }

            Ok(embedding)
        }
    }

    impl Embedder for EmbeddingModel {
        fn embed(&self, inputs: &[Array3<f32>]) -> Result<Vec<Vec<f32>>> {
            let model = self
                .model
                .lock()
                .map_err(|_| AppError::Internal("embedding model lock poisoned".to_string()))?;

            tch::no_grad(|| {
                inputs
                    .iter()
                    .map(|input| self.forward_one(&model, input))
                    .collect()
            })
        }

        fn dimension(&self) -> usize {
            RESNET50_OUTPUT_DIM
        }
    }

}
