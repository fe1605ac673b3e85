//! CPU/GPU dispatch for Burn-backed models.
//!
//! A [`BurnModel`] captures its backend and device at construction, so
//! [`LatentModel::invoke`] is self-contained: the `ndarray` input is uploaded
//! to that device, the forward pass runs, and the result is read back.

use burn::backend::ndarray::NdArrayDevice;
use burn::backend::NdArray;
#[cfg(feature = "gpu")]
use burn::backend::wgpu::{Wgpu, WgpuDevice};
use burn::prelude::*;
use burn::tensor::backend::Backend;
use loopwave_core::{InferenceError, LatentModel, ModelOutput};
use ndarray::ArrayView4;

use crate::convert::{from_tensor, to_tensor};
use crate::forward::{BurnForward, BurnOutput};

/// Where a model executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DevicePlacement {
    /// CPU via NdArray backend (always available).
    #[default]
    Cpu,
    /// GPU via wgpu backend (`gpu` feature).
    Gpu,
}

enum DeviceForward {
    Cpu {
        forward: BurnForward<NdArray>,
        device: NdArrayDevice,
    },
    #[cfg(feature = "gpu")]
    Gpu {
        forward: BurnForward<Wgpu>,
        device: WgpuDevice,
    },
}

/// A Burn forward pass usable as a generator or decoder stage.
pub struct BurnModel {
    name: String,
    inner: DeviceForward,
}

impl BurnModel {
    /// CPU model returning either one or two streams.
    pub fn cpu<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Tensor<NdArray, 4>) -> BurnOutput<NdArray> + Send + 'static,
    {
        Self {
            name: name.into(),
            inner: DeviceForward::Cpu {
                forward: BurnForward::from_forward(f),
                device: NdArrayDevice::default(),
            },
        }
    }

    pub fn cpu_single<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Tensor<NdArray, 4>) -> Tensor<NdArray, 4> + Send + 'static,
    {
        Self::cpu(name, move |x| BurnOutput::Single(f(x)))
    }

    pub fn cpu_dual<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Tensor<NdArray, 4>) -> (Tensor<NdArray, 4>, Tensor<NdArray, 4>) + Send + 'static,
    {
        Self::cpu(name, move |x| {
            let (a, b) = f(x);
            BurnOutput::Dual(a, b)
        })
    }

    /// GPU model on the default wgpu device.
    #[cfg(feature = "gpu")]
    pub fn gpu<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Tensor<Wgpu, 4>) -> BurnOutput<Wgpu> + Send + 'static,
    {
        Self {
            name: name.into(),
            inner: DeviceForward::Gpu {
                forward: BurnForward::from_forward(f),
                device: WgpuDevice::default(),
            },
        }
    }

    pub fn placement(&self) -> DevicePlacement {
        match &self.inner {
            DeviceForward::Cpu { .. } => DevicePlacement::Cpu,
            #[cfg(feature = "gpu")]
            DeviceForward::Gpu { .. } => DevicePlacement::Gpu,
        }
    }
}

impl std::fmt::Debug for BurnModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BurnModel")
            .field("name", &self.name)
            .field("placement", &self.placement())
            .finish()
    }
}

impl LatentModel for BurnModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(
        &self,
        inputs: &[ArrayView4<'_, f32>],
        _training: bool,
    ) -> Result<ModelOutput, InferenceError> {
        let input = match inputs {
            [only] => only,
            _ => {
                return Err(InferenceError::InvalidInput(format!(
                    "Burn models take one input tensor, got {}",
                    inputs.len()
                )))
            }
        };
        tracing::debug!("Burn '{}' forward on {:?}", self.name, input.dim());

        match &self.inner {
            DeviceForward::Cpu { forward, device } => run(forward, device, input),
            #[cfg(feature = "gpu")]
            DeviceForward::Gpu { forward, device } => run(forward, device, input),
        }
    }
}

fn run<B: Backend>(
    forward: &BurnForward<B>,
    device: &B::Device,
    input: &ArrayView4<'_, f32>,
) -> Result<ModelOutput, InferenceError> {
    match forward.forward(to_tensor::<B>(input, device)) {
        BurnOutput::Single(x) => Ok(ModelOutput::Single(from_tensor(x)?)),
        BurnOutput::Dual(a, b) => Ok(ModelOutput::Dual(from_tensor(a)?, from_tensor(b)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    fn ramp() -> Array4<f32> {
        Array4::from_shape_fn((3, 1, 4, 2), |(b, _, t, f)| (b * 8 + t * 2 + f) as f32)
    }

    #[test]
    fn test_cpu_single() {
        let model = BurnModel::cpu_single("double", |x| x.mul_scalar(2.0));
        assert_eq!(model.placement(), DevicePlacement::Cpu);
        assert_eq!(model.name(), "double");

        let x = ramp();
        let out = model.invoke(&[x.view()], false).unwrap().into_single().unwrap();
        assert_eq!(out, x.mapv(|v| v * 2.0));
    }

    #[test]
    fn test_cpu_dual() {
        let model = BurnModel::cpu_dual("pair", |x| (x.clone(), x.neg()));
        let x = ramp();
        let (a, b) = model.invoke(&[x.view()], false).unwrap().into_dual().unwrap();
        assert_eq!(a, x);
        assert_eq!(b, x.mapv(|v| -v));
    }

    #[test]
    fn test_shape_change() {
        // Folding time onto batch inside the model is visible to the caller.
        let model = BurnModel::cpu_single("fold", |x| {
            let [b, c, t, f] = x.dims();
            x.reshape([b * 2, c, t / 2, f])
        });
        let out = model
            .invoke(&[ramp().view()], false)
            .unwrap()
            .into_single()
            .unwrap();
        assert_eq!(out.dim(), (6, 1, 2, 2));
    }

    #[test]
    fn test_rejects_multiple_inputs() {
        let model = BurnModel::cpu_single("identity", |x| x);
        let x = ramp();
        assert!(matches!(
            model.invoke(&[x.view(), x.view()], false),
            Err(InferenceError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_model_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<BurnModel>();
    }
}
