//! `ndarray` <-> Burn tensor conversion.

use burn::prelude::*;
use burn::tensor::backend::Backend;
use loopwave_core::InferenceError;
use ndarray::{Array4, ArrayView4};

pub(crate) fn to_tensor<B: Backend>(x: &ArrayView4<'_, f32>, device: &B::Device) -> Tensor<B, 4> {
    let (b, c, t, f) = x.dim();
    let data: Vec<f32> = x.iter().copied().collect();
    Tensor::<B, 1>::from_floats(data.as_slice(), device).reshape([b, c, t, f])
}

pub(crate) fn from_tensor<B: Backend>(tensor: Tensor<B, 4>) -> Result<Array4<f32>, InferenceError> {
    let [b, c, t, f] = tensor.dims();
    let data = tensor
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| InferenceError::ForwardFailed(format!("tensor readback failed: {:?}", e)))?;
    Array4::from_shape_vec((b, c, t, f), data)
        .map_err(|e| InferenceError::ForwardFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::ndarray::NdArrayDevice;
    use burn::backend::NdArray;

    #[test]
    fn test_roundtrip_preserves_layout() {
        let x = Array4::from_shape_fn((2, 1, 3, 2), |(b, _, t, f)| (b * 100 + t * 10 + f) as f32);
        let device = NdArrayDevice::default();
        let tensor = to_tensor::<NdArray>(&x.view(), &device);
        assert_eq!(tensor.dims(), [2, 1, 3, 2]);
        assert_eq!(from_tensor(tensor).unwrap(), x);
    }

    #[test]
    fn test_non_contiguous_view() {
        let x = Array4::from_shape_fn((1, 1, 2, 3), |(_, _, t, f)| (t * 3 + f) as f32);
        let transposed = x.view().permuted_axes([0, 1, 3, 2]);
        let device = NdArrayDevice::default();
        let back = from_tensor(to_tensor::<NdArray>(&transposed, &device)).unwrap();
        assert_eq!(back, transposed.to_owned());
    }
}
