//! Fixed-size chunking over the batch axis.

use crate::cancel::CancelToken;
use crate::error::{Result, RunnerError};
use loopwave_core::layout::{concat_batch, fold_batch_groups_into_time, split_time_into_batch_groups};
use loopwave_core::{LatentModel, ModelOutput};
use ndarray::{s, Array4, ArrayView4};
use rayon::prelude::*;
use std::ops::Range;

/// How chunks are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// One chunk after another on the calling thread.
    #[default]
    Sequential,
    /// Chunks spread over the global rayon pool.
    Parallel,
}

/// Drives a [`LatentModel`] over chunks of at most `batch_size` items.
///
/// Any model failure aborts the whole call; no partial tensor is returned.
#[derive(Debug, Clone)]
pub struct BatchedInferenceRunner {
    batch_size: usize,
    mode: ExecutionMode,
    cancel: Option<CancelToken>,
}

impl BatchedInferenceRunner {
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(RunnerError::InvalidBatchSize);
        }
        Ok(Self {
            batch_size,
            mode: ExecutionMode::Sequential,
            cancel: None,
        })
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// `ceil(n / batch_size)` ascending ranges covering `[0, n)`.
    pub fn chunk_ranges(&self, n: usize) -> Vec<Range<usize>> {
        (0..n.div_ceil(self.batch_size))
            .map(|i| {
                let start = i * self.batch_size;
                start..(start + self.batch_size).min(n)
            })
            .collect()
    }

    /// Single input, single output.
    pub fn run<M>(&self, model: &M, input: ArrayView4<'_, f32>) -> Result<Array4<f32>>
    where
        M: LatentModel + ?Sized,
    {
        self.run_many(model, &[input])
    }

    /// Co-indexed inputs sharing the batch axis, single output.
    pub fn run_many<M>(&self, model: &M, inputs: &[ArrayView4<'_, f32>]) -> Result<Array4<f32>>
    where
        M: LatentModel + ?Sized,
    {
        let n = shared_batch_len(inputs)?;
        let outputs = self.map_chunks(model, n, |chunk, range| {
            let slices = slice_all(inputs, range);
            invoke(model, chunk, &slices)?
                .into_single()
                .map_err(|source| inference_error(model, chunk, source))
        })?;
        concat(&outputs)
    }

    /// Single input, two output streams concatenated independently.
    pub fn run_dual<M>(&self, model: &M, input: ArrayView4<'_, f32>) -> Result<(Array4<f32>, Array4<f32>)>
    where
        M: LatentModel + ?Sized,
    {
        let inputs = [input];
        let n = shared_batch_len(&inputs)?;
        let outputs = self.map_chunks(model, n, |chunk, range| {
            let slices = slice_all(&inputs, range);
            invoke(model, chunk, &slices)?
                .into_dual()
                .map_err(|source| inference_error(model, chunk, source))
        })?;
        concat_pairs(outputs)
    }

    /// Encoder path: every chunk's output carries `parts` groups on its batch
    /// axis, which are moved onto the time axis before concatenation.
    pub fn run_resplit<M>(&self, model: &M, inputs: &[ArrayView4<'_, f32>], parts: usize) -> Result<Array4<f32>>
    where
        M: LatentModel + ?Sized,
    {
        let n = shared_batch_len(inputs)?;
        let outputs = self.map_chunks(model, n, |chunk, range| {
            let slices = slice_all(inputs, range);
            let out = invoke(model, chunk, &slices)?
                .into_single()
                .map_err(|source| inference_error(model, chunk, source))?;
            Ok(fold_batch_groups_into_time(&out, parts)?)
        })?;
        concat(&outputs)
    }

    /// Decoder path: each chunk's time axis is cut into `parts` sub-blocks
    /// that are stacked group-major on the batch axis before invocation
    /// (all first sub-blocks, then all second ones). The model is expected to
    /// fold them back, so its output keeps the chunk's item count.
    pub fn run_folded<M>(&self, model: &M, input: ArrayView4<'_, f32>, parts: usize) -> Result<Array4<f32>>
    where
        M: LatentModel + ?Sized,
    {
        check_foldable(&input, parts)?;
        let n = shared_batch_len(&[input])?;
        let outputs = self.map_chunks(model, n, |chunk, range| {
            let folded = split_time_into_batch_groups(&input.slice(s![range, .., .., ..]), parts)?;
            invoke(model, chunk, &[folded.view()])?
                .into_single()
                .map_err(|source| inference_error(model, chunk, source))
        })?;
        concat(&outputs)
    }

    /// [`run_folded`](Self::run_folded) for a model with two output streams.
    pub fn run_folded_dual<M>(
        &self,
        model: &M,
        input: ArrayView4<'_, f32>,
        parts: usize,
    ) -> Result<(Array4<f32>, Array4<f32>)>
    where
        M: LatentModel + ?Sized,
    {
        check_foldable(&input, parts)?;
        let n = shared_batch_len(&[input])?;
        let outputs = self.map_chunks(model, n, |chunk, range| {
            let folded = split_time_into_batch_groups(&input.slice(s![range, .., .., ..]), parts)?;
            invoke(model, chunk, &[folded.view()])?
                .into_dual()
                .map_err(|source| inference_error(model, chunk, source))
        })?;
        concat_pairs(outputs)
    }

    fn map_chunks<M, T, F>(&self, model: &M, n: usize, f: F) -> Result<Vec<T>>
    where
        M: LatentModel + ?Sized,
        T: Send,
        F: Fn(usize, Range<usize>) -> Result<T> + Sync,
    {
        let ranges = self.chunk_ranges(n);
        tracing::debug!(
            "Running '{}' over {} items in {} chunk(s) of up to {} ({:?})",
            model.name(),
            n,
            ranges.len(),
            self.batch_size,
            self.mode
        );

        let run_chunk = |chunk: usize, range: Range<usize>| -> Result<T> {
            if self.is_cancelled() {
                return Err(RunnerError::Cancelled);
            }
            tracing::debug!("'{}' chunk {}: items {:?}", model.name(), chunk, range);
            f(chunk, range)
        };

        match self.mode {
            ExecutionMode::Sequential => ranges
                .into_iter()
                .enumerate()
                .map(|(chunk, range)| run_chunk(chunk, range))
                .collect(),
            ExecutionMode::Parallel => ranges
                .into_par_iter()
                .enumerate()
                .map(|(chunk, range)| run_chunk(chunk, range))
                .collect(),
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

fn invoke<M>(model: &M, chunk: usize, inputs: &[ArrayView4<'_, f32>]) -> Result<ModelOutput>
where
    M: LatentModel + ?Sized,
{
    model
        .invoke(inputs, false)
        .map_err(|source| inference_error(model, chunk, source))
}

fn inference_error<M>(model: &M, chunk: usize, source: loopwave_core::InferenceError) -> RunnerError
where
    M: LatentModel + ?Sized,
{
    RunnerError::Inference {
        model: model.name().to_string(),
        chunk,
        source,
    }
}

fn shared_batch_len(inputs: &[ArrayView4<'_, f32>]) -> Result<usize> {
    let first = inputs
        .first()
        .ok_or_else(|| RunnerError::Shape("no input tensors".into()))?;
    let n = first.dim().0;
    if let Some(other) = inputs.iter().find(|x| x.dim().0 != n) {
        return Err(RunnerError::Shape(format!(
            "inputs disagree on batch length: {} vs {}",
            n,
            other.dim().0
        )));
    }
    if n == 0 {
        return Err(RunnerError::EmptyInput);
    }
    Ok(n)
}

fn check_foldable(input: &ArrayView4<'_, f32>, parts: usize) -> Result<()> {
    let time = input.dim().2;
    if parts == 0 || time % parts != 0 {
        return Err(RunnerError::Shape(format!(
            "time length {} cannot be folded into {} parts",
            time, parts
        )));
    }
    Ok(())
}

fn slice_all<'a>(inputs: &'a [ArrayView4<'_, f32>], range: Range<usize>) -> Vec<ArrayView4<'a, f32>> {
    inputs
        .iter()
        .map(|x| x.slice(s![range.clone(), .., .., ..]))
        .collect()
}

fn concat(outputs: &[Array4<f32>]) -> Result<Array4<f32>> {
    let views: Vec<ArrayView4<'_, f32>> = outputs.iter().map(|x| x.view()).collect();
    Ok(concat_batch(&views)?)
}

fn concat_pairs(outputs: Vec<(Array4<f32>, Array4<f32>)>) -> Result<(Array4<f32>, Array4<f32>)> {
    let (first, second): (Vec<_>, Vec<_>) = outputs.into_iter().unzip();
    Ok((concat(&first)?, concat(&second)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use loopwave_core::{FnModel, InferenceError};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn ramp(shape: (usize, usize, usize, usize)) -> Array4<f32> {
        let n = shape.0 * shape.1 * shape.2 * shape.3;
        Array4::from_shape_vec(shape, (0..n).map(|v| v as f32).collect()).unwrap()
    }

    fn identity() -> FnModel {
        FnModel::single("identity", |x| Ok(x.to_owned()))
    }

    #[test]
    fn test_chunk_ranges_ceiling() {
        let runner = BatchedInferenceRunner::new(4).unwrap();
        assert_eq!(runner.chunk_ranges(10), vec![0..4, 4..8, 8..10]);
        assert_eq!(runner.chunk_ranges(8), vec![0..4, 4..8]);
        assert_eq!(runner.chunk_ranges(1), vec![0..1]);
        assert!(runner.chunk_ranges(0).is_empty());
    }

    #[test]
    fn test_zero_batch_size() {
        assert!(matches!(
            BatchedInferenceRunner::new(0),
            Err(RunnerError::InvalidBatchSize)
        ));
    }

    #[test]
    fn test_chunks_processed_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&seen);
        let model = FnModel::single("recorder", move |x| {
            record.lock().push((x[[0, 0, 0, 0]] as usize, x.dim().0));
            Ok(x.to_owned())
        });

        let input = ramp((10, 1, 1, 1));
        let runner = BatchedInferenceRunner::new(4).unwrap();
        let output = runner.run(&model, input.view()).unwrap();

        assert_eq!(*seen.lock(), vec![(0, 4), (4, 4), (8, 2)]);
        assert_eq!(output, input);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let model = FnModel::single("square", |x| Ok(x.mapv(|v| v * v)));
        let input = ramp((37, 2, 3, 2));
        let sequential = BatchedInferenceRunner::new(5).unwrap();
        let parallel = sequential.clone().with_mode(ExecutionMode::Parallel);
        assert_eq!(
            sequential.run(&model, input.view()).unwrap(),
            parallel.run(&model, input.view()).unwrap()
        );
    }

    #[test]
    fn test_run_many_shares_batch_axis() {
        let model = FnModel::new("sum", |inputs| {
            Ok(ModelOutput::Single(&inputs[0] + &inputs[1]))
        });
        let a = ramp((6, 1, 1, 2));
        let b = Array4::from_elem((6, 1, 1, 2), 1.0f32);
        let runner = BatchedInferenceRunner::new(4).unwrap();
        let out = runner.run_many(&model, &[a.view(), b.view()]).unwrap();
        assert_eq!(out, &a + 1.0);

        let short = Array4::<f32>::zeros((5, 1, 1, 2));
        assert!(matches!(
            runner.run_many(&model, &[a.view(), short.view()]),
            Err(RunnerError::Shape(_))
        ));
    }

    #[test]
    fn test_run_dual_streams() {
        let model = FnModel::dual("split", |x| Ok((x.to_owned(), x.mapv(|v| -v))));
        let input = ramp((7, 1, 2, 1));
        let runner = BatchedInferenceRunner::new(3).unwrap();
        let (a, b) = runner.run_dual(&model, input.view()).unwrap();
        assert_eq!(a, input);
        assert_eq!(b, input.mapv(|v| -v));
    }

    /// Folds its batch groups back onto time, like a trained decoder.
    fn unfolding() -> FnModel {
        FnModel::single("unfold", |x| {
            fold_batch_groups_into_time(&x, 2).map_err(|e| InferenceError::ForwardFailed(e.to_string()))
        })
    }

    #[test]
    fn test_run_folded_is_group_major() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&seen);
        let model = FnModel::single("recorder", move |x| {
            record.lock().push(x.iter().copied().collect::<Vec<f32>>());
            Ok(x.to_owned())
        });
        let input = ramp((3, 1, 4, 1));
        let runner = BatchedInferenceRunner::new(2).unwrap();
        let out = runner.run_folded(&model, input.view(), 2).unwrap();
        assert_eq!(out.dim(), (6, 1, 2, 1));

        // First halves of items 0 and 1, then their second halves.
        assert_eq!(
            *seen.lock(),
            vec![
                vec![0.0, 1.0, 4.0, 5.0, 2.0, 3.0, 6.0, 7.0],
                vec![8.0, 9.0, 10.0, 11.0],
            ]
        );
        assert!(runner.run_folded(&model, input.view(), 3).is_err());
    }

    #[test]
    fn test_run_folded_with_unfolding_model_restores_input() {
        let input = ramp((5, 1, 4, 2));
        for batch in [1, 2, 3, 8] {
            let runner = BatchedInferenceRunner::new(batch).unwrap();
            let out = runner.run_folded(&unfolding(), input.view(), 2).unwrap();
            assert_eq!(out, input, "batch size {}", batch);
        }
    }

    #[test]
    fn test_run_folded_dual_with_unfolding_model() {
        let model = FnModel::dual("unfold-dual", |x| {
            let unfolded =
                fold_batch_groups_into_time(&x, 2).map_err(|e| InferenceError::ForwardFailed(e.to_string()))?;
            let negated = unfolded.mapv(|v| -v);
            Ok((unfolded, negated))
        });
        let input = ramp((3, 1, 4, 1));
        let runner = BatchedInferenceRunner::new(2).unwrap();
        let (a, b) = runner.run_folded_dual(&model, input.view(), 2).unwrap();
        assert_eq!(a, input);
        assert_eq!(b, input.mapv(|v| -v));
    }

    #[test]
    fn test_run_resplit_moves_groups_to_time() {
        // The model emits [a, b] sub-blocks stacked group-major.
        let model = FnModel::single("stack", |x| {
            Ok(ndarray::concatenate(ndarray::Axis(0), &[x.view(), x.mapv(|v| v + 100.0).view()])
                .map_err(|e| InferenceError::ForwardFailed(e.to_string()))?)
        });
        let input = ramp((3, 1, 1, 1));
        let runner = BatchedInferenceRunner::new(2).unwrap();
        let out = runner.run_resplit(&model, &[input.view()], 2).unwrap();
        assert_eq!(out.dim(), (3, 1, 2, 1));
        assert_eq!(out[[2, 0, 0, 0]], 2.0);
        assert_eq!(out[[2, 0, 1, 0]], 102.0);
    }

    #[test]
    fn test_model_failure_aborts() {
        let model = FnModel::single("flaky", |x| {
            if x[[0, 0, 0, 0]] >= 4.0 {
                Err(InferenceError::ForwardFailed("boom".into()))
            } else {
                Ok(x.to_owned())
            }
        });
        let input = ramp((10, 1, 1, 1));
        let runner = BatchedInferenceRunner::new(4).unwrap();
        match runner.run(&model, input.view()) {
            Err(RunnerError::Inference { model, chunk, .. }) => {
                assert_eq!(model, "flaky");
                assert_eq!(chunk, 1);
            }
            other => panic!("expected inference error, got {:?}", other.map(|a| a.dim())),
        }
    }

    #[test]
    fn test_wrong_stream_count() {
        let runner = BatchedInferenceRunner::new(4).unwrap();
        let input = ramp((2, 1, 1, 1));
        assert!(matches!(
            runner.run_dual(&identity(), input.view()),
            Err(RunnerError::Inference { .. })
        ));
    }

    #[test]
    fn test_cancelled_run_returns_no_tensor() {
        let token = CancelToken::new();
        token.cancel();
        let runner = BatchedInferenceRunner::new(4).unwrap().with_cancel_token(token);
        let input = ramp((10, 1, 1, 1));
        assert!(matches!(
            runner.run(&identity(), input.view()),
            Err(RunnerError::Cancelled)
        ));
    }

    #[test]
    fn test_cancel_between_chunks() {
        let token = CancelToken::new();
        let trigger = token.clone();
        let model = FnModel::single("cancel-after-first", move |x| {
            trigger.cancel();
            Ok(x.to_owned())
        });
        let runner = BatchedInferenceRunner::new(4).unwrap().with_cancel_token(token);
        let input = ramp((10, 1, 1, 1));
        assert!(matches!(
            runner.run(&model, input.view()),
            Err(RunnerError::Cancelled)
        ));
    }

    #[test]
    fn test_empty_input() {
        let runner = BatchedInferenceRunner::new(4).unwrap();
        let input = Array4::<f32>::zeros((0, 1, 1, 1));
        assert!(matches!(
            runner.run(&identity(), input.view()),
            Err(RunnerError::EmptyInput)
        ));
    }

    proptest::proptest! {
        #[test]
        fn prop_identity_preserves_input(n in 1usize..40, batch in 1usize..9, parallel in proptest::bool::ANY) {
            let mode = if parallel { ExecutionMode::Parallel } else { ExecutionMode::Sequential };
            let runner = BatchedInferenceRunner::new(batch).unwrap().with_mode(mode);
            let input = ramp((n, 1, 2, 2));
            let output = runner.run(&identity(), input.view()).unwrap();
            proptest::prop_assert_eq!(output, input);
        }
    }
}
