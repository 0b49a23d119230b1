//! Polyak averaging (soft target updates).
//!
//! ```text
//! target = tau * source + (1 - tau) * target
//! ```
//!
//! Both flavours check the full structure of the two parameter sets before
//! writing anything, so a mismatch leaves the target untouched.

use burn::module::{Module, ModuleMapper, ModuleVisitor, ParamId};
use burn::prelude::*;
use log::warn;
use ndarray::{ArrayBase, Data, DataMut, Dimension, Zip};
use num_traits::Float;

use crate::error::{Result, RlError};

fn check_tau(tau: f64) {
    if !(0.0..=1.0).contains(&tau) {
        warn!("polyak tau={} is outside [0, 1]", tau);
    }
}

fn check_shapes(shapes_source: &[Vec<usize>], shapes_target: &[Vec<usize>]) -> Result<()> {
    if shapes_source.len() != shapes_target.len() {
        return Err(RlError::shape_mismatch(
            "polyak parameter count",
            &[shapes_target.len()],
            &[shapes_source.len()],
        ));
    }
    for (i, (source, target)) in shapes_source.iter().zip(shapes_target.iter()).enumerate() {
        if source != target {
            return Err(RlError::shape_mismatch(
                format!("polyak parameter {}", i),
                target,
                source,
            ));
        }
    }
    Ok(())
}

/// Blends `source` into `target` element by element, writing through the
/// target's existing buffers.
pub fn polyak_average<A, S1, S2, D>(
    source: &[ArrayBase<S1, D>],
    target: &mut [ArrayBase<S2, D>],
    tau: A,
) -> Result<()>
where
    A: Float,
    S1: Data<Elem = A>,
    S2: DataMut<Elem = A>,
    D: Dimension,
{
    check_shapes(
        &source.iter().map(|p| p.shape().to_vec()).collect::<Vec<_>>(),
        &target.iter().map(|p| p.shape().to_vec()).collect::<Vec<_>>(),
    )?;
    check_tau(tau.to_f64().unwrap_or(f64::NAN));

    let keep = A::one() - tau;
    for (src, tgt) in source.iter().zip(target.iter_mut()) {
        Zip::from(tgt)
            .and(src)
            .for_each(|t, &s| *t = tau * s + keep * *t);
    }
    Ok(())
}

struct ParamCollector<B: Backend> {
    params: Vec<Tensor<B, 1>>,
    shapes: Vec<Vec<usize>>,
}

impl<B: Backend> ModuleVisitor<B> for ParamCollector<B> {
    fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D>) {
        let dims = tensor.dims();
        let total_size: usize = dims.iter().product();
        self.shapes.push(dims.to_vec());
        self.params
            .push(tensor.clone().detach().reshape(Shape::new([total_size])));
    }
}

struct ShapeCollector {
    shapes: Vec<Vec<usize>>,
}

impl<B: Backend> ModuleVisitor<B> for ShapeCollector {
    fn visit_float<const D: usize>(&mut self, _id: ParamId, tensor: &Tensor<B, D>) {
        self.shapes.push(tensor.dims().to_vec());
    }
}

fn collect_shapes<B: Backend, M: Module<B>>(module: &M) -> Vec<Vec<usize>> {
    let mut collector = ShapeCollector { shapes: Vec::new() };
    module.visit(&mut collector);
    collector.shapes
}

fn collect_params<B: Backend, M: Module<B>>(module: &M) -> ParamCollector<B> {
    let mut collector = ParamCollector {
        params: Vec::new(),
        shapes: Vec::new(),
    };
    module.visit(&mut collector);
    collector
}

// Parameters are matched by traversal order, which is fixed for a given architecture.
struct PolyakMapper<B: Backend> {
    source: std::vec::IntoIter<Tensor<B, 1>>,
    tau: f64,
}

impl<B: Backend> ModuleMapper<B> for PolyakMapper<B> {
    fn map_float<const D: usize>(&mut self, _id: ParamId, tensor: Tensor<B, D>) -> Tensor<B, D> {
        let Some(source) = self.source.next() else {
            // unreachable once shapes are checked
            return tensor;
        };
        let require_grad = tensor.is_require_grad();
        let shape = tensor.shape();
        let blended = source.reshape(shape).mul_scalar(self.tau)
            + tensor.detach().mul_scalar(1.0 - self.tau);
        blended.set_require_grad(require_grad)
    }
}

/// Polyak update between two burn modules of the same architecture.
///
/// `target` keeps its parameter ids; only float parameters are blended.
pub fn polyak_average_module<B, M>(source: &M, target: &mut M, tau: f64) -> Result<()>
where
    B: Backend,
    M: Module<B>,
{
    let source_params = collect_params(source);
    let target_shapes = collect_shapes::<B, M>(target);
    check_shapes(&source_params.shapes, &target_shapes)?;
    check_tau(tau);

    let mut mapper = PolyakMapper {
        source: source_params.params.into_iter(),
        tau,
    };
    *target = target.clone().map(&mut mapper);
    Ok(())
}
