use burn::{
    nn::{Linear, LinearConfig, Relu, Tanh},
    prelude::*,
};

#[derive(Module, Debug)]
pub enum BurnForwarder<B: Backend> {
    Linear(Linear<B>),
    Relu(Relu),
    Tanh(Tanh),
}

#[derive(Module, Debug)]
pub struct Sequence<B: Backend> {
    forwarder_vec: Vec<BurnForwarder<B>>,
}

impl<B: Backend> Sequence<B> {
    pub fn push(&mut self, forwarder: BurnForwarder<B>) {
        self.forwarder_vec.push(forwarder);
    }

    pub fn len(&self) -> usize {
        self.forwarder_vec.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forwarder_vec.is_empty()
    }

    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        let mut out = input;
        for forwarder in &self.forwarder_vec {
            out = match forwarder {
                BurnForwarder::Linear(linear) => linear.forward(out),
                BurnForwarder::Relu(relu) => relu.forward(out),
                BurnForwarder::Tanh(tanh) => tanh.forward(out),
            }
        }
        out
    }
}

/// `n_layers` hidden `Linear + Relu` blocks of width `hidden_dim`, then a linear head.
pub fn build_mlp<B: Backend>(
    input_size: usize,
    output_size: usize,
    n_layers: usize,
    hidden_dim: usize,
    device: &B::Device,
) -> Sequence<B> {
    build_mlp_by_dims(input_size, output_size, &vec![hidden_dim; n_layers], device)
}

pub fn build_mlp_by_dims<B: Backend>(
    input_size: usize,
    output_size: usize,
    layer_dims: &[usize],
    device: &B::Device,
) -> Sequence<B> {
    let mut seq: Sequence<B> = Sequence {
        forwarder_vec: vec![],
    };
    let mut in_size = input_size;
    for hidden_dim in layer_dims {
        seq.push(BurnForwarder::Linear(
            LinearConfig::new(in_size, *hidden_dim).init(device),
        ));
        seq.push(BurnForwarder::Relu(Relu::new()));
        in_size = *hidden_dim;
    }
    seq.push(BurnForwarder::Linear(
        LinearConfig::new(in_size, output_size).init(device),
    ));
    seq
}
