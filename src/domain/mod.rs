// Domain layer: value types exchanged with the evaluator and the ports the core talks through.

pub mod model;
pub mod ports;
