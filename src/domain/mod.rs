// Domain layer: record model and ports (solver, storage, config, pipeline).

pub mod model;
pub mod ports;
