// Domain layer: models and ports (interfaces). Only std/serde/chrono here.

pub mod model;
pub mod numeric;
pub mod ports;
