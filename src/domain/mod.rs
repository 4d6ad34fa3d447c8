// Domain layer: core models and ports (interfaces). Adapters and core depend on this, never the reverse.

pub mod model;
pub mod ports;
