// Domain layer: records, schema changes and the store ports. Only std/serde here.

pub mod model;
pub mod ports;
