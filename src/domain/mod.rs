// Domain layer: records, outcomes and the ports the import core talks through.

pub mod model;
pub mod ports;
