// Domain layer: step model and the ports the bootstrapper drives.

pub mod model;
pub mod ports;
