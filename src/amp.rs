pub mod chain;
pub mod params;
pub mod stages;

pub use chain::AmplifierChain;
pub use params::{ParamId, ParamSnapshot, Parameters};
pub use stages::waveshaper::AmpType;
