mod module;
mod parameter;

pub use module::Module;
pub use parameter::{Parameter, ParameterBuilder, ParameterError};
