pub mod codec;
pub mod command;
pub mod errors;
pub mod frame;

pub use codec::*;
pub use command::*;
pub use errors::*;
pub use frame::*;
