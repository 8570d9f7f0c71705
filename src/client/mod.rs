pub mod connection;
pub mod location;
pub mod pipeline;

pub use connection::Connection;
pub use location::Location;
pub use pipeline::Pipeline;
