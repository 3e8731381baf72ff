pub mod command_spec;
pub mod error;
pub mod session;
pub mod transport;
pub mod value;
pub mod xml;

// Re-export main types
pub use command_spec::{CommandSpec, DefaultValue, ParamDef, ParamSpec};
pub use error::Error;
pub use session::{Console, Session, ERROR_NAMESPACE};
pub use transport::{HttpTransport, Transport, TransportError};
pub use value::Value;
pub use xml::{Fault, Response};

// Re-export async_trait for custom Transport implementations
pub use async_trait;
