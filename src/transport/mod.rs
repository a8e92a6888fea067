// Transport module
// The controller state machine and the actor that serializes access to it

pub mod actor;
pub mod controller;
pub mod state;

pub use actor::{TransportCommand, TransportHandle};
pub use controller::{TransportController, TransportError};
pub use state::{PlayerState, TransportSnapshot};
