//! Message handling - Event-driven message processing

pub mod dispatcher;
pub mod outbound;
pub mod parser;
pub mod pipe;

pub use dispatcher::CommandDispatcher;
pub use outbound::OutgoingText;
pub use parser::ParsedCommand;
pub use pipe::{Filtered, Handler, Pipe};
