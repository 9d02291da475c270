// logdeck-api: Async client for the container inventory and log stream endpoints

pub mod error;
pub mod inventory;
pub mod stream;
pub mod transport;

pub use error::Error;
pub use inventory::{ContainerSummary, InventoryClient};
pub use stream::{LogPayload, LogStream, StreamEvent};
pub use transport::TransportConfig;
