/// Contains [Servers][crate::Server] for mocking APIs with Microcks.
pub mod kafka;
pub mod microcks;
pub mod minion;

pub use kafka::KafkaConnection;
pub use microcks::{MicrocksServer, MicrocksServerConfig};
pub use minion::{with_kafka_connection, AsyncMinionServer, AsyncMinionServerConfig};
