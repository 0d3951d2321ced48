/// Connection settings for a Kafka broker reachable from the test network.
///
/// Consumed by
/// [with_kafka_connection][crate::servers::mock::with_kafka_connection] to
/// point the async minion at the broker it should publish mock messages on.
/// The address must be resolvable from inside the minion container, not from
/// the host running the tests.
#[derive(Clone, Debug)]
pub struct KafkaConnection {
    pub bootstrap_servers: String,
}

impl KafkaConnection {
    pub fn new(bootstrap_servers: &str) -> Self {
        KafkaConnection {
            bootstrap_servers: bootstrap_servers.to_string(),
        }
    }
}
