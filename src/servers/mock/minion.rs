use crate::common::{plus_encode, ConnectionType};
use crate::servers::mock::KafkaConnection;
use crate::{Config, LaunchRequest, RequestOption, RequestOptions, Server};
use derive_builder::Builder;
use dockertest::{waitfor, Source};
use std::collections::HashMap;

const IMAGE: &str = "quay.io/microcks/microcks-uber-async-minion";
const PORT: u32 = 8081;
const LOG_MSG: &str = "Profile prod activated";
const SOURCE: Source = Source::DockerHub;
const HANDLE_PREFIX: &str = "microcks-async-minion";

const PROTOCOLS_ENV: &str = "ASYNC_PROTOCOLS";
const KAFKA_TAG: &str = ",KAFKA";

/// Configuration for creating a Microcks async minion.
///
/// The minion is a sidecar to a Microcks instance: it picks up the AsyncAPI
/// definitions the instance holds and serves their mock endpoints itself,
/// WebSocket by default and brokered protocols when the matching connection
/// option is added. `microcks_host_port` names the instance to report to and
/// must be resolvable from inside the minion container; when the instance is
/// launched in the same test, feed it
/// [MicrocksServerConfig::host_port][crate::servers::mock::MicrocksServerConfig::host_port].
///
/// By default the minion listens on port 8081 for WebSocket connections. This
/// is exposed on the container by default, but the exposed port can be
/// controlled by setting the `port` field. The image reference itself can be
/// swapped through the `image` field.
#[derive(Clone, Default, Builder)]
#[builder(default)]
pub struct AsyncMinionServerConfig {
    #[builder(default = "Vec::new()")]
    pub args: Vec<String>,
    #[builder(default = "HashMap::new()")]
    pub env: HashMap<String, String>,
    #[builder(default = "crate::server::new_handle(HANDLE_PREFIX)")]
    pub handle: String,
    #[builder(default = "String::from(IMAGE)")]
    pub image: String,
    #[builder(default = "String::from(\"microcks:8080\")")]
    pub microcks_host_port: String,
    #[builder(default = "RequestOptions::new()")]
    pub options: RequestOptions,
    #[builder(default = "8081")]
    pub port: u32,
    #[builder(default = "30")]
    pub timeout: u16,
    #[builder(default = "String::from(\"latest\")")]
    pub version: String,
}

impl AsyncMinionServerConfig {
    pub fn builder() -> AsyncMinionServerConfigBuilder {
        AsyncMinionServerConfigBuilder::default()
    }

    /// Assembles the launch request described by this configuration, with all
    /// accumulated options applied in the order they were added.
    fn into_request(self) -> LaunchRequest {
        let ports = vec![(PORT, self.port)];

        let mut env = self.env;
        env.insert(String::from("MICROCKS_HOST_PORT"), self.microcks_host_port);

        let wait = Box::new(waitfor::MessageWait {
            message: LOG_MSG.into(),
            source: waitfor::MessageSource::Stdout,
            timeout: self.timeout,
        });

        let mut request = LaunchRequest {
            args: self.args,
            env,
            handle: self.handle,
            name: self.image,
            source: SOURCE,
            version: self.version,
            ports: Some(ports),
            wait: Some(wait),
            ..LaunchRequest::default()
        };

        self.options.apply(&mut request);

        request
    }
}

impl Config for AsyncMinionServerConfig {
    fn into_composition(self) -> dockertest::Composition {
        self.into_request().into()
    }

    fn handle(&self) -> &str {
        self.handle.as_str()
    }
}

/// Returns an option that connects the minion to a Kafka broker, enabling
/// Kafka mocking for the services it serves.
///
/// The KAFKA tag is appended to the minion's protocol list exactly once, so
/// reapplying the option cannot produce duplicate tags. The broker address
/// must be resolvable from inside the minion container.
pub fn with_kafka_connection(connection: KafkaConnection) -> RequestOption {
    RequestOption::new(move |request| {
        let mut protocols = request.env.get(PROTOCOLS_ENV).cloned().unwrap_or_default();
        if !protocols.contains(KAFKA_TAG) {
            protocols.push_str(KAFKA_TAG);
        }

        request.env.insert(String::from(PROTOCOLS_ENV), protocols);
        request.env.insert(
            String::from("KAFKA_BOOTSTRAP_SERVER"),
            connection.bootstrap_servers.clone(),
        );
    })
}

/// A running instance of a Microcks async minion.
///
/// The test body reaches WebSocket mock endpoints through
/// [ConnectionType::EXTERNAL] addresses; other containers in the same test
/// should use [ConnectionType::INTERNAL] ones.
pub struct AsyncMinionServer {
    pub external_port: u32,
    pub internal_port: u32,
    pub ip: String,
}

impl AsyncMinionServer {
    fn format_address(&self, host: &str, port: u32) -> String {
        format!("{}:{}", host, port)
    }

    /// The address serving WebSocket mock endpoints.
    pub fn address(&self, conn: ConnectionType) -> String {
        match conn {
            ConnectionType::EXTERNAL => self.format_address("localhost", self.external_port),
            ConnectionType::INTERNAL => self.format_address(self.ip.as_str(), self.internal_port),
        }
    }

    /// The WebSocket mock endpoint for one operation of a service mocked by
    /// Microcks.
    ///
    /// Operation names of the `VERB path` form keep only the path token, so
    /// `SUBSCRIBE pastry/orders` addresses the `pastry/orders` channel.
    /// Spaces in the service name and version are encoded as `+`.
    pub fn ws_mock_endpoint(
        &self,
        conn: ConnectionType,
        service: &str,
        version: &str,
        operation: &str,
    ) -> String {
        let operation = operation.split(' ').nth(1).unwrap_or(operation);

        format!(
            "ws://{}/api/ws/{}/{}/{}",
            self.address(conn),
            plus_encode(service),
            plus_encode(version),
            operation,
        )
    }
}

impl Server for AsyncMinionServer {
    type Config = AsyncMinionServerConfig;

    fn new(config: &Self::Config, container: &dockertest::RunningContainer) -> Self {
        AsyncMinionServer {
            external_port: config.port,
            internal_port: PORT,
            ip: container.ip().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{with_kafka_connection, AsyncMinionServer, AsyncMinionServerConfig, IMAGE};
    use crate::common::ConnectionType;
    use crate::servers::mock::KafkaConnection;
    use crate::{with_network, LaunchRequest, RequestOptions};

    fn minion() -> AsyncMinionServer {
        AsyncMinionServer {
            external_port: 49213,
            internal_port: 8081,
            ip: String::from("172.17.0.3"),
        }
    }

    #[test]
    fn test_ws_mock_endpoint() {
        assert_eq!(
            minion().ws_mock_endpoint(ConnectionType::EXTERNAL, "Pets", "v1", "subscribe"),
            "ws://localhost:49213/api/ws/Pets/v1/subscribe"
        );
        assert_eq!(
            minion().ws_mock_endpoint(ConnectionType::INTERNAL, "Pets", "v1", "subscribe"),
            "ws://172.17.0.3:8081/api/ws/Pets/v1/subscribe"
        );
    }

    #[test]
    fn test_ws_mock_endpoint_encodes_spaces() {
        assert_eq!(
            minion().ws_mock_endpoint(ConnectionType::EXTERNAL, "Order Service", "1.0 beta", "subscribe"),
            "ws://localhost:49213/api/ws/Order+Service/1.0+beta/subscribe"
        );
    }

    #[test]
    fn test_ws_mock_endpoint_strips_verb() {
        assert_eq!(
            minion().ws_mock_endpoint(
                ConnectionType::EXTERNAL,
                "Pastry",
                "0.1.0",
                "SUBSCRIBE pastry/orders"
            ),
            "ws://localhost:49213/api/ws/Pastry/0.1.0/pastry/orders"
        );

        let url =
            minion().ws_mock_endpoint(ConnectionType::EXTERNAL, "Orders", "0.1.0", "POST /orders");
        assert!(url.ends_with("/orders"));
    }

    #[test]
    fn test_kafka_connection_sets_env() {
        let mut request = LaunchRequest::default();
        with_kafka_connection(KafkaConnection::new("kafka:9092")).apply(&mut request);

        assert_eq!(
            request.env.get("ASYNC_PROTOCOLS"),
            Some(&String::from(",KAFKA"))
        );
        assert_eq!(
            request.env.get("KAFKA_BOOTSTRAP_SERVER"),
            Some(&String::from("kafka:9092"))
        );
    }

    #[test]
    fn test_kafka_connection_applies_once() {
        let mut request = LaunchRequest::default();
        let option = with_kafka_connection(KafkaConnection::new("kafka:9092"));
        option.apply(&mut request);
        option.apply(&mut request);

        assert_eq!(
            request.env.get("ASYNC_PROTOCOLS"),
            Some(&String::from(",KAFKA"))
        );
    }

    #[test]
    fn test_kafka_connection_extends_protocols() {
        let mut request = LaunchRequest::default();
        request
            .env
            .insert(String::from("ASYNC_PROTOCOLS"), String::from("WS"));
        with_kafka_connection(KafkaConnection::new("kafka:9092")).apply(&mut request);

        assert_eq!(
            request.env.get("ASYNC_PROTOCOLS"),
            Some(&String::from("WS,KAFKA"))
        );
    }

    #[test]
    fn test_request_binds_microcks_host_port() {
        let mut options = RequestOptions::new();
        options.add(with_network("backend"));

        let config = AsyncMinionServerConfig::builder()
            .microcks_host_port(String::from("microcks-main:8080"))
            .options(options)
            .build()
            .unwrap();

        let request = config.into_request();

        assert_eq!(
            request.env.get("MICROCKS_HOST_PORT"),
            Some(&String::from("microcks-main:8080"))
        );
        assert_eq!(request.networks, vec!["backend"]);
        assert_eq!(request.name, IMAGE);
        assert_eq!(request.ports, Some(vec![(8081, 8081)]));
    }
}
