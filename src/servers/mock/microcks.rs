use crate::common::{plus_encode, ConnectionType};
use crate::{Config, LaunchRequest, RequestOptions, Server};
use derive_builder::Builder;
use dockertest::{waitfor, Source};
use std::collections::HashMap;

const IMAGE: &str = "quay.io/microcks/microcks-uber";
const PORT: u32 = 8080;
const LOG_MSG: &str = "Started MicrocksApplication";
const SOURCE: Source = Source::DockerHub;
const HANDLE_PREFIX: &str = "microcks";

/// Configuration for creating a Microcks mock server.
///
/// By default the uber distribution listens on port 8080 for HTTP requests.
/// This is exposed on the container by default, but the exposed port can be
/// controlled by setting the `port` field. The image reference itself can be
/// swapped through the `image` field, and any accumulated `options` rework
/// the launch request right before it is handed to dockertest.
///
/// See the [Microcks documentation](https://microcks.io/documentation/) for
/// more information on the environment variables that can be used to
/// configure the server.
#[derive(Clone, Default, Builder)]
#[builder(default)]
pub struct MicrocksServerConfig {
    #[builder(default = "Vec::new()")]
    pub args: Vec<String>,
    #[builder(default = "HashMap::new()")]
    pub env: HashMap<String, String>,
    #[builder(default = "crate::server::new_handle(HANDLE_PREFIX)")]
    pub handle: String,
    #[builder(default = "String::from(IMAGE)")]
    pub image: String,
    #[builder(default = "RequestOptions::new()")]
    pub options: RequestOptions,
    #[builder(default = "8080")]
    pub port: u32,
    #[builder(default = "30")]
    pub timeout: u16,
    #[builder(default = "String::from(\"latest\")")]
    pub version: String,
}

impl MicrocksServerConfig {
    pub fn builder() -> MicrocksServerConfigBuilder {
        MicrocksServerConfigBuilder::default()
    }

    /// The address other containers in the same test use to reach this
    /// instance, valid before anything has started.
    ///
    /// Handles double as container names on the shared test network, so the
    /// address resolves as soon as the container is up. Feed this to
    /// [AsyncMinionServerConfig][crate::servers::mock::AsyncMinionServerConfig]
    /// when pairing the server with its async minion.
    pub fn host_port(&self) -> String {
        format!("{}:{}", self.handle, PORT)
    }
}

impl Config for MicrocksServerConfig {
    fn into_composition(self) -> dockertest::Composition {
        let ports = vec![(PORT, self.port)];

        let wait = Box::new(waitfor::MessageWait {
            message: LOG_MSG.into(),
            source: waitfor::MessageSource::Stdout,
            timeout: self.timeout,
        });

        let mut request = LaunchRequest {
            args: self.args,
            env: self.env,
            handle: self.handle,
            name: self.image,
            source: SOURCE,
            version: self.version,
            ports: Some(ports),
            wait: Some(wait),
            ..LaunchRequest::default()
        };

        self.options.apply(&mut request);

        request.into()
    }

    fn handle(&self) -> &str {
        self.handle.as_str()
    }
}

/// A running instance of a Microcks mock server.
///
/// REST, SOAP and GraphQL mocks are served over the single HTTP port. The
/// test body reaches the server through [ConnectionType::EXTERNAL] addresses;
/// other containers in the same test should use [ConnectionType::INTERNAL]
/// ones.
pub struct MicrocksServer {
    pub external_port: u32,
    pub internal_port: u32,
    pub ip: String,
}

impl MicrocksServer {
    fn format_address(&self, host: &str, port: u32) -> String {
        format!("{}:{}", host, port)
    }

    /// The address serving the Microcks API and mocks.
    pub fn address(&self, conn: ConnectionType) -> String {
        match conn {
            ConnectionType::EXTERNAL => self.format_address("localhost", self.external_port),
            ConnectionType::INTERNAL => self.format_address(self.ip.as_str(), self.internal_port),
        }
    }

    /// The HTTP URL serving the Microcks API and mocks.
    pub fn url(&self, conn: ConnectionType) -> String {
        format!("http://{}", self.address(conn))
    }

    /// The mock endpoint for a REST service mocked by this instance.
    pub fn rest_mock_endpoint(&self, conn: ConnectionType, service: &str, version: &str) -> String {
        format!(
            "{}/rest/{}/{}",
            self.url(conn),
            plus_encode(service),
            plus_encode(version)
        )
    }

    /// The mock endpoint for a SOAP service mocked by this instance.
    pub fn soap_mock_endpoint(&self, conn: ConnectionType, service: &str, version: &str) -> String {
        format!(
            "{}/soap/{}/{}",
            self.url(conn),
            plus_encode(service),
            plus_encode(version)
        )
    }

    /// The mock endpoint for a GraphQL service mocked by this instance.
    pub fn graphql_mock_endpoint(
        &self,
        conn: ConnectionType,
        service: &str,
        version: &str,
    ) -> String {
        format!(
            "{}/graphql/{}/{}",
            self.url(conn),
            plus_encode(service),
            plus_encode(version)
        )
    }
}

impl Server for MicrocksServer {
    type Config = MicrocksServerConfig;

    fn new(config: &Self::Config, container: &dockertest::RunningContainer) -> Self {
        MicrocksServer {
            external_port: config.port,
            internal_port: PORT,
            ip: container.ip().to_string(),
        }
    }
}
