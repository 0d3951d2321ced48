//! Provides the base abstractions used for creating and running servers.
use crate::common::rand_string;
use dockertest::waitfor::WaitFor;
use dockertest::{Composition, Image, RunningContainer, Source};
use std::collections::HashMap;
use std::sync::Arc;

const HANDLE_LENGTH: usize = 12;

/// A declarative description of a single container to launch.
///
/// A [Config] assembles one of these from its fields, lets any accumulated
/// [RequestOptions] rework it, and then converts it into the [Composition]
/// handed to dockertest. The request is plain data owned by the caller while
/// it is being configured; once the container has started, mutating it has no
/// effect.
pub struct LaunchRequest {
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub handle: String,
    pub name: String,
    pub source: Source,
    pub version: String,
    pub ports: Option<Vec<(u32, u32)>>,
    pub wait: Option<Box<dyn WaitFor>>,
    /// Networks to join beyond the test-scoped network dockertest provisions.
    /// dockertest resolves peers on the shared network by handle, so these
    /// only matter to engines with user-managed networks.
    pub networks: Vec<String>,
    /// Aliases per network name. A network holds a single alias at a time;
    /// setting a new one replaces the previous list.
    pub network_aliases: HashMap<String, Vec<String>>,
}

impl Default for LaunchRequest {
    fn default() -> Self {
        LaunchRequest {
            args: Vec::new(),
            env: HashMap::new(),
            handle: String::new(),
            name: String::new(),
            source: Source::DockerHub,
            version: String::from("latest"),
            ports: None,
            wait: None,
            networks: Vec::new(),
            network_aliases: HashMap::new(),
        }
    }
}

impl From<LaunchRequest> for Composition {
    fn from(request: LaunchRequest) -> Self {
        let image = Image::with_repository(&request.name)
            .source(request.source)
            .tag(&request.version);

        let mut composition = Composition::with_image(image)
            .with_container_name(request.handle)
            .with_env(request.env)
            .with_cmd(request.args);

        if let Some(ports) = request.ports {
            for (exported, host) in ports {
                composition.port_map(exported, host);
            }
        }

        match request.wait {
            Some(wait) => composition.with_wait_for(wait),
            None => composition,
        }
    }
}

/// A deferred mutation applied to a [LaunchRequest] before launch.
///
/// Options are cheap to clone and may be applied more than once; mutators
/// that append to shared state guard against reapplication themselves.
#[derive(Clone)]
pub struct RequestOption(Arc<dyn Fn(&mut LaunchRequest) + Send + Sync>);

impl RequestOption {
    /// Wraps a request mutator.
    pub fn new<F>(mutate: F) -> Self
    where
        F: Fn(&mut LaunchRequest) + Send + Sync + 'static,
    {
        RequestOption(Arc::new(mutate))
    }

    /// Applies this option to the given request.
    pub fn apply(&self, request: &mut LaunchRequest) {
        (self.0)(request)
    }
}

/// An ordered collection of [RequestOptions][RequestOption] waiting to be
/// applied.
///
/// Options run in insertion order. Nothing is deduplicated or validated on
/// the way in: when two options write the same environment key, the one
/// added last wins.
#[derive(Clone, Default)]
pub struct RequestOptions {
    list: Vec<RequestOption>,
}

impl RequestOptions {
    /// Creates an empty collection.
    pub fn new() -> Self {
        RequestOptions { list: Vec::new() }
    }

    /// Appends an option.
    pub fn add(&mut self, option: RequestOption) {
        self.list.push(option);
    }

    /// Applies every option to the request, in the order they were added.
    pub fn apply(&self, request: &mut LaunchRequest) {
        for option in &self.list {
            option.apply(request);
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }
}

/// Returns an option that sets one environment variable on the request.
///
/// An existing value for the key is overwritten.
pub fn with_env(key: &str, value: &str) -> RequestOption {
    let key = key.to_string();
    let value = value.to_string();
    RequestOption::new(move |request| {
        request.env.insert(key.clone(), value.clone());
    })
}

/// Returns an option that attaches the container to the named network.
pub fn with_network(network: &str) -> RequestOption {
    let network = network.to_string();
    RequestOption::new(move |request| {
        request.networks.push(network.clone());
    })
}

/// Returns an option that sets the container's alias on the named network.
///
/// A network carries one alias at a time: aliasing a network the request
/// already has an alias for replaces it.
pub fn with_network_alias(network: &str, alias: &str) -> RequestOption {
    let network = network.to_string();
    let alias = alias.to_string();
    RequestOption::new(move |request| {
        request
            .network_aliases
            .insert(network.clone(), vec![alias.clone()]);
    })
}

/// Implemented by configurations which can produce a [Composition] for
/// launching a server container.
pub trait Config: Clone + Send + Sync {
    /// Consumes the configuration and produces the [Composition] handed to
    /// dockertest.
    fn into_composition(self) -> Composition;

    /// The handle used to look this container up once it is running.
    fn handle(&self) -> &str;
}

/// A running server backed by a container brought up from a [Config].
pub trait Server {
    type Config: Config + 'static;

    /// Builds the server value from its configuration and the running
    /// container, binding addresses and ports.
    fn new(config: &Self::Config, container: &RunningContainer) -> Self;
}

/// Generates a unique handle with the given prefix.
///
/// Handles double as container names on the test network, and dockertest
/// requires those to be unique across concurrently running tests.
pub fn new_handle(prefix: &str) -> String {
    format!("{}-{}", prefix, rand_string(HANDLE_LENGTH))
}

#[cfg(test)]
mod tests {
    use super::{with_env, with_network, with_network_alias, LaunchRequest, RequestOptions};

    #[test]
    fn test_env_last_writer_wins() {
        let mut options = RequestOptions::new();
        options.add(with_env("ASYNC_PROTOCOLS", "WS"));
        options.add(with_env("ASYNC_PROTOCOLS", "MQTT"));

        let mut request = LaunchRequest::default();
        options.apply(&mut request);

        assert_eq!(
            request.env.get("ASYNC_PROTOCOLS"),
            Some(&String::from("MQTT"))
        );
    }

    #[test]
    fn test_networks_accumulate() {
        let mut request = LaunchRequest::default();
        with_network("frontend").apply(&mut request);
        with_network("backend").apply(&mut request);

        assert_eq!(request.networks, vec!["frontend", "backend"]);
    }

    #[test]
    fn test_network_alias_overwrites() {
        let mut request = LaunchRequest::default();
        with_network_alias("backend", "microcks").apply(&mut request);
        with_network_alias("backend", "mocks").apply(&mut request);

        assert_eq!(
            request.network_aliases.get("backend"),
            Some(&vec![String::from("mocks")])
        );
    }

    #[test]
    fn test_options_preserve_order() {
        let mut options = RequestOptions::new();
        assert!(options.is_empty());

        options.add(with_env("A", "1"));
        options.add(with_network("backend"));
        options.add(with_env("A", "2"));
        assert_eq!(options.len(), 3);

        let mut request = LaunchRequest::default();
        options.apply(&mut request);

        assert_eq!(request.env.get("A"), Some(&String::from("2")));
        assert_eq!(request.networks, vec!["backend"]);
    }

    #[test]
    fn test_new_handle() {
        let handle = super::new_handle("microcks");
        assert!(handle.starts_with("microcks-"));
        assert_eq!(handle.len(), "microcks-".len() + 12);
    }
}
