use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::iter;

/// Selects which side of the container boundary an address should target.
///
/// `EXTERNAL` addresses are reachable from the host running the tests
/// (`localhost` plus the mapped port). `INTERNAL` addresses are reachable
/// from other containers in the same test (container IP plus the port the
/// service listens on).
pub enum ConnectionType {
    EXTERNAL,
    INTERNAL,
}

/// Generates a random string of characters of the given length.
pub fn rand_string(length: usize) -> String {
    let mut rng = thread_rng();
    iter::repeat(())
        .map(|()| rng.sample(Alphanumeric))
        .map(char::from)
        .take(length)
        .collect()
}

/// Encodes a service or version name for use as a Microcks URL path segment.
///
/// Microcks addresses mocks by the service name and version taken verbatim
/// from the API contract, with spaces encoded as `+`.
pub fn plus_encode(segment: &str) -> String {
    segment.replace(' ', "+")
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_rand_string() {
        let result = super::rand_string(10);
        assert_eq!(result.len(), 10);
    }

    #[test]
    fn test_plus_encode() {
        assert_eq!(super::plus_encode("Order Service API"), "Order+Service+API");
        assert_eq!(super::plus_encode("v1"), "v1");
    }
}
