use std::fmt;

/// The (host, port) identity under which connections are grouped in the
/// pool. Immutable and hashable; multiple connections may exist per key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolKey {
    host: String,
    port: u16,
}

impl PoolKey {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_owned(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equal_destinations_are_one_key() {
        let mut keys = HashSet::new();
        keys.insert(PoolKey::new("localhost", 9090));
        keys.insert(PoolKey::new("localhost", 9090));
        keys.insert(PoolKey::new("localhost", 9091));
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn displays_as_host_colon_port() {
        assert_eq!(PoolKey::new("broker-1", 7070).to_string(), "broker-1:7070");
    }
}
