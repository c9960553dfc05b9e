//! Paths on the resolution server, relative to the transport base URL.
//!
//! Segments are passed through unencoded; the transport percent-encodes
//! them when it assembles the final URL.

pub fn resolve_definition(namespace: &str) -> String {
    format!("namespaces/{namespace}/resolveDefinition")
}
