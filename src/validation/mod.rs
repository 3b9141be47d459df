//! Identifier checks run by every handler before any collaborator is touched.
//!
//! Namespaces follow the RFC 1123 label grammar, resource names the RFC 1123
//! subdomain grammar, matching what the cluster API server itself enforces.


use crate::constants::MAX_NAMESPACE_LEN;
use crate::constants::MAX_RESOURCE_NAME_LEN;

/// Returns true if `namespace` is a valid RFC 1123 label.
pub fn validate_namespace(namespace: &str) -> bool {
    namespace.len() <= MAX_NAMESPACE_LEN && is_dns1123_label(namespace)
}

/// Returns true if `name` is a valid RFC 1123 subdomain.
pub fn validate_resource_name(name: &str) -> bool {
    name.len() <= MAX_RESOURCE_NAME_LEN
        && name
            .split('.')
            .all(|label| label.len() <= MAX_NAMESPACE_LEN && is_dns1123_label(label))
}

/// `[a-z0-9]([-a-z0-9]*[a-z0-9])?`
fn is_dns1123_label(label: &str) -> bool {
    let bytes = label.as_bytes();
    let (Some(first), Some(last)) = (bytes.first(), bytes.last()) else {
        return false;
    };

    is_lower_alnum(*first)
        && is_lower_alnum(*last)
        && bytes.iter().all(|b| is_lower_alnum(*b) || *b == b'-')
}

fn is_lower_alnum(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit()
}
