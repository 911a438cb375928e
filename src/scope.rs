use crate::canonical::is_ip_hostname;

/// Scope root for a scan target. The provided host *is* the apex: no
/// public-suffix logic, so roots like "edu.jo" or "co.uk" never leak in as
/// scope. IPv4 literals and host:port inputs are kept verbatim.
pub fn apex_of(host: &str) -> String {
    host.trim().to_lowercase()
}

/// Whether `host` (no port) falls inside the apex: equal to it, or a
/// subdomain of it. IPv4 and host:port apexes require exact equality.
pub fn host_in_scope(host: &str, apex: &str) -> bool {
    let h = host.trim().to_lowercase();
    let apex = apex.trim().to_lowercase();
    if h.is_empty() || apex.is_empty() {
        return false;
    }
    if is_ip_hostname(&apex) || apex.contains(':') {
        return h == apex;
    }
    h == apex || h.ends_with(&format!(".{apex}"))
}
