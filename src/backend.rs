use crate::belief::Belief;
use crate::context::WebServerTable;

/// Extract the backend server type from a raw HTTP response body. Tries a
/// `Server:` header line first, then two Microsoft-specific substrings, then
/// a plain case-insensitive scan for the remaining five known server names,
/// in that order.
pub fn extract_backend_type(body: &str) -> String {
    if body.contains("Server:") {
        for line in body.split('\n') {
            if let Some(rest) = line.strip_prefix("Server:") {
                return rest.trim().to_lowercase();
            }
        }
    } else {
        if body.contains("Microsoft-HTTPAPI") || body.contains("Microsoft-IIS") {
            return "iis".to_string();
        }
        const SERVER_TYPES: [&str; 5] = ["nginx", "apache", "caddy", "tomcat", "lighttpd"];
        let lower = body.to_lowercase();
        for server in SERVER_TYPES {
            if lower.contains(server) {
                return server.to_string();
            }
        }
    }
    String::new()
}

/// Update the web-server table from an extracted backend type: any key
/// contained in `backend_type` moves its candidate to `Possibly`, every
/// other candidate becomes `DefinitelyNot`. A no-op on an empty
/// `backend_type`.
pub fn update_web_server_state(backend_type: &str, table: &WebServerTable) {
    if backend_type.is_empty() {
        return;
    }
    apply(backend_type, "nginx", &table.nginx);
    apply(backend_type, "apache", &table.apache);
    apply(backend_type, "caddy", &table.caddy);
    apply(backend_type, "tomcat", &table.tomcat);
    apply(backend_type, "lighttpd", &table.lighttpd);
    apply(backend_type, "microsoft", &table.iis);
}

fn apply(backend_type: &str, key: &str, cell: &crate::belief::BeliefCell) {
    if backend_type.contains(key) {
        cell.update(Belief::Possibly);
    } else {
        cell.update(Belief::DefinitelyNot);
    }
}
