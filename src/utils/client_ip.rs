use actix_web::dev::ConnectionInfo;

/// Resolve the client IP used to key visit records and rate limits.
///
/// Forwarding headers are only honoured behind a trusted proxy; otherwise a
/// client could pick its own key by sending `X-Forwarded-For`.
pub fn client_ip(info: &ConnectionInfo, trust_proxy: bool) -> String {
    let addr = if trust_proxy {
        info.realip_remote_addr()
    } else {
        info.peer_addr()
    };
    addr.map(strip_port).unwrap_or("unknown").to_string()
}

// Forwarded headers may carry "ip:port" or "[v6]:port".
fn strip_port(addr: &str) -> &str {
    if let Some(rest) = addr.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match addr.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') && port.parse::<u16>().is_ok() => host,
        _ => addr,
    }
}
