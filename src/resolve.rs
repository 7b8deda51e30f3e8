//! Destination parsing, forward resolution, and reverse-DNS display names.

use std::fmt::Write as _;
use std::io;
use std::net::{IpAddr, SocketAddr};

use tracing::{debug, warn};
use trust_dns_resolver::proto::rr::{RData, RecordType};
use trust_dns_resolver::TokioAsyncResolver;

use crate::error::{ProbeError, Result};

/// Split `host`, `host:port`, `[v6]:port` or a bare IPv6 literal.
pub fn parse_destination(input: &str) -> (String, Option<u16>) {
    let input = input.trim();
    if let Some(rest) = input.strip_prefix('[') {
        if let Some((host, tail)) = rest.split_once(']') {
            let port = tail.strip_prefix(':').and_then(|p| p.parse().ok());
            return (host.to_string(), port);
        }
    }
    // more than one colon means an unbracketed IPv6 literal
    if input.matches(':').count() == 1 {
        if let Some((host, port)) = input.rsplit_once(':') {
            if let Ok(port) = port.parse::<u16>() {
                return (host.to_string(), Some(port));
            }
        }
    }
    (input.to_string(), None)
}

/// Resolve `destination` and keep the first address only.
pub async fn resolve_first(destination: &str, port: u16) -> Result<SocketAddr> {
    if let Ok(ip) = destination.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    let mut addrs = tokio::net::lookup_host((destination, port))
        .await
        .map_err(|source| ProbeError::Resolve {
            destination: destination.to_string(),
            source,
        })?;
    let first = addrs.next().ok_or_else(|| ProbeError::NoAddress {
        destination: destination.to_string(),
    })?;
    debug!(%destination, addr = %first, "resolved destination");
    Ok(first)
}

/// Query name for a PTR lookup of `ip`.
///
/// IPv4 octets are reversed under `in-addr.arpa`; IPv6 addresses are
/// expanded to 32 nibbles and reversed under `ip6.arpa`.
pub fn reverse_query_name(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let [a, b, c, d] = v4.octets();
            format!("{d}.{c}.{b}.{a}.in-addr.arpa.")
        }
        IpAddr::V6(v6) => {
            let mut name = String::with_capacity(72);
            for byte in v6.octets().iter().rev() {
                let _ = write!(name, "{:x}.{:x}.", byte & 0x0f, byte >> 4);
            }
            name.push_str("ip6.arpa.");
            name
        }
    }
}

/// Issue the PTR query for `ip` through the system-configured resolver.
pub async fn reverse_lookup(ip: IpAddr) -> io::Result<String> {
    let resolver = TokioAsyncResolver::tokio_from_system_conf().map_err(io::Error::other)?;
    let query = reverse_query_name(ip);
    let lookup = resolver
        .lookup(query.as_str(), RecordType::PTR)
        .await
        .map_err(io::Error::other)?;
    lookup
        .iter()
        .find_map(|rdata| match rdata {
            RData::PTR(ptr) => Some(ptr.to_string().trim_end_matches('.').to_string()),
            _ => None,
        })
        .filter(|name| !name.is_empty())
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no PTR record for {query}")))
}

/// Text shown for the destination: the literal IP, or its PTR name when
/// `print_fqdn` is set. A failed lookup falls back to the IP and returns a
/// warning for the caller to forward.
pub async fn display_name(ip: IpAddr, print_fqdn: bool) -> (String, Option<String>) {
    if !print_fqdn {
        return (ip.to_string(), None);
    }
    match reverse_lookup(ip).await {
        Ok(name) => (name, None),
        Err(e) => {
            warn!(%ip, error = %e, "reverse lookup failed, using literal address");
            (
                ip.to_string(),
                Some(format!("Unable to resolve FQDN for {ip}: {e}")),
            )
        }
    }
}
