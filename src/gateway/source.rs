// Vaultgate — Source Address Resolution
//
// Identifies the client behind a request for rate limiting. The peer socket
// address is authoritative unless the gate runs behind a trusted proxy, in
// which case the first `X-Forwarded-For` hop is used.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::{Extensions, HeaderMap};

const FORWARDED_FOR: &str = "x-forwarded-for";

/// Address used when neither the peer nor a trusted header is known.
const UNKNOWN_SOURCE: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Resolve the client address of a request.
///
/// IPv4-mapped IPv6 addresses are folded to plain IPv4 so one client cannot
/// appear under two keys.
pub fn client_address(
    headers: &HeaderMap,
    extensions: &Extensions,
    trust_forwarded_for: bool,
) -> IpAddr {
    let forwarded = trust_forwarded_for
        .then(|| forwarded_for(headers))
        .flatten();

    let peer = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    forwarded
        .or(peer)
        .unwrap_or(UNKNOWN_SOURCE)
        .to_canonical()
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get(FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

// ─── Tests ───────────────────────────────────────────────────────────────────
