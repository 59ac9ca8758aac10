//! UDP socket setup for bridge discovery
//!
//! Discovery probes go to each interface's directed broadcast address, not to
//! 255.255.255.255 alone: on multi-homed hosts the OS routes the limited
//! broadcast out a single interface, which hides bridges on the others.

use std::net::{Ipv4Addr, SocketAddr};

use comfoconnect_core::{ComfoError, ComfoResult};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;

/// Create the discovery socket: broadcast-capable, bound to an ephemeral
/// port so bridge replies come straight back to us.
pub fn broadcast_socket() -> ComfoResult<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    socket.set_nonblocking(true)?;
    let bind_addr: SocketAddr = (Ipv4Addr::UNSPECIFIED, 0).into();
    socket.bind(&bind_addr.into())?;
    Ok(UdpSocket::from_std(socket.into())?)
}

/// Directed broadcast addresses of all usable IPv4 interfaces.
///
/// An interface qualifies when it is up, broadcast-capable and not loopback.
/// The directed broadcast is computed from the address and netmask. Returns
/// `NoInterfaces` when the interface list cannot be read at all; an empty
/// list (no qualifying interface) is left to the caller to handle.
pub fn broadcast_addresses() -> ComfoResult<Vec<Ipv4Addr>> {
    let mut addresses: Vec<Ipv4Addr> = Vec::new();

    let mut ifap: *mut libc::ifaddrs = std::ptr::null_mut();
    // SAFETY: getifaddrs fills `ifap` with a list we walk read-only below and
    // release with freeifaddrs exactly once.
    if unsafe { libc::getifaddrs(&mut ifap) } != 0 {
        return Err(ComfoError::NoInterfaces);
    }

    let mut cursor = ifap;
    while !cursor.is_null() {
        // SAFETY: cursor is a valid list node until freeifaddrs.
        let entry = unsafe { &*cursor };
        cursor = entry.ifa_next;

        let flags = entry.ifa_flags;
        let required = (libc::IFF_UP | libc::IFF_BROADCAST) as u32;
        if flags & required != required || flags & libc::IFF_LOOPBACK as u32 != 0 {
            continue;
        }
        let Some(address) = ipv4_of(entry.ifa_addr) else {
            continue;
        };
        let Some(netmask) = ipv4_of(entry.ifa_netmask) else {
            continue;
        };

        let broadcast =
            Ipv4Addr::from(u32::from(address) | !u32::from(netmask));
        if !addresses.contains(&broadcast) {
            addresses.push(broadcast);
        }
    }

    // SAFETY: ifap came from getifaddrs and has not been freed yet.
    unsafe { libc::freeifaddrs(ifap) };

    Ok(addresses)
}

fn ipv4_of(sockaddr: *mut libc::sockaddr) -> Option<Ipv4Addr> {
    if sockaddr.is_null() {
        return None;
    }
    // SAFETY: non-null sockaddr from getifaddrs; only reinterpreted as
    // sockaddr_in after the family check.
    unsafe {
        if (*sockaddr).sa_family != libc::AF_INET as libc::sa_family_t {
            return None;
        }
        let sin = &*(sockaddr as *const libc::sockaddr_in);
        Some(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broadcast_socket_binds_ephemeral() {
        let socket = broadcast_socket().unwrap();
        let addr = socket.local_addr().unwrap();
        assert_ne!(addr.port(), 0);
    }

    #[test]
    fn test_broadcast_addresses_exclude_loopback() {
        let addresses = broadcast_addresses().unwrap();
        assert!(addresses.iter().all(|a| !a.is_loopback()));
        // No duplicates.
        let mut deduped = addresses.clone();
        deduped.dedup();
        assert_eq!(addresses, deduped);
    }
}
