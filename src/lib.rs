//! A small and safe library for browsing services via Multicast DNS-SD
//! (Service Discovery).
//!
//! This library implements the querying side of mDNS only: it finds services
//! advertised on the local network and resolves them into connectable
//! endpoints (hostname, port and IP addresses). It does not register or
//! announce services, and it has no dependency on any async runtime.
//!
//! [`DiscoveryEngine::new`] spawns one background thread that multiplexes a
//! UDP multicast socket per usable local interface, parses incoming resource
//! records into a TTL-annotated cache, and walks the DNS-SD dependency chain
//! (PTR → SRV → A/AAAA) to keep a resolved snapshot up to date. Records are
//! re-queried shortly *before* they expire, so an active service does not
//! flicker out of the list between refreshes.
//!
//! # Usage
//!
//! ```no_run
//! use mdns_discovery::DiscoveryEngine;
//! use std::time::Duration;
//!
//! let engine = DiscoveryEngine::new("_my-service._tcp.local.").unwrap();
//!
//! // The snapshot accessor never blocks on network I/O and can be called
//! // from any thread, e.g. once per UI refresh tick.
//! std::thread::sleep(Duration::from_secs(3));
//! for service in engine.get_services() {
//!     println!(
//!         "{} at {}:{} {:?}",
//!         service.name, service.hostname, service.port, service.addresses
//!     );
//! }
//!
//! engine.stop();
//! ```
//!
//! # Limitations
//!
//! This implementation is based on the following RFCs:
//! - mDNS:   [RFC 6762](https://tools.ietf.org/html/rfc6762)
//! - DNS-SD: [RFC 6763](https://tools.ietf.org/html/rfc6763)
//! - DNS:    [RFC 1035](https://tools.ietf.org/html/rfc1035)
//!
//! We focus on the browsing use case and currently have these limitations:
//! - Only the querier side is supported, not the responder side.
//! - TXT records are not surfaced to the caller.
//! - Local interfaces are enumerated once at construction. If an interface
//!   appears or disappears later, a new engine must be created to pick up
//!   the change.

#![forbid(unsafe_code)]

// log for logging (optional).
#[cfg(feature = "logging")]
pub(crate) use log;

#[cfg(not(feature = "logging"))]
#[macro_use]
mod log {
    macro_rules! debug {
        ($($arg:expr),*) => {
            {
                let _ = ($($arg),*); // avoid warnings about unused variables.
            }
        };
    }

    macro_rules! trace {
        ($($arg:expr),*) => {
            {
                let _ = ($($arg),*);
            }
        };
    }
}

mod discovery;
mod dns_cache;
mod dns_parser;
mod error;

pub use discovery::{DiscoveryEngine, Service};
pub use dns_parser::{DnsAnswer, DnsIncoming, DnsOutgoing, RRType, RecordData};
pub use error::{Error, Result};
