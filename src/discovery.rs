//! The mDNS discovery engine: a browsing-only DNS-SD client.
//!
//! One background thread owns every mutable piece of state: the per-interface
//! multicast sockets, the record cache and the query tracker. The only data
//! shared with caller threads is the published snapshot of resolved services,
//! guarded by a mutex and replaced wholesale once per loop iteration.
//!
//! Some naming conventions in this source code:
//!
//! `ty_domain` refers to service type together with domain name, i.e.
//! <service>.<domain>. Every <service> consists of two labels: the service
//! itself and "_udp." or "_tcp.". See RFC 6763 section 7 Service Names.
//!     for example: `_my-service._udp.local.`
//!
//! `fullname` refers to a full Service Instance Name, i.e.
//! <instance>.<service>.<domain>
//!     for example: `my_home._my-service._udp.local.`

#[cfg(feature = "logging")]
use crate::log::{debug, trace};
use crate::{
    dns_cache::{DnsCache, QueryTracker},
    dns_parser::{DnsIncoming, DnsOutgoing, RRType, RecordData, FLAGS_QR_QUERY, MAX_MSG_ABSOLUTE},
    error::{Error, Result},
};
use if_addrs::{IfAddr, Interface};
use mio::{net::UdpSocket as MioUdpSocket, Events, Interest, Poll, Token};
use socket2::Socket;
use std::{
    cmp,
    net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6, UdpSocket},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
    thread,
    time::{Duration, Instant},
};

/// A simple macro to report all kinds of errors.
macro_rules! e_fmt {
  ($($arg:tt)+) => {
      Error::Msg(format!($($arg)+))
  };
}

const MDNS_PORT: u16 = 5353;
const GROUP_ADDR_V4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);
const GROUP_ADDR_V6: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0xfb);
const LOOPBACK_V4: Ipv4Addr = Ipv4Addr::new(127, 0, 0, 1);

/// The poll token reserved for the wake-up (signal) socket. Interface
/// sockets use their index plus one.
const SIGNAL_TOKEN: Token = Token(0);

/// Bounds for the adaptive poll timeout of the discovery loop.
const POLL_MIN_TIME: Duration = Duration::from_millis(500);
const POLL_MAX_TIME: Duration = Duration::from_secs(10);

/// An SRV record is re-queried once its remaining TTL drops below this.
const SRV_REQUERY_THRESHOLD: Duration = Duration::from_secs(10);

/// The loop wakes up this long before an SRV record expires, so the refresh
/// lands while the record is still valid and the service never flickers out
/// of the published list.
const SRV_REQUERY_MARGIN: Duration = Duration::from_secs(9);

/// Same idea for A/AAAA records, with a tighter window.
const ADDR_REQUERY_THRESHOLD: Duration = Duration::from_secs(5);
const ADDR_REQUERY_MARGIN: Duration = Duration::from_secs(4);

/// One resolved service instance, ready to connect to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    /// Instance name with the service-type suffix stripped,
    /// e.g. `"Living Room"` for `Living Room._my-service._tcp.local.`.
    pub name: String,

    /// Target hostname from the SRV record, with a trailing `.local.`
    /// or `.` stripped.
    pub hostname: String,

    /// Port from the SRV record.
    pub port: u16,

    /// All known IPv4 and IPv6 addresses of the host. May be empty while
    /// address resolution is still in flight.
    pub addresses: Vec<IpAddr>,

    /// The instant at which this entry should be considered stale.
    /// It mirrors the SRV record's expiry.
    pub ttl: Instant,
}

/// A handle to the discovery thread.
///
/// Construction spawns the thread and starts browsing immediately;
/// [`get_services`](Self::get_services) can be called from any thread at any
/// rate. Dropping the handle (or calling [`stop`](Self::stop)) shuts the
/// thread down and closes all sockets.
pub struct DiscoveryEngine {
    /// Cooperative cancellation flag, checked once per loop iteration.
    quit: Arc<AtomicBool>,

    /// The published snapshot, shared with the discovery thread.
    services: Arc<Mutex<Vec<Service>>>,

    /// Send to this addr to wake up a blocked poll.
    ///
    /// The discovery thread listens on this addr together with the mDNS
    /// sockets. Any datagram arriving here is drained and discarded; its
    /// only purpose is to shorten a pending wait.
    signal_addr: SocketAddr,

    handle: Option<thread::JoinHandle<()>>,
}

impl DiscoveryEngine {
    /// Creates a new engine browsing for `service_type` and spawns its
    /// discovery thread.
    ///
    /// `service_type` must end with a valid mDNS domain: '._tcp.local.'
    /// or '._udp.local.'.
    ///
    /// Failure to open a socket on some (or all) network interfaces is not
    /// an error: the engine degrades to finding nothing rather than failing
    /// construction. Only the wake-up socket, the poller and the thread
    /// spawn can fail here.
    pub fn new(service_type: &str) -> Result<Self> {
        check_domain_suffix(service_type)?;

        // Use port 0 to let the system assign a random available port.
        let signal_addr = SocketAddrV4::new(LOOPBACK_V4, 0);
        let signal_sock = UdpSocket::bind(signal_addr)
            .map_err(|e| e_fmt!("failed to create signal socket: {}", e))?;

        // Get the socket with the OS chosen port.
        let signal_addr = signal_sock
            .local_addr()
            .map_err(|e| e_fmt!("failed to get signal socket addr: {}", e))?;

        // Must be nonblocking so we can listen to it together with the
        // mDNS sockets.
        signal_sock
            .set_nonblocking(true)
            .map_err(|e| e_fmt!("failed to set nonblocking for signal socket: {}", e))?;

        let poller = Poll::new().map_err(|e| e_fmt!("failed to create mio Poll: {e}"))?;

        let quit = Arc::new(AtomicBool::new(false));
        let services = Arc::new(Mutex::new(Vec::new()));

        let ty_domain = service_type.to_string();
        let thread_quit = Arc::clone(&quit);
        let thread_services = Arc::clone(&services);
        let handle = thread::Builder::new()
            .name("mDNS-discovery".to_string())
            .spawn(move || {
                let browser = Browser::new(
                    ty_domain,
                    MioUdpSocket::from_std(signal_sock),
                    poller,
                    thread_services,
                    thread_quit,
                );
                browser.run();
            })
            .map_err(|e| e_fmt!("thread builder failed to spawn: {}", e))?;

        Ok(Self {
            quit,
            services,
            signal_addr,
            handle: Some(handle),
        })
    }

    /// Returns a copy of the current resolved snapshot, with entries whose
    /// TTL has already passed pruned out.
    ///
    /// This never blocks on network I/O. Readers may see the same snapshot
    /// twice or miss an intermediate one; the list is eventually consistent.
    pub fn get_services(&self) -> Vec<Service> {
        let now = Instant::now();
        let mut snapshot = self
            .services
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        snapshot.retain(|service| service.ttl > now);
        snapshot
    }

    /// Stops the discovery thread and tears down all sockets.
    ///
    /// A thread blocked in poll is woken via the signal socket, so shutdown
    /// takes one packet-processing iteration rather than a full poll
    /// timeout. Dropping the engine without calling `stop` performs the
    /// same teardown.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        let handle = match self.handle.take() {
            Some(handle) => handle,
            None => return,
        };

        self.quit.store(true, Ordering::Release);

        // Wake up a pending poll so the flag is seen promptly.
        let bind_addr = SocketAddrV4::new(LOOPBACK_V4, 0);
        match UdpSocket::bind(bind_addr) {
            Ok(sock) => {
                if let Err(e) = sock.send_to(&[0u8], self.signal_addr) {
                    debug!("failed to send wake-up signal: {}", e);
                }
            }
            Err(e) => debug!("failed to create socket to send wake-up signal: {}", e),
        }

        if handle.join().is_err() {
            debug!("discovery thread exited with a panic");
        }
    }
}

impl Drop for DiscoveryEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The state owned by the discovery thread.
struct Browser {
    ty_domain: String,

    /// Local interfaces with sockets to recv/send on these interfaces.
    /// Socket `i` is registered in the poller with token `i + 1`.
    intf_socks: Vec<(Interface, MioUdpSocket)>,

    /// Wakes up the poll when a caller wants attention.
    signal_sock: MioUdpSocket,

    /// Waits for incoming packets.
    poller: Poll,

    /// Received DNS records.
    cache: DnsCache,

    /// Queries sent recently, to suppress repeats.
    queries: QueryTracker,

    /// The published snapshot, shared with caller threads.
    services: Arc<Mutex<Vec<Service>>>,

    quit: Arc<AtomicBool>,
}

impl Browser {
    fn new(
        ty_domain: String,
        signal_sock: MioUdpSocket,
        poller: Poll,
        services: Arc<Mutex<Vec<Service>>>,
        quit: Arc<AtomicBool>,
    ) -> Self {
        let mut intf_socks = Vec::new();
        for intf in my_ip_interfaces() {
            match new_socket_bind(&intf) {
                Ok(sock) => {
                    debug!("browsing on interface {}: {}", &intf.name, &intf.ip());
                    intf_socks.push((intf, sock));
                }
                // Non-fatal: the engine operates with a subset of
                // interfaces, including none.
                Err(e) => debug!("bind a socket to {}: {}. Skipped.", &intf.ip(), e),
            }
        }

        if intf_socks.is_empty() {
            debug!("no usable network interfaces: discovery will find nothing");
        }

        Self {
            ty_domain,
            intf_socks,
            signal_sock,
            poller,
            cache: DnsCache::new(),
            queries: QueryTracker::new(),
            services,
            quit,
        }
    }

    /// The main loop of the discovery thread.
    ///
    /// In each round, it will:
    /// 1. walk the PTR → SRV → A/AAAA chain over the cache, collecting the
    ///    resolved services and the queries that are due;
    /// 2. multicast the due queries on every interface;
    /// 3. publish the resolved snapshot;
    /// 4. poll the sockets with the timeout computed from the chain walk,
    ///    clamped to [POLL_MIN_TIME, POLL_MAX_TIME], and ingest packets.
    fn run(mut self) {
        if let Err(e) =
            self.poller
                .registry()
                .register(&mut self.signal_sock, SIGNAL_TOKEN, Interest::READABLE)
        {
            debug!("failed to add signal socket to the poller: {}", e);
            return;
        }

        for (i, (intf, sock)) in self.intf_socks.iter_mut().enumerate() {
            if let Err(e) = self
                .poller
                .registry()
                .register(sock, Token(i + 1), Interest::READABLE)
            {
                debug!("add socket of {:?} to poller: {}", intf, e);
            }
        }

        let mut events = Events::with_capacity(64);
        let mut staging: Vec<Service> = Vec::new();

        loop {
            if self.quit.load(Ordering::Acquire) {
                break;
            }

            let resolution = resolve_services(
                &mut self.cache,
                &mut self.queries,
                &self.ty_domain,
                Instant::now(),
                &mut staging,
            );
            self.send_query_vec(&resolution.questions);
            self.publish(&mut staging);

            events.clear();
            match self.poller.poll(&mut events, Some(resolution.timeout)) {
                Ok(()) => self.handle_poller_events(&events),
                Err(e) => debug!("failed to select from sockets: {}", e),
            }
        }
    }

    fn handle_poller_events(&mut self, events: &Events) {
        for ev in events.iter() {
            trace!("event received with key {:?}", ev.token());
            if ev.token() == SIGNAL_TOKEN {
                // A byte on the signal socket is purely a wake-up.
                self.signal_sock_drain();

                if let Err(e) = self.poller.registry().reregister(
                    &mut self.signal_sock,
                    SIGNAL_TOKEN,
                    Interest::READABLE,
                ) {
                    debug!("failed to modify poller for signal socket: {}", e);
                }
                continue; // Next event.
            }

            // Read until no more packets available.
            let idx = ev.token().0 - 1;
            while self.handle_read(idx) {}

            // we continue to monitor this socket.
            if let Some((intf, sock)) = self.intf_socks.get_mut(idx) {
                if let Err(e) =
                    self.poller
                        .registry()
                        .reregister(sock, ev.token(), Interest::READABLE)
                {
                    debug!("modify poller for interface {:?}: {}", intf, e);
                }
            }
        }
    }

    /// Reads one datagram from the socket at `idx` and feeds any resource
    /// records of a response into the cache.
    ///
    /// Returns false if no more packets are available (or the read failed),
    /// otherwise returns true.
    fn handle_read(&mut self, idx: usize) -> bool {
        let (intf, sock) = match self.intf_socks.get_mut(idx) {
            Some(pair) => pair,
            None => return false,
        };
        let mut buf = vec![0u8; MAX_MSG_ABSOLUTE];

        // If the datagram is larger than `buf`, excess bytes may or may not
        // be truncated by the socket layer depending on the platform's libc.
        // Such a datagram will fail to decode below, but must not crash.
        let sz = match sock.recv(&mut buf) {
            Ok(sz) => sz,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::WouldBlock {
                    debug!("listening socket read failed: {}", e);
                }
                return false;
            }
        };

        trace!("received {} bytes at IP: {}", sz, intf.ip());

        // If sz is 0, it means the socket reached End-of-File.
        if sz == 0 {
            debug!("socket for {} was likely shutdown", intf.ip());
            if let Err(e) = self.poller.registry().deregister(sock) {
                debug!("failed to remove socket at idx {} from poller: {}", idx, e);
            }

            // Replace the closed socket with a new one.
            match new_socket_bind(intf) {
                Ok(mut new_sock) => {
                    if let Err(e) = self.poller.registry().register(
                        &mut new_sock,
                        Token(idx + 1),
                        Interest::READABLE,
                    ) {
                        debug!("failed to re-add socket for {}: {}", intf.ip(), e);
                    }
                    trace!("reset socket for IP {}", intf.ip());
                    self.intf_socks[idx].1 = new_sock;
                }
                Err(e) => debug!("re-bind a socket to {}: {}", intf.ip(), e),
            }

            return false;
        }

        buf.truncate(sz); // reduce potential processing errors

        match DnsIncoming::new(buf) {
            Ok(msg) if msg.is_response() => {
                let now = Instant::now();
                for answer in msg.into_answers() {
                    self.cache.update(now, &answer.name, answer.data, answer.ttl);
                }
            }
            Ok(_) => {
                // We are a querier only: questions from other hosts are
                // answered by responders, not by us.
                trace!("ignored a query message");
            }
            Err(e) => debug!("Invalid incoming DNS message: {}", e),
        }

        true
    }

    /// Sends out a list of `questions` (i.e. DNS questions) via multicast
    /// on every open interface socket. A failed send on one socket does not
    /// abort sending on the others.
    fn send_query_vec(&self, questions: &[(String, RRType)]) {
        if questions.is_empty() {
            return;
        }

        trace!("sending query questions: {:?}", questions);
        let mut out = DnsOutgoing::new(FLAGS_QR_QUERY);
        for (name, qtype) in questions {
            out.add_question(name, *qtype);
        }

        let packet = out.to_data_on_wire();
        for (intf, sock) in self.intf_socks.iter() {
            multicast_on_intf(&packet, intf, sock);
        }
    }

    /// Replaces the published vector with the staging vector, atomically
    /// under the snapshot mutex, then clears the staging vector for reuse.
    fn publish(&self, staging: &mut Vec<Service>) {
        let mut published = self.services.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::swap(&mut *published, staging);
        drop(published);
        staging.clear();
    }

    fn signal_sock_drain(&self) {
        let mut signal_buf = [0; 1024];

        // This recv is non-blocking. So we can use loop to drain.
        while let Ok(sz) = self.signal_sock.recv(&mut signal_buf) {
            trace!("signal socket drained {} bytes", sz);
        }
    }
}

/// The outcome of one walk over the cached record chain.
struct Resolution {
    /// Queries that are due, already filtered through the dedup tracker.
    questions: Vec<(String, RRType)>,

    /// How long the next poll may wait, clamped to
    /// [POLL_MIN_TIME, POLL_MAX_TIME].
    timeout: Duration,
}

/// Walks the PTR → SRV → A/AAAA chain for `ty_domain` over the cache.
///
/// Fills `staging` with the resolved services, and computes which queries
/// need to go out now and how long the loop may sleep before some record
/// needs refreshing. A record nearing its expiry is re-queried *before* it
/// lapses, so the published list does not flap.
fn resolve_services(
    cache: &mut DnsCache,
    queries: &mut QueryTracker,
    ty_domain: &str,
    now: Instant,
    staging: &mut Vec<Service>,
) -> Resolution {
    let mut questions = Vec::new();
    let mut timeout = POLL_MAX_TIME;

    // The PTR query for the service type seeds discovery on the first
    // iteration and refreshes instance pointers afterwards. The dedup
    // window keeps it to one query per window, not one per loop.
    if queries.should_send(now, RRType::PTR, ty_domain) {
        questions.push((ty_domain.to_string(), RRType::PTR));
    }

    let ptr_suffix = format!(".{}", ty_domain);
    for (ptr, _expiry) in cache.read(now, ty_domain, RRType::PTR) {
        let instance_fullname = match ptr {
            RecordData::Ptr { target } => target,
            // read() filters by record type already; other kinds cannot
            // appear here.
            _ => continue,
        };

        let name = instance_fullname
            .strip_suffix(&ptr_suffix)
            .unwrap_or(&instance_fullname)
            .to_string();

        let srv_records = cache.read(now, &instance_fullname, RRType::SRV);
        if srv_records.is_empty() {
            if queries.should_send(now, RRType::SRV, &instance_fullname) {
                questions.push((instance_fullname.clone(), RRType::SRV));
            }
            continue;
        }

        let min_srv_remaining = srv_records
            .iter()
            .map(|(_, expiry)| expiry.saturating_duration_since(now))
            .min()
            .unwrap_or(Duration::ZERO);

        if min_srv_remaining < SRV_REQUERY_THRESHOLD
            && queries.should_send(now, RRType::SRV, &instance_fullname)
        {
            questions.push((instance_fullname.clone(), RRType::SRV));
        }
        timeout = cmp::min(
            timeout,
            min_srv_remaining.saturating_sub(SRV_REQUERY_MARGIN),
        );

        for (srv, srv_expiry) in srv_records {
            let (srv_hostname, port) = match srv {
                RecordData::Srv { hostname, port } => (hostname, port),
                _ => continue,
            };

            let mut addresses = Vec::new();
            let mut min_addr_expiry: Option<Instant> = None;
            let addr_records = cache
                .read(now, &srv_hostname, RRType::A)
                .into_iter()
                .chain(cache.read(now, &srv_hostname, RRType::AAAA));
            for (addr_record, addr_expiry) in addr_records {
                match addr_record {
                    RecordData::A { addr } => addresses.push(IpAddr::V4(addr)),
                    RecordData::Aaaa { addr } => addresses.push(IpAddr::V6(addr)),
                    RecordData::Ptr { .. } | RecordData::Srv { .. } => continue,
                }
                min_addr_expiry = Some(match min_addr_expiry {
                    Some(current) => cmp::min(current, addr_expiry),
                    None => addr_expiry,
                });
            }

            match min_addr_expiry {
                Some(expiry) if expiry.saturating_duration_since(now) >= ADDR_REQUERY_THRESHOLD => {
                    timeout = cmp::min(
                        timeout,
                        expiry
                            .saturating_duration_since(now)
                            .saturating_sub(ADDR_REQUERY_MARGIN),
                    );
                }
                _ => {
                    // No addresses yet, or they are close to lapsing: ask
                    // for everything the host has.
                    if queries.should_send(now, RRType::ANY, &srv_hostname) {
                        questions.push((srv_hostname.clone(), RRType::ANY));
                    }
                }
            }

            staging.push(Service {
                name: name.clone(),
                hostname: strip_hostname(&srv_hostname).to_string(),
                port,
                addresses,
                ttl: srv_expiry,
            });
        }
    }

    Resolution {
        questions,
        timeout: timeout.clamp(POLL_MIN_TIME, POLL_MAX_TIME),
    }
}

/// Strips a trailing `.local.` (or a bare trailing dot) from an SRV target
/// hostname.
fn strip_hostname(hostname: &str) -> &str {
    match hostname.strip_suffix(".local.") {
        Some(stripped) => stripped,
        None => hostname.strip_suffix('.').unwrap_or(hostname),
    }
}

/// Checks if `name` ends with a valid mDNS domain: '._tcp.local.' or
/// '._udp.local.'
fn check_domain_suffix(name: &str) -> Result<()> {
    if !(name.ends_with("._tcp.local.") || name.ends_with("._udp.local.")) {
        return Err(e_fmt!(
            "mDNS service type must end with '._tcp.local.' or '._udp.local.': {}",
            name
        ));
    }

    Ok(())
}

/// Returns the addresses of usable network interfaces in the host system.
///
/// Loopback and IPv6 link-local addresses are excluded. The enumeration
/// happens once per engine; interfaces appearing later are not picked up.
fn my_ip_interfaces() -> Vec<Interface> {
    if_addrs::get_if_addrs()
        .unwrap_or_default()
        .into_iter()
        .filter(usable_interface)
        .collect()
}

fn usable_interface(intf: &Interface) -> bool {
    if intf.is_loopback() {
        return false;
    }
    match intf.ip() {
        IpAddr::V4(ip) => ip != LOOPBACK_V4,
        IpAddr::V6(ip) => {
            // fe80::/10 requires a scope id to be routable and is tied to
            // one link; a socket per regular address already covers that
            // link.
            let link_local = (ip.segments()[0] & 0xffc0) == 0xfe80;
            let mapped_loopback = ip.to_ipv4_mapped() == Some(LOOPBACK_V4);
            !ip.is_loopback() && !link_local && !mapped_loopback
        }
    }
}

/// Creates a new UDP socket that uses `intf` to send and recv multicast.
fn new_socket_bind(intf: &Interface) -> Result<MioUdpSocket> {
    // Use the same socket for receiving and sending multicast packets.
    // Such socket has to bind to INADDR_ANY or IN6ADDR_ANY.
    let intf_ip = &intf.ip();
    match intf_ip {
        IpAddr::V4(ip) => {
            let addr = SocketAddrV4::new(Ipv4Addr::new(0, 0, 0, 0), MDNS_PORT);
            let sock = new_socket(addr.into(), true)?;

            // Join mDNS group to receive packets.
            sock.join_multicast_v4(&GROUP_ADDR_V4, ip)
                .map_err(|e| e_fmt!("join multicast group on addr {}: {}", intf_ip, e))?;

            // Set IP_MULTICAST_IF to send packets.
            sock.set_multicast_if_v4(ip)
                .map_err(|e| e_fmt!("set multicast_if on addr {}: {}", ip, e))?;

            // Test if we can send packets successfully.
            let multicast_addr = SocketAddrV4::new(GROUP_ADDR_V4, MDNS_PORT).into();
            let test_packet = DnsOutgoing::new(FLAGS_QR_QUERY).to_data_on_wire();
            sock.send_to(&test_packet, &multicast_addr)
                .map_err(|e| e_fmt!("send multicast packet on addr {}: {}", ip, e))?;

            Ok(MioUdpSocket::from_std(UdpSocket::from(sock)))
        }
        IpAddr::V6(ip) => {
            let addr = SocketAddrV6::new(Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 0), MDNS_PORT, 0, 0);
            let sock = new_socket(addr.into(), true)?;

            // Join mDNS group to receive packets.
            sock.join_multicast_v6(&GROUP_ADDR_V6, intf.index.unwrap_or(0))
                .map_err(|e| e_fmt!("join multicast group on addr {}: {}", ip, e))?;

            // Set IPV6_MULTICAST_IF to send packets.
            sock.set_multicast_if_v6(intf.index.unwrap_or(0))
                .map_err(|e| e_fmt!("set multicast_if on addr {}: {}", ip, e))?;

            // We are not sending multicast packets to test this socket as
            // there might be many IPv6 interfaces on a host and could cause
            // such send error: "No buffer space available (os error 55)".

            Ok(MioUdpSocket::from_std(UdpSocket::from(sock)))
        }
    }
}

/// Creates a new UDP socket to bind to `addr` with REUSEPORT option.
/// `non_block` indicates whether to set O_NONBLOCK for the socket.
fn new_socket(addr: SocketAddr, non_block: bool) -> Result<Socket> {
    let domain = match addr {
        SocketAddr::V4(_) => socket2::Domain::IPV4,
        SocketAddr::V6(_) => socket2::Domain::IPV6,
    };

    let fd = Socket::new(domain, socket2::Type::DGRAM, None)
        .map_err(|e| e_fmt!("create socket failed: {}", e))?;

    fd.set_reuse_address(true)
        .map_err(|e| e_fmt!("set ReuseAddr failed: {}", e))?;
    #[cfg(unix)] // this is currently restricted to Unix's in socket2
    fd.set_reuse_port(true)
        .map_err(|e| e_fmt!("set ReusePort failed: {}", e))?;

    if non_block {
        fd.set_nonblocking(true)
            .map_err(|e| e_fmt!("set O_NONBLOCK: {}", e))?;
    }

    fd.bind(&addr.into())
        .map_err(|e| e_fmt!("socket bind to {} failed: {}", &addr, e))?;

    trace!("new socket bind to {}", &addr);
    Ok(fd)
}

/// Sends a multicast packet out of the socket bound for `intf`.
fn multicast_on_intf(packet: &[u8], intf: &Interface, sock: &MioUdpSocket) {
    if packet.len() > MAX_MSG_ABSOLUTE {
        debug!("Drop over-sized packet ({})", packet.len());
        return;
    }

    let addr: SocketAddr = match intf.addr {
        IfAddr::V4(_) => SocketAddrV4::new(GROUP_ADDR_V4, MDNS_PORT).into(),
        IfAddr::V6(_) => {
            let mut sock_addr = SocketAddrV6::new(GROUP_ADDR_V6, MDNS_PORT, 0, 0);
            sock_addr.set_scope_id(intf.index.unwrap_or(0)); // Choose iface for multicast
            sock_addr.into()
        }
    };

    match sock.send_to(packet, addr) {
        Ok(sz) => trace!("sent out {} bytes on interface {}", sz, intf.ip()),
        Err(e) => debug!("Failed to send to {} via {}: {}", addr, intf.ip(), e),
    }
}
