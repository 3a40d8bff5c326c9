//! CIDR planning and the per-account allocation registry.
//!
//! A VPC block is carved into equally sized subnets laid out sequentially:
//! every public subnet first, then private, then database. Within a role,
//! subnet `i` lands in availability zone `i mod az_count`. The same request
//! always yields the same plan.
//!
//! [`CidrAllocator`] remembers which top-level blocks are taken in one
//! account scope and refuses overlapping requests. Checking and registering
//! happen under one lock, so concurrent allocations cannot both claim the
//! same space.

use ipnet::Ipv4Net;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Subnet size used when the base block has room to spare.
pub const DEFAULT_SUBNET_PREFIX: u8 = 24;

/// Smallest subnet AWS accepts.
pub const MAX_SUBNET_PREFIX: u8 = 28;

/// Parse an IPv4 network, rejecting blocks with host bits set.
pub fn parse_cidr(raw: &str) -> Result<Ipv4Net> {
    let net: Ipv4Net = raw
        .trim()
        .parse()
        .map_err(|e| Error::invalid_cidr(raw, format!("{e}")))?;
    if net.network() != net.addr() {
        return Err(Error::invalid_cidr(
            raw,
            format!("host bits are set (network address is {})", net.trunc()),
        ));
    }
    Ok(net)
}

/// Whether two blocks share any address.
pub fn overlaps(a: &Ipv4Net, b: &Ipv4Net) -> bool {
    a.contains(b) || b.contains(a)
}

/// What a subnet is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetRole {
    /// Internet-routable, hosts the load balancer and NAT gateways
    Public,
    /// Application tier behind NAT
    Private,
    /// Isolated database tier
    Database,
}

impl SubnetRole {
    /// Allocation order.
    pub const ALL: [SubnetRole; 3] = [SubnetRole::Public, SubnetRole::Private, SubnetRole::Database];

    /// Lowercase name used in subnet names.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubnetRole::Public => "public",
            SubnetRole::Private => "private",
            SubnetRole::Database => "database",
        }
    }
}

impl fmt::Display for SubnetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Number of subnets wanted per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubnetCounts {
    /// Public subnets
    pub public: usize,
    /// Private subnets
    pub private: usize,
    /// Database subnets
    pub database: usize,
}

impl SubnetCounts {
    /// One subnet of every role in each availability zone.
    pub fn per_az(az_count: usize) -> Self {
        Self {
            public: az_count,
            private: az_count,
            database: az_count,
        }
    }

    /// Count for one role.
    pub fn get(&self, role: SubnetRole) -> usize {
        match role {
            SubnetRole::Public => self.public,
            SubnetRole::Private => self.private,
            SubnetRole::Database => self.database,
        }
    }

    /// Total subnets across all roles.
    pub fn total(&self) -> usize {
        self.public + self.private + self.database
    }
}

/// A single planned subnet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    /// Role of the subnet
    pub role: SubnetRole,
    /// Address range
    pub cidr: Ipv4Net,
    /// Availability zone
    pub az: String,
}

/// Input to subnet planning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetRequest {
    /// Block to carve
    pub base: Ipv4Net,
    /// Subnets per role
    pub counts: SubnetCounts,
    /// Availability zones, in placement order
    pub azs: Vec<String>,
    /// Preferred subnet prefix, lengthened when the block is too small
    pub target_prefix: u8,
    /// Pinned subnet prefix; fails instead of lengthening
    pub subnet_prefix: Option<u8>,
}

/// A VPC block and its subnet partitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAllocation {
    /// VPC CIDR
    pub vpc_cidr: Ipv4Net,
    /// Prefix length shared by every subnet
    pub subnet_prefix: u8,
    /// Availability zones spanned
    pub azs: Vec<String>,
    /// Public subnets in AZ order
    pub public_subnets: Vec<Subnet>,
    /// Private subnets in AZ order
    pub private_subnets: Vec<Subnet>,
    /// Database subnets in AZ order
    pub database_subnets: Vec<Subnet>,
}

impl NetworkAllocation {
    /// Subnets for one role.
    pub fn subnets(&self, role: SubnetRole) -> &[Subnet] {
        match role {
            SubnetRole::Public => &self.public_subnets,
            SubnetRole::Private => &self.private_subnets,
            SubnetRole::Database => &self.database_subnets,
        }
    }

    /// Every subnet in allocation order.
    pub fn all_subnets(&self) -> impl Iterator<Item = &Subnet> {
        self.public_subnets
            .iter()
            .chain(&self.private_subnets)
            .chain(&self.database_subnets)
    }
}

/// `ceil(log2(n))`, with `n <= 1` needing no extra bits.
fn bits_for(n: usize) -> u32 {
    if n <= 1 {
        0
    } else {
        usize::BITS - (n - 1).leading_zeros()
    }
}

/// Carve `request.base` into the requested subnets.
pub fn plan_subnets(request: &SubnetRequest) -> Result<NetworkAllocation> {
    let base = request.base;
    let total = request.counts.total();

    if total > 0 && request.azs.is_empty() {
        return Err(Error::invalid_value(
            "az_count",
            "at least one availability zone is required",
        ));
    }

    // Subnets must be strictly smaller than the block they come from.
    let required = u32::from(base.prefix_len()) + bits_for(total).max(1);
    if required > u32::from(MAX_SUBNET_PREFIX) {
        return Err(Error::cidr_exhaustion(
            base,
            total,
            format!("subnets would need a /{required} prefix, smallest allowed is /{MAX_SUBNET_PREFIX}"),
        ));
    }
    let required = required as u8;

    let prefix = match request.subnet_prefix {
        Some(pinned) if pinned < required => {
            return Err(Error::cidr_exhaustion(
                base,
                total,
                format!("/{pinned} subnets do not fit, at least /{required} is needed"),
            ));
        }
        Some(pinned) if pinned > MAX_SUBNET_PREFIX => {
            return Err(Error::cidr_exhaustion(
                base,
                total,
                format!("/{pinned} is smaller than the smallest allowed /{MAX_SUBNET_PREFIX}"),
            ));
        }
        Some(pinned) => pinned,
        None => required.max(request.target_prefix.min(MAX_SUBNET_PREFIX)),
    };

    debug!(
        base = %base,
        total,
        prefix,
        "planning subnets"
    );

    let mut blocks = base
        .subnets(prefix)
        .map_err(|e| Error::cidr_exhaustion(base, total, format!("{e}")))?;

    let mut allocation = NetworkAllocation {
        vpc_cidr: base,
        subnet_prefix: prefix,
        azs: request.azs.clone(),
        public_subnets: Vec::new(),
        private_subnets: Vec::new(),
        database_subnets: Vec::new(),
    };

    for role in SubnetRole::ALL {
        let count = request.counts.get(role);
        let mut subnets = Vec::with_capacity(count);
        for i in 0..count {
            let cidr = blocks.next().ok_or_else(|| {
                Error::cidr_exhaustion(base, total, format!("ran out of /{prefix} blocks"))
            })?;
            subnets.push(Subnet {
                role,
                cidr,
                az: request.azs[i % request.azs.len()].clone(),
            });
        }
        match role {
            SubnetRole::Public => allocation.public_subnets = subnets,
            SubnetRole::Private => allocation.private_subnets = subnets,
            SubnetRole::Database => allocation.database_subnets = subnets,
        }
    }

    Ok(allocation)
}

/// A top-level block held by one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    /// Owner, normally the environment's name prefix
    pub owner: String,
    /// Reserved block
    pub cidr: Ipv4Net,
}

/// Registry of allocated VPC blocks within one account scope.
#[derive(Debug, Default)]
pub struct CidrAllocator {
    scope: String,
    reservations: Mutex<Vec<Reservation>>,
}

impl CidrAllocator {
    /// Create an empty registry for an account scope.
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
            reservations: Mutex::new(Vec::new()),
        }
    }

    /// Plan subnets for `request` and reserve its base block for `owner`.
    ///
    /// Re-allocating the same block for the same owner succeeds without
    /// change; a different block for an existing owner replaces its
    /// reservation.
    pub fn allocate(&self, owner: &str, request: &SubnetRequest) -> Result<NetworkAllocation> {
        let mut reservations = self.reservations.lock();
        Self::check(&reservations, owner, &request.base)?;
        let allocation = plan_subnets(request)?;
        Self::register(&mut reservations, owner, request.base);
        info!(
            scope = %self.scope,
            owner,
            cidr = %request.base,
            subnets = allocation.all_subnets().count(),
            "allocated network"
        );
        Ok(allocation)
    }

    /// Reserve a top-level block without planning subnets.
    pub fn reserve(&self, owner: &str, cidr: Ipv4Net) -> Result<()> {
        let mut reservations = self.reservations.lock();
        Self::check(&reservations, owner, &cidr)?;
        Self::register(&mut reservations, owner, cidr);
        Ok(())
    }

    /// Drop the reservation held by `owner`, returning its block.
    pub fn release(&self, owner: &str) -> Option<Ipv4Net> {
        let mut reservations = self.reservations.lock();
        let index = reservations.iter().position(|r| r.owner == owner)?;
        Some(reservations.remove(index).cidr)
    }

    /// Snapshot of current reservations in registration order.
    pub fn reservations(&self) -> Vec<Reservation> {
        self.reservations.lock().clone()
    }

    fn check(reservations: &[Reservation], owner: &str, cidr: &Ipv4Net) -> Result<()> {
        match reservations
            .iter()
            .find(|r| r.owner != owner && overlaps(&r.cidr, cidr))
        {
            Some(existing) => Err(Error::Overlap {
                requested: cidr.to_string(),
                owner: owner.to_string(),
                existing: existing.cidr.to_string(),
                existing_owner: existing.owner.clone(),
            }),
            None => Ok(()),
        }
    }

    fn register(reservations: &mut Vec<Reservation>, owner: &str, cidr: Ipv4Net) {
        if let Some(existing) = reservations.iter_mut().find(|r| r.owner == owner) {
            existing.cidr = cidr;
        } else {
            reservations.push(Reservation {
                owner: owner.to_string(),
                cidr,
            });
        }
    }
}
