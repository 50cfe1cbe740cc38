//! Continuum construction and key lookup.

use std::collections::HashSet;
use std::fmt::{self, Write as _};
use std::sync::Arc;
use std::time::SystemTime;

use atoll_hash::{extract_word, Md5Hasher, RingHasher};
use atoll_types::{ServerEntry, ServerRef};
use tracing::{debug, info};

use crate::error::RingError;

/// Digest words drawn per hash step when the scheme provides them.
const POINTS_PER_HASH: usize = 4;

/// Hash steps per unit of weight share times server count on a weighted
/// ring. A server with an average weight share lands at `40 * 4 = 160`
/// points.
const WEIGHTED_STEP_FACTOR: f64 = 40.0;

/// Hash steps per server on an unweighted ring with a four-word digest
/// (160 points per server).
const DIGEST_STEPS_PER_SERVER: usize = 40;

/// Hash steps per server on an unweighted ring with a direct 32-bit hash
/// (one word per step, 100 points per server).
const DIRECT_STEPS_PER_SERVER: usize = 100;

/// One position on the ring: the 32-bit hash that ends the arc, and the
/// roster index of the server owning that arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RingPoint {
    hash: u32,
    server: u32,
}

/// An immutable hash ring mapping keys to servers.
///
/// Built once from a weighted server list via [`Continuum::build`], then
/// queried with [`pick_server`](Continuum::pick_server). Construction is
/// deterministic: the same entries (order, identities, weights) and the
/// same hashing scheme always produce the identical ring, which is what
/// lets independent clients agree on key placement.
#[derive(Clone)]
pub struct Continuum {
    servers: Vec<ServerRef>,
    points: Vec<RingPoint>,
    hasher: Arc<dyn RingHasher>,
    weighted: bool,
    built_at: SystemTime,
    source_modified: Option<SystemTime>,
}

impl Continuum {
    /// Build a continuum with the default MD5 scheme.
    pub fn build(entries: &[ServerEntry]) -> Result<Self, RingError> {
        Self::build_with_hasher(entries, Arc::new(Md5Hasher))
    }

    /// Build a continuum with an explicit hashing scheme.
    ///
    /// A list with any nonzero weight selects weighted placement: each
    /// server lands `floor(weight / total * 40 * n)` hash steps of four
    /// points each, so capacity shares carry over to the ring. The flooring
    /// can leave the ring slightly short of `n * 160` points; that is the
    /// shape other clients compute, so it is kept as is.
    ///
    /// An all-zero list selects unweighted placement. Its per-server budget
    /// follows the scheme: 40 steps of four points with a digest wide
    /// enough for four words, or 100 single-point steps with a direct
    /// 32-bit hash. The two spread keys the same; they differ only in
    /// hashing cost and point granularity.
    ///
    /// # Errors
    ///
    /// [`RingError::NoServers`] on an empty entry list, and
    /// [`RingError::DigestTooNarrow`] when the entries carry weights but the
    /// hasher cannot supply four words per digest.
    pub fn build_with_hasher(
        entries: &[ServerEntry],
        hasher: Arc<dyn RingHasher>,
    ) -> Result<Self, RingError> {
        if entries.is_empty() {
            return Err(RingError::NoServers);
        }

        let num_servers = entries.len();
        let total_weight: u64 = entries.iter().map(|entry| entry.weight).sum();
        let weighted = total_weight > 0;

        if weighted && hasher.words_per_digest() < POINTS_PER_HASH {
            return Err(RingError::DigestTooNarrow {
                words: hasher.words_per_digest(),
                needed: POINTS_PER_HASH,
            });
        }
        let words_per_step = if hasher.words_per_digest() >= POINTS_PER_HASH {
            POINTS_PER_HASH
        } else {
            1
        };

        let mut points = Vec::new();
        let mut input = String::new();

        for (index, entry) in entries.iter().enumerate() {
            let steps = if weighted {
                let share = entry.weight as f64 / total_weight as f64;
                (share * WEIGHTED_STEP_FACTOR * num_servers as f64).floor() as usize
            } else if words_per_step == POINTS_PER_HASH {
                DIGEST_STEPS_PER_SERVER
            } else {
                DIRECT_STEPS_PER_SERVER
            };

            for step in 0..steps {
                input.clear();
                write!(input, "{}-{}", entry.server.name(), step).expect("write to string");
                let digest = hasher.digest(input.as_bytes());
                for word in 0..words_per_step {
                    points.push(RingPoint {
                        hash: extract_word(&digest, word),
                        server: index as u32,
                    });
                }
            }

            debug!(
                server = %entry.server,
                weight = entry.weight,
                points = steps * words_per_step,
                "placed ring points"
            );
        }

        // Stable sort: equal hashes keep generation order, so rebuilds of
        // the same list produce the identical point sequence.
        points.sort_by_key(|point| point.hash);

        info!(
            servers = num_servers,
            points = points.len(),
            weighted,
            "continuum built"
        );

        Ok(Self {
            servers: entries.iter().map(|entry| entry.server.clone()).collect(),
            points,
            hasher,
            weighted,
            built_at: SystemTime::now(),
            source_modified: None,
        })
    }

    /// Map a key to the server owning it.
    ///
    /// Hashes the key to a 32-bit value, then takes the first ring point
    /// with `hash >= value`; a key hashing past the last point wraps to the
    /// first, which is what closes the ring. Equal-hash keys always land on
    /// the same server, and the result only changes when the ring itself
    /// changes.
    ///
    /// # Errors
    ///
    /// [`RingError::NoServers`] if the continuum holds no points.
    pub fn pick_server(&self, key: impl AsRef<[u8]>) -> Result<&ServerRef, RingError> {
        if self.points.is_empty() {
            return Err(RingError::NoServers);
        }

        let target = self.hasher.hash32(key.as_ref());
        // Lower bound: first point with hash >= target.
        let mut at = self.points.partition_point(|point| point.hash < target);
        if at == self.points.len() {
            at = 0;
        }
        Ok(&self.servers[self.points[at].server as usize])
    }

    /// Iterate the distinct servers this continuum references.
    ///
    /// Servers appear in order of first appearance when scanning the ring
    /// from its lowest point, each exactly once no matter how many points
    /// it owns. Roster members that contributed no points (zero weight on a
    /// weighted ring) follow in roster order, so health probes still see
    /// the full server set. Each call starts a fresh scan.
    pub fn servers(&self) -> Servers<'_> {
        Servers {
            continuum: self,
            next_point: 0,
            next_roster: 0,
            seen: HashSet::with_capacity(self.servers.len()),
        }
    }

    /// Ordered view of the ring: `(hash, server)` pairs ascending by hash.
    pub fn points(&self) -> impl Iterator<Item = (u32, &ServerRef)> + '_ {
        self.points
            .iter()
            .map(|point| (point.hash, &self.servers[point.server as usize]))
    }

    /// Number of points on the ring.
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    /// Whether the ring holds no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the ring was built with capacity-proportional placement.
    pub fn weighted(&self) -> bool {
        self.weighted
    }

    /// When this continuum was built.
    pub fn built_at(&self) -> SystemTime {
        self.built_at
    }

    /// Modification time of the server-list source this continuum was built
    /// from, if it was loaded from one.
    pub fn source_modified(&self) -> Option<SystemTime> {
        self.source_modified
    }

    /// Attach the source modification time captured at load time.
    pub fn with_source_modified(mut self, modified: SystemTime) -> Self {
        self.source_modified = Some(modified);
        self
    }
}

impl fmt::Debug for Continuum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Continuum")
            .field("servers", &self.servers.len())
            .field("points", &self.points.len())
            .field("weighted", &self.weighted)
            .field("built_at", &self.built_at)
            .finish_non_exhaustive()
    }
}

/// Iterator over the distinct servers of a [`Continuum`].
///
/// Created by [`Continuum::servers`]. Lazy; the only per-scan state is a
/// seen-set bounded by the roster size.
pub struct Servers<'a> {
    continuum: &'a Continuum,
    next_point: usize,
    next_roster: usize,
    seen: HashSet<&'a str>,
}

impl<'a> Iterator for Servers<'a> {
    type Item = &'a ServerRef;

    fn next(&mut self) -> Option<&'a ServerRef> {
        while self.next_point < self.continuum.points.len() {
            let point = self.continuum.points[self.next_point];
            self.next_point += 1;
            let server = &self.continuum.servers[point.server as usize];
            if self.seen.insert(server.name()) {
                return Some(server);
            }
        }

        // Roster members without points come last.
        while self.next_roster < self.continuum.servers.len() {
            let server = &self.continuum.servers[self.next_roster];
            self.next_roster += 1;
            if self.seen.insert(server.name()) {
                return Some(server);
            }
        }

        None
    }
}
