//! Parsing and loading of server definition files.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use atoll_ring::Continuum;
use atoll_types::{ServerEntry, ServerRef};
use tracing::debug;

use crate::error::SourceError;

/// Parse server definitions from a reader.
///
/// One record per line: `"<address>\t<weight>"`. Lines starting with `#`
/// are comments and are skipped; every other line must parse, so a single
/// bad record fails the whole load rather than silently thinning the ring.
pub fn parse_server_list(reader: impl BufRead) -> Result<Vec<ServerEntry>, SourceError> {
    let mut entries = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.starts_with('#') {
            continue;
        }

        let Some((addr, weight)) = split_record(&line) else {
            return Err(SourceError::MalformedServer {
                line: index + 1,
                content: line,
            });
        };

        let server = ServerRef::resolve(addr)?;
        entries.push(ServerEntry::new(server, weight));
    }

    Ok(entries)
}

/// Split one record into address and weight, or `None` if the line does
/// not have exactly two tab-separated fields with a numeric weight.
fn split_record(line: &str) -> Option<(&str, u64)> {
    let (addr, weight) = line.split_once('\t')?;
    if weight.contains('\t') {
        return None;
    }
    Some((addr, weight.parse().ok()?))
}

/// Load server entries from a definition file.
pub fn load_entries(path: impl AsRef<Path>) -> Result<Vec<ServerEntry>, SourceError> {
    let file = File::open(path.as_ref())?;
    parse_server_list(BufReader::new(file))
}

/// Build a continuum from a server definition file.
///
/// Uses the default MD5 scheme. The file's modification time is captured
/// on the continuum so [`is_stale`] can compare against it later.
pub fn load_continuum(path: impl AsRef<Path>) -> Result<Continuum, SourceError> {
    let path = path.as_ref();
    let modified = std::fs::metadata(path)?.modified()?;
    let entries = load_entries(path)?;
    debug!(path = %path.display(), servers = entries.len(), "loaded server list");
    Ok(Continuum::build(&entries)?.with_source_modified(modified))
}

/// Whether the server-list file changed since `continuum` was loaded.
///
/// Compares the file's current modification time against the one captured
/// by [`load_continuum`]; a continuum that was not loaded from a file is
/// always stale. A caller seeing `true` rebuilds off the hot path and
/// swaps the new continuum in; readers of the old one are unaffected.
pub fn is_stale(continuum: &Continuum, path: impl AsRef<Path>) -> io::Result<bool> {
    let modified = std::fs::metadata(path)?.modified()?;
    Ok(continuum.source_modified() != Some(modified))
}
