//! Named orderings for the keyed collections of a [`Config`](crate::Config).
//!
//! Parsing keeps entries in source order. Inserting places an entry before
//! the first existing entry that sorts after it, so a sorted collection stays
//! sorted and entries the caller did not touch never move.
//! [`Config::sort_all`](crate::Config::sort_all) normalizes everything.

use std::cmp::Ordering;

use crate::types::{HostPort, Location, Server, Upstream};

pub fn by_upstream_name(a: &Upstream, b: &Upstream) -> Ordering {
    a.name.cmp(&b.name)
}

pub fn by_server_name(a: &Server, b: &Server) -> Ordering {
    a.name.cmp(&b.name)
}

pub fn by_location_path(a: &Location, b: &Location) -> Ordering {
    a.path.cmp(&b.path)
}

pub fn by_host_then_port(a: &HostPort, b: &HostPort) -> Ordering {
    a.host.cmp(&b.host).then(a.port.cmp(&b.port))
}

/// Inserts `item` before the first element ordered after it and returns its index.
pub(crate) fn insert_ordered<T>(
    items: &mut Vec<T>,
    item: T,
    order: impl Fn(&T, &T) -> Ordering,
) -> usize {
    let index = items
        .iter()
        .position(|existing| order(existing, &item) == Ordering::Greater)
        .unwrap_or(items.len());
    items.insert(index, item);
    index
}
