//! Stable union of a desired collection and an observed one.
//!
//! The vendor is eventually consistent: a sub-resource that was just
//! requested can be missing from the next read. Returning only what was
//! observed would look like the resource vanished, so records the caller
//! asked for survive until the vendor reports them, and from then on the
//! vendor's copy wins.

use std::collections::HashMap;
use std::hash::Hash;

use crate::types::{Extension, OrderId, VpcMember};

/// A record that belongs to a keyed collection.
pub trait Keyed {
    type Key: Eq + Hash + Clone;

    fn key(&self) -> Self::Key;

    /// Replace unresolved field values with explicit absence.
    fn normalized(self) -> Self;
}

/// Merge `desired` with `observed` by key.
///
/// Observed records come first in their original order, followed by desired
/// records whose key was not observed. Duplicate keys within one side keep the
/// position of the first occurrence and the value of the last. The result has
/// no unresolved fields. Callers should treat it as a set.
pub fn merge_by_key<T: Keyed>(desired: Vec<T>, observed: Vec<T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(desired.len() + observed.len());
    let mut slots: HashMap<T::Key, usize> = HashMap::new();

    for record in observed {
        upsert(&mut out, &mut slots, record.normalized());
    }

    let observed_len = out.len();
    for record in desired {
        match slots.get(&record.key()) {
            Some(&slot) if slot < observed_len => {}
            _ => upsert(&mut out, &mut slots, record.normalized()),
        }
    }

    out
}

fn upsert<T: Keyed>(out: &mut Vec<T>, slots: &mut HashMap<T::Key, usize>, record: T) {
    match slots.get(&record.key()) {
        Some(&slot) => out[slot] = record,
        None => {
            slots.insert(record.key(), out.len());
            out.push(record);
        }
    }
}

impl Keyed for Extension {
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }

    fn normalized(self) -> Self {
        Self {
            id: self.id,
            description: self.description.normalized(),
            price: self.price.normalized(),
        }
    }
}

impl Keyed for VpcMember {
    type Key = OrderId;

    fn key(&self) -> OrderId {
        self.order_id
    }

    fn normalized(self) -> Self {
        self
    }
}
