//! Hash table of cached chains.
//!
//! Entries live in a fixed arena; unused arena indices sit on a free stack.
//! Each of the 256 buckets heads a singly linked collision chain threaded
//! through the arena by index.

use crate::hash::{bucket, BUCKETS};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashEntry {
    pub hash: u32,
    /// Canonical chain key, compared byte for byte on lookup.
    pub key: Vec<u8>,
    /// Pool slot of the cached kernel.
    pub slot: usize,
    next: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct HashTable {
    heads: Vec<Option<usize>>,
    entries: Vec<Option<HashEntry>>,
    free: Vec<usize>,
}

impl HashTable {
    pub fn new(capacity: usize) -> Self {
        Self {
            heads: vec![None; BUCKETS],
            entries: vec![None; capacity],
            // Lowest index on top.
            free: (0..capacity).rev().collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, index: usize) -> Option<&HashEntry> {
        self.entries.get(index).and_then(Option::as_ref)
    }

    /// Arena index of the entry for (`hash`, `key`). A matching hash alone
    /// is not a hit.
    pub fn find(&self, hash: u32, key: &[u8]) -> Option<usize> {
        let mut cursor = self.heads[bucket(hash) as usize];
        while let Some(index) = cursor {
            let entry = self.entries[index].as_ref()?;
            if entry.hash == hash && entry.key == key {
                return Some(index);
            }
            cursor = entry.next;
        }
        None
    }

    /// Insert at the head of the bucket. Returns `None` when the arena is full.
    pub fn insert(&mut self, hash: u32, key: Vec<u8>, slot: usize) -> Option<usize> {
        let index = self.free.pop()?;
        let head = &mut self.heads[bucket(hash) as usize];
        self.entries[index] = Some(HashEntry {
            hash,
            key,
            slot,
            next: *head,
        });
        *head = Some(index);
        Some(index)
    }

    pub fn remove(&mut self, index: usize) -> Option<HashEntry> {
        let hash = self.get(index)?.hash;
        let b = bucket(hash) as usize;

        let mut prev: Option<usize> = None;
        let mut cursor = self.heads[b];
        while let Some(i) = cursor {
            let next = self.entries[i].as_ref().and_then(|e| e.next);
            if i == index {
                match prev {
                    Some(p) => {
                        if let Some(e) = self.entries[p].as_mut() {
                            e.next = next;
                        }
                    }
                    None => self.heads[b] = next,
                }
                break;
            }
            prev = Some(i);
            cursor = next;
        }

        let entry = self.entries[index].take()?;
        self.free.push(index);
        Some(entry)
    }

    /// Number of entries chained in `bucket`.
    pub fn chain_len(&self, bucket: u8) -> usize {
        let mut n = 0;
        let mut cursor = self.heads[bucket as usize];
        while let Some(i) = cursor {
            n += 1;
            cursor = self.entries[i].as_ref().and_then(|e| e.next);
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colliding_hashes_need_equal_keys() {
        let mut t = HashTable::new(4);
        let a = t.insert(7, b"aa".to_vec(), 0).unwrap();
        let b = t.insert(7, b"bb".to_vec(), 1).unwrap();
        assert_eq!(t.chain_len(bucket(7)), 2);
        assert_eq!(t.find(7, b"aa"), Some(a));
        assert_eq!(t.find(7, b"bb"), Some(b));
        assert_eq!(t.find(7, b"cc"), None);
        assert_eq!(t.find(8, b"aa"), None);
    }

    #[test]
    fn remove_unlinks_middle_of_chain() {
        let mut t = HashTable::new(4);
        let a = t.insert(1, vec![1], 0).unwrap();
        let b = t.insert(1, vec![2], 1).unwrap();
        let c = t.insert(1, vec![3], 2).unwrap();
        assert_eq!(t.remove(b).map(|e| e.slot), Some(1));
        assert_eq!(t.chain_len(bucket(1)), 2);
        assert_eq!(t.find(1, &[1]), Some(a));
        assert_eq!(t.find(1, &[3]), Some(c));
        assert_eq!(t.find(1, &[2]), None);
        assert!(t.remove(b).is_none());
    }

    #[test]
    fn arena_is_bounded_and_recycled() {
        let mut t = HashTable::new(2);
        let a = t.insert(1, vec![1], 0).unwrap();
        t.insert(2, vec![2], 1).unwrap();
        assert!(t.insert(3, vec![3], 2).is_none());
        t.remove(a);
        assert_eq!(t.insert(3, vec![3], 2), Some(a));
        assert_eq!(t.len(), 2);
        assert_eq!(t.capacity(), 2);
    }
}
