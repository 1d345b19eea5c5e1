use std::cmp::Ordering;
use std::collections::HashMap;
use crate::core::types::{Fingerprint, Move};
use crate::storage::record::{Format, Record};

/// Record plus the arena index of the next candidate move for the same position
#[derive(Debug, Clone)]
pub struct ChainNode {
    pub record: Record,
    next: Option<u32>,
}

impl ChainNode {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

#[derive(Debug, Clone, Copy)]
struct ChainEnds {
    head: u32,
    tail: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Appended,
    Merged,
}

/// Fingerprint -> chain of candidate moves.
///
/// Nodes live in one arena in insertion order, which is also the order they
/// are written back to disk.
#[derive(Debug, Clone, Default)]
pub struct PositionIndex {
    chains: HashMap<Fingerprint, ChainEnds>,
    nodes: Vec<ChainNode>,
}

/// Walks one position's candidate moves, head first
pub struct Chain<'a> {
    nodes: &'a [ChainNode],
    cursor: Option<u32>,
}

impl<'a> Iterator for Chain<'a> {
    type Item = &'a Record;

    fn next(&mut self) -> Option<Self::Item> {
        let nodes = self.nodes;
        let node = &nodes[self.cursor? as usize];
        self.cursor = node.next;
        Some(&node.record)
    }
}

impl PositionIndex {
    pub fn new() -> Self {
        PositionIndex::default()
    }

    pub fn with_capacity(records: usize) -> Self {
        PositionIndex {
            chains: HashMap::with_capacity(records),
            nodes: Vec::with_capacity(records),
        }
    }

    pub fn reserve(&mut self, records: usize) {
        self.nodes.reserve(records);
        self.chains.reserve(records);
    }

    /// Merges into the node of the same (key, move) or appends a new node.
    pub fn insert(&mut self, record: Record) -> InsertOutcome {
        let Some(ends) = self.chains.get(&record.key).copied() else {
            let id = self.push_node(record);
            self.chains.insert(record.key, ChainEnds { head: id, tail: id });
            return InsertOutcome::Appended;
        };

        let mut cursor = Some(ends.head);
        while let Some(id) = cursor {
            let node = &mut self.nodes[id as usize];
            if node.record.mv == record.mv {
                node.record.merge(&record, Format::CURRENT);
                return InsertOutcome::Merged;
            }
            cursor = node.next;
        }

        let id = self.push_node(record);
        self.nodes[ends.tail as usize].next = Some(id);
        self.chains.insert(record.key, ChainEnds { head: ends.head, tail: id });
        InsertOutcome::Appended
    }

    fn push_node(&mut self, record: Record) -> u32 {
        let id = self.nodes.len() as u32;
        self.nodes.push(ChainNode { record, next: None });
        id
    }

    pub fn head(&self, key: Fingerprint) -> Option<&ChainNode> {
        let ends = self.chains.get(&key)?;
        Some(&self.nodes[ends.head as usize])
    }

    pub fn find(&self, key: Fingerprint) -> Option<Chain<'_>> {
        let ends = self.chains.get(&key)?;
        Some(Chain {
            nodes: &self.nodes,
            cursor: Some(ends.head),
        })
    }

    pub fn find_move(&self, key: Fingerprint, mv: Move) -> Option<&Record> {
        self.find(key)?.find(|record| record.mv == mv)
    }

    /// Like `find_move`, but a match shallower than `min_depth` counts as absent.
    pub fn find_move_with_min_depth(&self, key: Fingerprint, mv: Move, min_depth: i32) -> Option<&Record> {
        self.find_move(key, mv).filter(|record| record.depth >= min_depth)
    }

    /// Best candidate by the current ranking; the earliest node wins exact ties.
    pub fn best(&self, key: Fingerprint) -> Option<&Record> {
        self.find(key)?.fold(None, |best: Option<&Record>, record| match best {
            Some(current) if record.compare(current, Format::CURRENT) != Ordering::Greater => Some(current),
            _ => Some(record),
        })
    }

    pub fn merge_from(&mut self, other: &PositionIndex) {
        for record in other.iter() {
            self.insert(*record);
        }
    }

    /// All records in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Record> + '_ {
        self.nodes.iter().map(|node| &node.record)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn positions(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.chains.clear();
        self.nodes.clear();
    }
}

impl Extend<Record> for PositionIndex {
    fn extend<T: IntoIterator<Item = Record>>(&mut self, iter: T) {
        for record in iter {
            self.insert(record);
        }
    }
}

impl FromIterator<Record> for PositionIndex {
    fn from_iter<T: IntoIterator<Item = Record>>(iter: T) -> Self {
        let mut index = PositionIndex::new();
        index.extend(iter);
        index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(key: u64, uci: &str, value: i32, depth: i32) -> Record {
        Record::new(Fingerprint(key), Move::from_uci(uci).unwrap(), value, depth, 1)
    }

    #[test]
    fn chains_keep_insertion_order() {
        let mut index = PositionIndex::new();
        assert_eq!(index.insert(record(1, "e2e4", 10, 5)), InsertOutcome::Appended);
        assert_eq!(index.insert(record(2, "d2d4", 10, 5)), InsertOutcome::Appended);
        assert_eq!(index.insert(record(1, "g1f3", 10, 5)), InsertOutcome::Appended);

        let moves: Vec<String> = index.find(Fingerprint(1)).unwrap().map(|r| r.mv.to_string()).collect();
        assert_eq!(moves, vec!["e2e4", "g1f3"]);
        assert!(index.head(Fingerprint(1)).unwrap().has_next());
        assert!(!index.head(Fingerprint(2)).unwrap().has_next());
        assert_eq!((index.len(), index.positions()), (3, 2));
    }

    #[test]
    fn same_move_merges_in_place() {
        let mut index = PositionIndex::new();
        index.insert(record(1, "e2e4", 10, 5));
        assert_eq!(index.insert(record(1, "e2e4", 40, 9)), InsertOutcome::Merged);

        let stored = index.find_move(Fingerprint(1), Move::from_uci("e2e4").unwrap()).unwrap();
        assert_eq!((stored.value, stored.depth, stored.count), (40, 9, 2));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn best_prefers_earliest_on_ties() {
        let index: PositionIndex = [record(1, "e2e4", 10, 5), record(1, "d2d4", 10, 5), record(1, "c2c4", 5, 5)]
            .into_iter()
            .collect();
        assert_eq!(index.best(Fingerprint(1)).unwrap().mv.to_string(), "e2e4");
        assert!(index.best(Fingerprint(9)).is_none());
    }

    #[test]
    fn min_depth_filter_and_merge_from() {
        let mut a: PositionIndex = [record(1, "e2e4", 10, 3)].into_iter().collect();
        let b: PositionIndex = [record(1, "e2e4", 20, 3), record(2, "d2d4", 0, 8)].into_iter().collect();
        a.merge_from(&b);

        let e4 = Move::from_uci("e2e4").unwrap();
        assert!(a.find_move_with_min_depth(Fingerprint(1), e4, 4).is_none());
        assert_eq!(a.find_move_with_min_depth(Fingerprint(1), e4, 3).unwrap().value, 15);
        assert_eq!(a.positions(), 2);

        a.clear();
        assert!(a.is_empty());
    }
}
