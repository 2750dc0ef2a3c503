// Parent-child assembly over parsed MFT records.
// The root is the self-parented record; children are attached in
// insertion order and then validated top-down by BFS, so a malformed
// volume with cyclic parentage degrades to orphans instead of loops.

use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;
use strata_core::InspectorError;

use super::mft::MftRecord;
use crate::path::names_equal;

#[derive(Debug)]
pub struct DirectoryTree {
    records: HashMap<u64, MftRecord>,
    children: HashMap<u64, Vec<u64>>,
    root_id: u64,
}

impl DirectoryTree {
    pub fn build(parsed: Vec<MftRecord>) -> Result<Self, InspectorError> {
        let mut order = Vec::with_capacity(parsed.len());
        let mut records = HashMap::with_capacity(parsed.len());
        for record in parsed {
            order.push(record.file_id);
            records.insert(record.file_id, record);
        }

        // Root: self-parented record, smallest file id wins
        let root_id = order
            .iter()
            .copied()
            .filter(|id| records[id].parent_id() == *id)
            .min()
            .ok_or(InspectorError::NoRoot)?;

        // Candidate child lists keyed by parent, in insertion order; a
        // child link only exists where the child's parent pointer agrees
        let mut candidates: HashMap<u64, Vec<u64>> = HashMap::new();
        for &id in &order {
            let parent = records[&id].parent_id();
            if parent != id && records.contains_key(&parent) {
                candidates.entry(parent).or_default().push(id);
            }
        }

        // Validate top-down; each node is visited at most once, which
        // breaks mutual-parent cycles
        let mut children: HashMap<u64, Vec<u64>> = HashMap::new();
        let mut visited = HashSet::from([root_id]);
        let mut queue = VecDeque::from([root_id]);
        while let Some(id) = queue.pop_front() {
            let mut kept = Vec::new();
            for &child in candidates.get(&id).map(Vec::as_slice).unwrap_or(&[]) {
                if visited.insert(child) {
                    kept.push(child);
                    queue.push_back(child);
                }
            }
            children.insert(id, kept);
        }

        let orphans = order.len() - visited.len();
        if orphans > 0 {
            debug!("{} MFT records unreachable from root, skipped", orphans);
        }

        Ok(DirectoryTree {
            records,
            children,
            root_id,
        })
    }

    pub fn root_id(&self) -> u64 {
        self.root_id
    }

    pub fn record(&self, id: u64) -> Option<&MftRecord> {
        self.records.get(&id)
    }

    pub fn children(&self, id: u64) -> &[u64] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parent_of(&self, id: u64) -> Option<&MftRecord> {
        let record = self.records.get(&id)?;
        self.records.get(&record.parent_id())
    }

    pub fn is_leaf(&self, id: u64) -> bool {
        self.children(id).is_empty()
    }

    /// Children shown in listings: hidden and system records are left
    /// out.
    pub fn active_children(&self, id: u64) -> Vec<&MftRecord> {
        self.children(id)
            .iter()
            .filter_map(|child| self.records.get(child))
            .filter(|r| r.is_active())
            .collect()
    }

    /// Case-insensitive lookup among all children of a directory.
    pub fn find(&self, dir: u64, name: &str) -> Option<&MftRecord> {
        self.children(dir)
            .iter()
            .filter_map(|child| self.records.get(child))
            .find(|r| names_equal(r.long_name(), name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ntfs::mft::{FileData, FileName, StandardInfo};

    fn record(file_id: u64, parent_id: u64, name: &str, dos_flags: u32) -> MftRecord {
        MftRecord {
            file_id,
            standard_info: StandardInfo {
                created: 0,
                modified: 0,
                dos_flags,
            },
            file_name: FileName {
                parent_id,
                long_name: name.to_string(),
            },
            data: FileData::Resident {
                content: Vec::new(),
            },
            is_directory: true,
        }
    }

    #[test]
    fn test_root_and_children() {
        let tree = DirectoryTree::build(vec![
            record(5, 5, ".", 0),
            record(10, 5, "docs", 0),
            record(11, 10, "inner", 0),
        ])
        .unwrap();
        assert_eq!(tree.root_id(), 5);
        assert_eq!(tree.children(5), &[10]);
        assert_eq!(tree.children(10), &[11]);
        assert!(tree.is_leaf(11));
    }

    #[test]
    fn test_smallest_self_parent_wins() {
        let tree = DirectoryTree::build(vec![
            record(12, 12, "imposter", 0),
            record(5, 5, ".", 0),
            record(10, 5, "docs", 0),
        ])
        .unwrap();
        assert_eq!(tree.root_id(), 5);
    }

    #[test]
    fn test_no_root() {
        let err = DirectoryTree::build(vec![record(10, 5, "docs", 0), record(11, 10, "x", 0)])
            .unwrap_err();
        assert!(matches!(err, InspectorError::NoRoot));
    }

    #[test]
    fn test_mutual_parent_cycle_broken() {
        // 20 and 21 claim each other; neither is reachable from the root
        let tree = DirectoryTree::build(vec![
            record(5, 5, ".", 0),
            record(20, 21, "a", 0),
            record(21, 20, "b", 0),
            record(10, 5, "docs", 0),
        ])
        .unwrap();
        assert_eq!(tree.children(5), &[10]);
        assert!(tree.children(20).is_empty());
        assert!(tree.children(21).is_empty());
    }

    #[test]
    fn test_missing_parent_is_orphan() {
        let tree = DirectoryTree::build(vec![
            record(5, 5, ".", 0),
            record(30, 99, "lost", 0),
        ])
        .unwrap();
        assert!(tree.children(5).is_empty());
        // The record still exists, it just is not linked anywhere
        assert!(tree.record(30).is_some());
    }

    #[test]
    fn test_active_children_filter() {
        use strata_core::types::attr;
        let tree = DirectoryTree::build(vec![
            record(5, 5, ".", 0),
            record(10, 5, "visible", 0),
            record(11, 5, "hidden", attr::HIDDEN),
            record(12, 5, "system", attr::SYSTEM),
        ])
        .unwrap();
        let names: Vec<_> = tree
            .active_children(5)
            .iter()
            .map(|r| r.long_name().to_string())
            .collect();
        assert_eq!(names, vec!["visible"]);
        // Hidden records are still reachable by name
        assert!(tree.find(5, "HIDDEN").is_some());
    }

    #[test]
    fn test_find_case_insensitive() {
        let tree = DirectoryTree::build(vec![
            record(5, 5, ".", 0),
            record(10, 5, "Docs", 0),
        ])
        .unwrap();
        let found = tree.find(5, "dOCS").unwrap();
        assert_eq!(found.file_id, 10);
        let again = tree.find(5, found.long_name()).unwrap();
        assert_eq!(again.file_id, 10);
    }

    #[test]
    fn test_parent_lookup() {
        let tree = DirectoryTree::build(vec![
            record(5, 5, ".", 0),
            record(10, 5, "docs", 0),
        ])
        .unwrap();
        assert_eq!(tree.parent_of(10).unwrap().file_id, 5);
    }
}
