/// Sorted address collection used for membership tests during reconciliation

use std::slice;

/// An immutable, sorted list of backend addresses.
///
/// Built once from an unsorted list. Duplicates are not removed; a duplicated
/// address simply tests as present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressSet {
    addrs: Vec<String>,
}

impl AddressSet {
    /// Sort the given addresses into a set
    pub fn new(mut addrs: Vec<String>) -> Self {
        addrs.sort_unstable();
        Self { addrs }
    }

    /// Binary search for an exact address match
    pub fn contains(&self, addr: &str) -> bool {
        self.addrs
            .binary_search_by(|entry| entry.as_str().cmp(addr))
            .is_ok()
    }

    pub fn len(&self) -> usize {
        self.addrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.addrs.is_empty()
    }

    /// Iterate addresses in sorted order
    pub fn iter(&self) -> slice::Iter<'_, String> {
        self.addrs.iter()
    }
}

impl From<Vec<String>> for AddressSet {
    fn from(addrs: Vec<String>) -> Self {
        Self::new(addrs)
    }
}

impl FromIterator<String> for AddressSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a AddressSet {
    type Item = &'a String;
    type IntoIter = slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(addrs: &[&str]) -> AddressSet {
        addrs.iter().map(|a| a.to_string()).collect()
    }

    #[test]
    fn test_contains_matches_input_membership() {
        let input = ["10.0.0.3:80", "10.0.0.1:80", "host-b:9000", "host-a:9000"];
        let addrs = set(&input);

        for addr in input {
            assert!(addrs.contains(addr), "{addr} should be present");
        }
        for addr in ["10.0.0.2:80", "host-a:900", "", "host-a:9000 "] {
            assert!(!addrs.contains(addr), "{addr:?} should be absent");
        }
    }

    #[test]
    fn test_sorted_iteration() {
        let addrs = set(&["c:1", "a:1", "b:1"]);
        let ordered: Vec<&str> = addrs.iter().map(String::as_str).collect();
        assert_eq!(ordered, vec!["a:1", "b:1", "c:1"]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let addrs = set(&["a:1", "b:1", "a:1"]);
        assert_eq!(addrs.len(), 3);
        assert!(addrs.contains("a:1"));
        assert!(addrs.contains("b:1"));
    }

    #[test]
    fn test_empty_set() {
        let addrs = AddressSet::default();
        assert!(addrs.is_empty());
        assert!(!addrs.contains("a:1"));
        assert_eq!(AddressSet::new(Vec::new()), addrs);
    }
}
