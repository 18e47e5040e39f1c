//! Recently used entries

use std::collections::VecDeque;

use uuid::Uuid;

/// Default number of remembered entries
pub const DEFAULT_RUE_SIZE: usize = 10;

/// Most recently used entries, newest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RueList {
    items: VecDeque<Uuid>,
    max: usize,
}

impl Default for RueList {
    fn default() -> Self {
        Self::new(DEFAULT_RUE_SIZE)
    }
}

impl RueList {
    pub fn new(max: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(max),
            max,
        }
    }

    /// Move `uuid` to the front, dropping the oldest beyond the maximum
    pub fn touch(&mut self, uuid: &Uuid) {
        self.items.retain(|u| u != uuid);
        self.items.push_front(*uuid);
        self.items.truncate(self.max);
    }

    pub fn remove(&mut self, uuid: &Uuid) {
        self.items.retain(|u| u != uuid);
    }

    pub fn set_max(&mut self, max: usize) {
        self.max = max;
        self.items.truncate(max);
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Uuid> {
        self.items.iter()
    }

    /// Header form: concatenated 32-digit hex UUIDs
    pub fn to_header_string(&self) -> String {
        self.items.iter().map(|u| u.simple().to_string()).collect()
    }

    /// Parse the header form, ignoring a trailing partial UUID
    pub fn from_header_string(s: &str, max: usize) -> Self {
        let mut list = Self::new(max);
        let mut rest = s;
        while rest.len() >= 32 {
            let (chunk, tail) = rest.split_at(32);
            match Uuid::try_parse(chunk) {
                Ok(uuid) if list.items.len() < max => list.items.push_back(uuid),
                Ok(_) => break,
                Err(_) => log::warn!("Skipping malformed RUE entry"),
            }
            rest = tail;
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touch_moves_to_front() {
        let mut rue = RueList::new(3);
        let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
        for id in &ids {
            rue.touch(id);
        }
        assert_eq!(rue.len(), 3);
        rue.touch(&ids[2]);
        let order: Vec<Uuid> = rue.iter().copied().collect();
        assert_eq!(order, vec![ids[2], ids[3], ids[1]]);
    }

    #[test]
    fn test_header_roundtrip() {
        let mut rue = RueList::new(5);
        rue.touch(&Uuid::new_v4());
        rue.touch(&Uuid::new_v4());
        let s = rue.to_header_string();
        assert_eq!(s.len(), 64);
        assert_eq!(RueList::from_header_string(&s, 5), rue);
        assert_eq!(RueList::from_header_string(&s, 1).len(), 1);
    }
}
