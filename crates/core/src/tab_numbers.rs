use std::collections::BTreeSet;

/// Numbers in use by editor tabs. New tabs take the smallest free number.
#[derive(Debug, Clone, Default)]
pub struct TabNumbers {
    in_use: BTreeSet<usize>,
}

impl TabNumbers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self) -> usize {
        let mut candidate = 0;
        for used in &self.in_use {
            if *used != candidate {
                break;
            }
            candidate += 1;
        }
        self.in_use.insert(candidate);
        candidate
    }

    pub fn release(&mut self, number: usize) -> bool {
        self.in_use.remove(&number)
    }

    #[must_use]
    pub fn is_in_use(&self, number: usize) -> bool {
        self.in_use.contains(&number)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.in_use.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.in_use.is_empty()
    }
}
