//! Iterators over a [`HashTable`].

use std::iter::FusedIterator;

use smallvec::SmallVec;

use crate::bucket::Bucket;
use crate::digest::DIGEST_LEN;
use crate::index::{Index, Slot, INDEX_SIZE};
use crate::table::{Entry, HashTable};

/// Depth-first iterator over the entries of a [`HashTable`].
///
/// Yields entries in the same order as [`HashTable::first_key`] /
/// [`HashTable::next_key`], but keeps its position on an explicit stack
/// instead of re-deriving it from the previous key. The borrow on the table
/// rules out mutation while iterating.
pub struct Iter<'a> {
    /// Index nodes on the current path with the next slot to visit in each.
    stack: SmallVec<[(&'a Index, usize); DIGEST_LEN]>,
    chain: Option<&'a Bucket>,
    remaining: usize,
}

impl<'a> Iter<'a> {
    pub(crate) fn new(root: &'a Index, len: usize) -> Self {
        let mut stack = SmallVec::new();
        stack.push((root, 0));
        Self {
            stack,
            chain: None,
            remaining: len,
        }
    }
}

impl<'a> Iterator for Iter<'a> {
    type Item = Entry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(bucket) = self.chain {
                self.chain = bucket.next();
                self.remaining -= 1;
                return Some(Entry::new(bucket));
            }

            let top = self.stack.last_mut()?;
            let (index, pos) = *top;
            if pos == INDEX_SIZE {
                self.stack.pop();
                continue;
            }
            top.1 += 1;

            match index.slot(pos) {
                Slot::Empty => {}
                Slot::Chain(head) => self.chain = Some(&**head),
                Slot::Index(child) => self.stack.push((&**child, 0)),
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl FusedIterator for Iter<'_> {}

/// Iterator over keys driven by [`HashTable::next_key`].
///
/// Each step looks the previous key up again, so this is slower than
/// [`Iter`]; it exists for callers that hold on to keys rather than to an
/// iterator between steps.
pub struct Keys<'a> {
    table: &'a HashTable,
    prev: Option<&'a [u8]>,
    started: bool,
}

impl<'a> Keys<'a> {
    pub(crate) fn new(table: &'a HashTable) -> Self {
        Self {
            table,
            prev: None,
            started: false,
        }
    }
}

impl<'a> Iterator for Keys<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let key = if self.started {
            self.table.next_key(self.prev?)
        } else {
            self.started = true;
            self.table.first_key()
        };
        self.prev = key;
        key
    }
}

impl FusedIterator for Keys<'_> {}
