//! Intrusive doubly linked lists over [`BlockPool`] slots.
//!
//! The links live inside the pooled values, so insertion and removal are
//! O(1) and need no allocation.

use super::pool::{BlockPool, Handle};

/// Neighbors of a value in a [`List`].
pub struct Links<T> {
    prev: Option<Handle<T>>,
    next: Option<Handle<T>>,
}

impl<T> Default for Links<T> {
    fn default() -> Self {
        Self {
            prev: None,
            next: None,
        }
    }
}

impl<T> Clone for Links<T> {
    fn clone(&self) -> Self {
        Self {
            prev: self.prev,
            next: self.next,
        }
    }
}

impl<T> std::fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Links")
            .field("prev", &self.prev)
            .field("next", &self.next)
            .finish()
    }
}

/// Values that carry their own list links.
pub trait Linked: Sized {
    fn links(&self) -> &Links<Self>;
    fn links_mut(&mut self) -> &mut Links<Self>;
}

pub struct List<T> {
    head: Option<Handle<T>>,
    len: usize,
}

impl<T> Default for List<T> {
    fn default() -> Self {
        Self { head: None, len: 0 }
    }
}

impl<T> std::fmt::Debug for List<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("List")
            .field("head", &self.head)
            .field("len", &self.len)
            .finish()
    }
}

impl<T: Linked> List<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn head(&self) -> Option<Handle<T>> {
        self.head
    }

    /// The element after `handle`.
    pub fn next(&self, pool: &BlockPool<T>, handle: Handle<T>) -> Option<Handle<T>> {
        pool[handle].links().next
    }

    pub fn push_front(&mut self, pool: &mut BlockPool<T>, handle: Handle<T>) {
        {
            let links = pool[handle].links_mut();
            debug_assert!(links.prev.is_none() && links.next.is_none());
            links.prev = None;
            links.next = self.head;
        }
        if let Some(head) = self.head {
            pool[head].links_mut().prev = Some(handle);
        }
        self.head = Some(handle);
        self.len += 1;
    }

    pub fn remove(&mut self, pool: &mut BlockPool<T>, handle: Handle<T>) {
        let Links { prev, next } = std::mem::take(pool[handle].links_mut());
        match prev {
            Some(prev) => pool[prev].links_mut().next = next,
            None => {
                debug_assert_eq!(self.head, Some(handle));
                self.head = next;
            }
        }
        if let Some(next) = next {
            pool[next].links_mut().prev = prev;
        }
        self.len -= 1;
    }

    /// Handles in list order, most recently inserted first.
    pub fn iter<'a>(&self, pool: &'a BlockPool<T>) -> Iter<'a, T> {
        Iter {
            pool,
            current: self.head,
        }
    }
}

pub struct Iter<'a, T> {
    pool: &'a BlockPool<T>,
    current: Option<Handle<T>>,
}

impl<'a, T: Linked> Iterator for Iter<'a, T> {
    type Item = (Handle<T>, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let handle = self.current?;
        let value = &self.pool[handle];
        self.current = value.links().next;
        Some((handle, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolConfig;

    #[derive(Default)]
    struct Node {
        value: u32,
        links: Links<Node>,
    }

    impl Linked for Node {
        fn links(&self) -> &Links<Self> {
            &self.links
        }

        fn links_mut(&mut self) -> &mut Links<Self> {
            &mut self.links
        }
    }

    fn values(list: &List<Node>, pool: &BlockPool<Node>) -> Vec<u32> {
        list.iter(pool).map(|(_, n)| n.value).collect()
    }

    #[test]
    fn test_push_and_remove() {
        let mut pool = BlockPool::new(&PoolConfig::default());
        let mut list = List::new();
        let handles: Vec<_> = (0..4)
            .map(|value| {
                let h = pool.allocate(Node {
                    value,
                    ..Default::default()
                });
                list.push_front(&mut pool, h);
                h
            })
            .collect();
        assert_eq!(values(&list, &pool), vec![3, 2, 1, 0]);

        list.remove(&mut pool, handles[2]);
        assert_eq!(values(&list, &pool), vec![3, 1, 0]);
        list.remove(&mut pool, handles[3]);
        assert_eq!(values(&list, &pool), vec![1, 0]);
        list.remove(&mut pool, handles[0]);
        assert_eq!(values(&list, &pool), vec![1]);
        assert_eq!(list.len(), 1);

        list.remove(&mut pool, handles[1]);
        assert!(list.is_empty());
        assert!(list.head().is_none());
    }

    #[test]
    fn test_removed_node_can_be_reinserted() {
        let mut pool = BlockPool::new(&PoolConfig::default());
        let mut list = List::new();
        let a = pool.allocate(Node::default());
        list.push_front(&mut pool, a);
        list.remove(&mut pool, a);
        list.push_front(&mut pool, a);
        assert_eq!(list.len(), 1);
    }
}
