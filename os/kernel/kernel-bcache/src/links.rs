//! Circular doubly linked lists over integer handles.
//!
//! A [`Links`] arena holds one `prev`/`next` pair per node. Buffer slots are
//! nodes `0..slots`; the nodes after them are list heads (sentinels). An
//! unlinked node points at itself, exactly like an empty head, so unlinking
//! an already unlinked node is a no-op.

use alloc::vec::Vec;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Link {
    prev: usize,
    next: usize,
}

pub(crate) struct Links {
    nodes: Vec<Link>,
}

impl Links {
    /// Creates `len` nodes, each alone on its own list.
    pub(crate) fn new(len: usize) -> Self {
        Self {
            nodes: (0..len).map(|n| Link { prev: n, next: n }).collect(),
        }
    }

    pub(crate) fn is_linked(&self, node: usize) -> bool {
        self.nodes[node].next != node
    }

    pub(crate) fn unlink(&mut self, node: usize) {
        let Link { prev, next } = self.nodes[node];
        self.nodes[prev].next = next;
        self.nodes[next].prev = prev;
        self.nodes[node] = Link {
            prev: node,
            next: node,
        };
    }

    /// Links `node` right after `at`.
    pub(crate) fn insert_after(&mut self, at: usize, node: usize) {
        debug_assert!(!self.is_linked(node));
        let next = self.nodes[at].next;
        self.nodes[node] = Link { prev: at, next };
        self.nodes[next].prev = node;
        self.nodes[at].next = node;
    }

    /// Links `node` right before `at`; before a head means at the tail.
    pub(crate) fn insert_before(&mut self, at: usize, node: usize) {
        let prev = self.nodes[at].prev;
        self.insert_after(prev, node);
    }

    /// First element of the list headed by `head`.
    pub(crate) fn first(&self, head: usize) -> Option<usize> {
        let n = self.nodes[head].next;
        (n != head).then_some(n)
    }

    /// Elements of the list headed by `head`, front to back.
    pub(crate) fn iter(&self, head: usize) -> impl Iterator<Item = usize> + '_ {
        let mut cur = self.nodes[head].next;
        core::iter::from_fn(move || {
            (cur != head).then(|| {
                let n = cur;
                cur = self.nodes[n].next;
                n
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEAD: usize = 4;

    fn list(l: &Links) -> Vec<usize> {
        l.iter(HEAD).collect()
    }

    #[test]
    fn head_and_tail_insertion() {
        let mut l = Links::new(5);
        assert_eq!(l.first(HEAD), None);

        l.insert_before(HEAD, 0);
        l.insert_before(HEAD, 1);
        l.insert_after(HEAD, 2);
        assert_eq!(list(&l), [2, 0, 1]);
        assert_eq!(l.first(HEAD), Some(2));
    }

    #[test]
    fn unlink_restores_self_loop() {
        let mut l = Links::new(5);
        for n in 0..4 {
            l.insert_before(HEAD, n);
        }
        l.unlink(1);
        assert!(!l.is_linked(1));
        assert_eq!(list(&l), [0, 2, 3]);

        // unlinking twice changes nothing
        l.unlink(1);
        assert_eq!(list(&l), [0, 2, 3]);

        l.unlink(0);
        l.unlink(3);
        l.unlink(2);
        assert_eq!(l.first(HEAD), None);
        assert!(!l.is_linked(HEAD));
    }
}
