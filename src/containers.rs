//! Bounded priority queues used by the query engine.
//!
//! All three containers are max-heaps with respect to a [`Compare`]
//! implementation: the top element is the greatest, and the bounded variants
//! evict their tracked minimum when a better candidate arrives.

use std::collections::HashSet;
use std::hash::Hash;

use crate::base::Len;

/// Strict weak ordering used by the heap containers
pub trait Compare<T> {
    fn less(&self, a: &T, b: &T) -> bool;
}

pub(crate) fn sift_up<T, C: Compare<T>>(heap: &mut [T], mut pos: usize, cmp: &C) {
    while pos > 0 {
        let parent = (pos - 1) / 2;
        if cmp.less(&heap[parent], &heap[pos]) {
            heap.swap(parent, pos);
            pos = parent;
        } else {
            break;
        }
    }
}

pub(crate) fn sift_down<T, C: Compare<T>>(heap: &mut [T], mut pos: usize, cmp: &C) {
    let n = heap.len();
    loop {
        let left = 2 * pos + 1;
        if left >= n {
            break;
        }
        let mut child = left;
        let right = left + 1;
        if right < n && cmp.less(&heap[left], &heap[right]) {
            child = right;
        }
        if cmp.less(&heap[pos], &heap[child]) {
            heap.swap(pos, child);
            pos = child;
        } else {
            break;
        }
    }
}

pub(crate) fn heapify<T, C: Compare<T>>(heap: &mut [T], cmp: &C) {
    let n = heap.len();
    for pos in (0..n / 2).rev() {
        sift_down(heap, pos, cmp);
    }
}

pub(crate) fn push_heap<T, C: Compare<T>>(heap: &mut Vec<T>, value: T, cmp: &C) {
    heap.push(value);
    let last = heap.len() - 1;
    sift_up(heap, last, cmp);
}

pub(crate) fn pop_heap<T, C: Compare<T>>(heap: &mut Vec<T>, cmp: &C) -> Option<T> {
    if heap.is_empty() {
        return None;
    }
    let last = heap.len() - 1;
    heap.swap(0, last);
    let top = heap.pop();
    if !heap.is_empty() {
        sift_down(heap, 0, cmp);
    }
    top
}

/// Position of the first minimal element
fn min_position<T, C: Compare<T>>(heap: &[T], cmp: &C) -> usize {
    let mut best = 0;
    for pos in 1..heap.len() {
        if cmp.less(&heap[pos], &heap[best]) {
            best = pos;
        }
    }
    best
}

/// A max-heap holding at most `capacity` elements; once full, a push either
/// replaces the current minimum or is dropped.
pub struct FixedPriorityQueue<T, C: Compare<T>> {
    heap: Vec<T>,
    capacity: usize,
    cmp: C,
    min_pos: usize,
}

impl<T, C: Compare<T>> FixedPriorityQueue<T, C> {
    pub fn new(capacity: usize, cmp: C) -> Self {
        assert!(capacity > 0, "capacity must be positive");
        FixedPriorityQueue {
            heap: Vec::with_capacity(capacity),
            capacity,
            cmp,
            min_pos: 0,
        }
    }

    pub fn push(&mut self, x: T) {
        if self.heap.len() == self.capacity {
            if self.cmp.less(&x, &self.heap[self.min_pos]) {
                return;
            }
            self.heap[self.min_pos] = x;
            heapify(&mut self.heap, &self.cmp);
        } else {
            push_heap(&mut self.heap, x, &self.cmp);
        }
        self.min_pos = min_position(&self.heap, &self.cmp);
    }

    pub fn pop(&mut self) -> Option<T> {
        let top = pop_heap(&mut self.heap, &self.cmp);
        self.min_pos = min_position(&self.heap, &self.cmp);
        top
    }

    pub fn peek(&self) -> Option<&T> {
        self.heap.first()
    }

    pub fn minimum(&self) -> Option<&T> {
        self.heap.get(self.min_pos)
    }

    pub fn full(&self) -> bool {
        self.heap.len() == self.capacity
    }

    pub fn into_vec(self) -> Vec<T> {
        self.heap
    }
}

impl<T, C: Compare<T>> Len for FixedPriorityQueue<T, C> {
    fn len(&self) -> usize {
        self.heap.len()
    }
}

/// A [`FixedPriorityQueue`] that additionally rejects duplicates and silently
/// ignores a sentinel value.
///
/// `try_push` reports `false` only when the candidate was rejected for being
/// below the minimum of a full heap; sentinel and duplicate pushes count as
/// accepted.
pub struct UniqueFixedPriorityQueue<T, C>
where
    T: Clone + Eq + Hash,
    C: Compare<T>,
{
    heap: Vec<T>,
    capacity: usize,
    cmp: C,
    sentinel: T,
    contained: HashSet<T>,
    min_pos: usize,
}

impl<T, C> UniqueFixedPriorityQueue<T, C>
where
    T: Clone + Eq + Hash,
    C: Compare<T>,
{
    pub fn new(capacity: usize, sentinel: T, cmp: C) -> Self {
        assert!(capacity > 0, "capacity must be positive");
        UniqueFixedPriorityQueue {
            heap: Vec::with_capacity(capacity),
            capacity,
            cmp,
            sentinel,
            contained: HashSet::new(),
            min_pos: 0,
        }
    }

    pub fn push(&mut self, x: T) {
        self.try_push(x);
    }

    pub fn try_push(&mut self, x: T) -> bool {
        if x == self.sentinel {
            return true;
        }
        if self.contained.contains(&x) {
            return true;
        }

        if self.heap.len() == self.capacity {
            if self.cmp.less(&x, &self.heap[self.min_pos]) {
                return false;
            }
            let evicted = std::mem::replace(&mut self.heap[self.min_pos], x.clone());
            self.contained.remove(&evicted);
            heapify(&mut self.heap, &self.cmp);
        } else {
            push_heap(&mut self.heap, x.clone(), &self.cmp);
        }

        self.contained.insert(x);
        self.min_pos = min_position(&self.heap, &self.cmp);
        true
    }

    pub fn pop(&mut self) -> Option<T> {
        let top = pop_heap(&mut self.heap, &self.cmp);
        self.min_pos = min_position(&self.heap, &self.cmp);
        top
    }

    pub fn minimum(&self) -> Option<&T> {
        self.heap.get(self.min_pos)
    }

    pub fn sentinel(&self) -> &T {
        &self.sentinel
    }

    pub fn full(&self) -> bool {
        self.heap.len() == self.capacity
    }

    pub fn into_vec(self) -> Vec<T> {
        self.heap
    }
}

impl<T, C> Len for UniqueFixedPriorityQueue<T, C>
where
    T: Clone + Eq + Hash,
    C: Compare<T>,
{
    fn len(&self) -> usize {
        self.heap.len()
    }
}

/// A max-heap whose top element can be mutated in place and then reinserted
/// at its updated priority, avoiding a pop/push pair.
pub struct ReinsertablePriorityQueue<T, C: Compare<T>> {
    heap: Vec<T>,
    cmp: C,
}

impl<T, C: Compare<T>> ReinsertablePriorityQueue<T, C> {
    pub fn new(cmp: C) -> Self {
        ReinsertablePriorityQueue {
            heap: Vec::new(),
            cmp,
        }
    }

    pub fn push(&mut self, x: T) {
        push_heap(&mut self.heap, x, &self.cmp);
    }

    pub fn peek(&self) -> Option<&T> {
        self.heap.first()
    }

    /// Mutable access to the top element; callers must follow the mutation
    /// with [`reinsert`](Self::reinsert) or [`pop`](Self::pop).
    pub fn top_mut(&mut self) -> Option<&mut T> {
        self.heap.first_mut()
    }

    /// Restores the heap property after the top element was mutated
    pub fn reinsert(&mut self) {
        sift_down(&mut self.heap, 0, &self.cmp);
    }

    pub fn pop(&mut self) -> Option<T> {
        pop_heap(&mut self.heap, &self.cmp)
    }
}

impl<T, C: Compare<T>> Len for ReinsertablePriorityQueue<T, C> {
    fn len(&self) -> usize {
        self.heap.len()
    }
}
