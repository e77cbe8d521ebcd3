use std::collections::VecDeque;

use crate::options::ExplorationStrategy;

/// The frontier of a lazy state-space exploration.
pub trait ExplorationQueue<I> {
    fn push(&mut self, item: I);
    fn pop(&mut self) -> Option<I>;
}

pub struct BfsQueue<I> {
    queue: VecDeque<I>,
}

impl<I> BfsQueue<I> {
    pub fn with_capacity(capacity: usize) -> Self {
        BfsQueue {
            queue: VecDeque::with_capacity(capacity),
        }
    }
}

impl<I> ExplorationQueue<I> for BfsQueue<I> {
    fn push(&mut self, item: I) {
        self.queue.push_back(item);
    }

    fn pop(&mut self) -> Option<I> {
        self.queue.pop_front()
    }
}

pub struct DfsQueue<I> {
    queue: Vec<I>,
}

impl<I> DfsQueue<I> {
    pub fn with_capacity(capacity: usize) -> Self {
        DfsQueue {
            queue: Vec::with_capacity(capacity),
        }
    }
}

impl<I> ExplorationQueue<I> for DfsQueue<I> {
    fn push(&mut self, item: I) {
        self.queue.push(item);
    }

    fn pop(&mut self) -> Option<I> {
        self.queue.pop()
    }
}

/// A queue for the configured strategy, dispatched without boxing.
pub enum StrategyQueue<I> {
    Bfs(BfsQueue<I>),
    Dfs(DfsQueue<I>),
}

impl<I> StrategyQueue<I> {
    pub fn new(strategy: ExplorationStrategy, capacity: usize) -> Self {
        match strategy {
            ExplorationStrategy::Bfs => Self::Bfs(BfsQueue::with_capacity(capacity)),
            ExplorationStrategy::Dfs => Self::Dfs(DfsQueue::with_capacity(capacity)),
        }
    }
}

impl<I> ExplorationQueue<I> for StrategyQueue<I> {
    fn push(&mut self, item: I) {
        match self {
            Self::Bfs(queue) => queue.push(item),
            Self::Dfs(queue) => queue.push(item),
        }
    }

    fn pop(&mut self) -> Option<I> {
        match self {
            Self::Bfs(queue) => queue.pop(),
            Self::Dfs(queue) => queue.pop(),
        }
    }
}
