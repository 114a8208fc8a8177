//! Task storage
//!
//! The sequencer talks to its registry of in-flight tasks only through
//! [`TaskStore`], so the backing implementation can be swapped.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::task::Task;

/// Registry of in-flight tasks keyed by id
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert(&self, task: Task);

    async fn get(&self, id: &str) -> Option<Task>;

    /// Replace a stored task. Returns false if it was not registered.
    async fn update(&self, task: Task) -> bool;

    async fn remove(&self, id: &str) -> Option<Task>;

    /// All tasks, oldest first
    async fn list(&self) -> Vec<Task>;

    async fn len(&self) -> usize;
}

/// In-memory store
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn insert(&self, task: Task) {
        let mut tasks = self.tasks.write().await;
        tasks.insert(task.id.clone(), task);
    }

    async fn get(&self, id: &str) -> Option<Task> {
        let tasks = self.tasks.read().await;
        tasks.get(id).cloned()
    }

    async fn update(&self, task: Task) -> bool {
        let mut tasks = self.tasks.write().await;
        match tasks.get_mut(&task.id) {
            Some(existing) => {
                *existing = task;
                true
            }
            None => false,
        }
    }

    async fn remove(&self, id: &str) -> Option<Task> {
        let mut tasks = self.tasks.write().await;
        tasks.remove(id)
    }

    async fn list(&self) -> Vec<Task> {
        let tasks = self.tasks.read().await;
        let mut list: Vec<Task> = tasks.values().cloned().collect();
        list.sort_by_key(|t| t.seq);
        list
    }

    async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }
}
