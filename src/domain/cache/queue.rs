//! Prefetch Queue - 预取队列
//!
//! 按 (priority, enqueue_order) 全序排列的待下载条目。
//! priority 取自距播放位置的距离，越小越紧急；同优先级按入队顺序 FIFO。

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// 队列项
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefetchQueueItem {
    pub path: String,
    pub priority: u32,
    pub enqueue_order: u64,
    /// 显式请求（如整本缓存），不受 cache-ahead 窗口裁剪
    #[serde(default)]
    pub explicit: bool,
}

type QueueKey = (u32, u64);

/// 预取队列
#[derive(Debug, Default)]
pub struct PrefetchQueue {
    items: BTreeMap<QueueKey, PrefetchQueueItem>,
    index: HashMap<String, QueueKey>,
    next_order: u64,
}

impl PrefetchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.index.contains_key(path)
    }

    /// 入队，路径已存在时返回 None
    pub fn push(&mut self, path: impl Into<String>, priority: u32, explicit: bool) -> Option<&PrefetchQueueItem> {
        let path = path.into();
        if self.index.contains_key(&path) {
            return None;
        }
        let key = (priority, self.next_order);
        self.next_order += 1;
        self.index.insert(path.clone(), key);
        self.items.insert(
            key,
            PrefetchQueueItem {
                path,
                priority,
                enqueue_order: key.1,
                explicit,
            },
        );
        self.items.get(&key)
    }

    /// 已排队的项按新的优先级重新入队，返回路径是否在队列中
    ///
    /// 显式项保持原位置；非显式项取新的优先级和入队序号
    pub fn refresh(&mut self, path: &str, priority: u32, explicit: bool) -> bool {
        let Some(key) = self.index.get(path).copied() else {
            return false;
        };
        let Some(item) = self.items.get_mut(&key) else {
            return false;
        };
        if item.explicit {
            return true;
        }
        if explicit {
            item.explicit = true;
            return true;
        }

        let Some(mut item) = self.items.remove(&key) else {
            return true;
        };
        let key = (priority, self.next_order);
        self.next_order += 1;
        item.priority = priority;
        item.enqueue_order = key.1;
        self.index.insert(item.path.clone(), key);
        self.items.insert(key, item);
        true
    }

    /// 取出最高优先级的项
    pub fn pop(&mut self) -> Option<PrefetchQueueItem> {
        let (_, item) = self.items.pop_first()?;
        self.index.remove(&item.path);
        Some(item)
    }

    pub fn remove(&mut self, path: &str) -> Option<PrefetchQueueItem> {
        let key = self.index.remove(path)?;
        self.items.remove(&key)
    }

    /// 删除所有满足条件的项，按队列顺序返回
    pub fn remove_matching<F>(&mut self, mut pred: F) -> Vec<PrefetchQueueItem>
    where
        F: FnMut(&PrefetchQueueItem) -> bool,
    {
        let keys: Vec<QueueKey> = self
            .items
            .iter()
            .filter(|(_, item)| pred(item))
            .map(|(key, _)| *key)
            .collect();

        keys.into_iter()
            .filter_map(|key| {
                let item = self.items.remove(&key)?;
                self.index.remove(&item.path);
                Some(item)
            })
            .collect()
    }

    /// 将非显式的预读项裁剪到 `window` 个，返回被裁掉的项
    pub fn trim_urgent(&mut self, window: usize) -> Vec<PrefetchQueueItem> {
        let mut seen = 0usize;
        self.remove_matching(|item| {
            if item.explicit {
                return false;
            }
            seen += 1;
            seen > window
        })
    }

    /// 有序快照
    pub fn snapshot(&self) -> Vec<PrefetchQueueItem> {
        self.items.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(items: &[PrefetchQueueItem]) -> Vec<&str> {
        items.iter().map(|i| i.path.as_str()).collect()
    }

    #[test]
    fn test_ordering_by_priority_then_fifo() {
        let mut queue = PrefetchQueue::new();
        queue.push("/1/audio/c.mp3", 3, false);
        queue.push("/1/audio/a.mp3", 1, false);
        queue.push("/1/audio/b1.mp3", 2, false);
        queue.push("/1/audio/b2.mp3", 2, false);

        let snapshot = queue.snapshot();
        assert_eq!(
            paths(&snapshot),
            vec!["/1/audio/a.mp3", "/1/audio/b1.mp3", "/1/audio/b2.mp3", "/1/audio/c.mp3"]
        );
        assert_eq!(queue.pop().unwrap().path, "/1/audio/a.mp3");
        assert_eq!(queue.len(), 3);
        assert!(!queue.contains("/1/audio/a.mp3"));
    }

    #[test]
    fn test_duplicate_push_is_ignored() {
        let mut queue = PrefetchQueue::new();
        assert!(queue.push("/1/audio/a.mp3", 1, false).is_some());
        assert!(queue.push("/1/audio/a.mp3", 0, false).is_none());
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.snapshot()[0].priority, 1);
    }

    #[test]
    fn test_refresh_moves_look_ahead_item_behind_fresh_ones() {
        let mut queue = PrefetchQueue::new();
        queue.push("/1/audio/old.mp3", 1, false);
        queue.push("/1/audio/new.mp3", 2, false);

        assert!(queue.refresh("/1/audio/old.mp3", 2, false));
        let snapshot = queue.snapshot();
        assert_eq!(paths(&snapshot), vec!["/1/audio/new.mp3", "/1/audio/old.mp3"]);
        assert_eq!(snapshot[1].priority, 2);
        assert!(snapshot[1].enqueue_order > snapshot[0].enqueue_order);

        assert_eq!(queue.trim_urgent(1).len(), 1);
        assert_eq!(paths(&queue.snapshot()), vec!["/1/audio/new.mp3"]);
    }

    #[test]
    fn test_refresh_keeps_explicit_position() {
        let mut queue = PrefetchQueue::new();
        queue.push("/1/audio/whole.mp3", 1, true);
        queue.push("/1/audio/a.mp3", 3, false);

        assert!(queue.refresh("/1/audio/whole.mp3", 9, false));
        assert!(queue.refresh("/1/audio/a.mp3", 0, true));
        let snapshot = queue.snapshot();
        assert_eq!(paths(&snapshot), vec!["/1/audio/whole.mp3", "/1/audio/a.mp3"]);
        assert!(snapshot[1].explicit);
        assert_eq!(snapshot[1].priority, 3);

        assert!(!queue.refresh("/1/audio/missing.mp3", 0, false));
    }

    #[test]
    fn test_remove_matching_prefix() {
        let mut queue = PrefetchQueue::new();
        queue.push("/1/audio/a.mp3", 1, false);
        queue.push("/2/audio/b.mp3", 2, false);
        queue.push("/1/audio/c.mp3", 3, false);

        let removed = queue.remove_matching(|i| i.path.starts_with("/1/audio/"));
        assert_eq!(paths(&removed), vec!["/1/audio/a.mp3", "/1/audio/c.mp3"]);
        assert_eq!(paths(&queue.snapshot()), vec!["/2/audio/b.mp3"]);
        assert!(queue.remove("/1/audio/a.mp3").is_none());
    }

    #[test]
    fn test_trim_keeps_explicit_items() {
        let mut queue = PrefetchQueue::new();
        for i in 1..=5 {
            queue.push(format!("/1/audio/{}.mp3", i), i, false);
        }
        queue.push("/1/audio/whole.mp3", 10, true);

        let trimmed = queue.trim_urgent(3);
        assert_eq!(paths(&trimmed), vec!["/1/audio/4.mp3", "/1/audio/5.mp3"]);
        assert_eq!(
            paths(&queue.snapshot()),
            vec!["/1/audio/1.mp3", "/1/audio/2.mp3", "/1/audio/3.mp3", "/1/audio/whole.mp3"]
        );
    }
}
