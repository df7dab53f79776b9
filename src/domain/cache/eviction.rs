//! LRU 淘汰选择
//!
//! 纯函数：给定当前条目和受保护路径，计算为写入 `incoming` 字节需要淘汰哪些条目

use super::entry::CacheEntry;

/// 即使淘汰全部可淘汰条目也放不下
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaShortfall {
    pub incoming: u64,
    pub limit: u64,
    /// 淘汰全部可淘汰条目后仍占用的字节数
    pub pinned_bytes: u64,
}

/// 淘汰计划
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvictionPlan {
    /// 按淘汰顺序排列的路径
    pub victims: Vec<String>,
    pub freed_bytes: u64,
}

/// 计算淘汰计划
///
/// - 只考虑 Cached 条目
/// - `is_protected` 返回 true 的路径不可淘汰（正在播放、排队中、下载中）
/// - `reserved` 为其他正在提交中的写入所预留的字节
/// - 按 (last_access, insert_order) 升序淘汰，直到 `已用 + incoming <= limit`
pub fn plan_eviction<'a, I, F>(
    entries: I,
    is_protected: F,
    reserved: u64,
    incoming: u64,
    limit: u64,
) -> Result<EvictionPlan, QuotaShortfall>
where
    I: IntoIterator<Item = &'a CacheEntry>,
    F: Fn(&str) -> bool,
{
    let mut used = reserved;
    let mut eligible: Vec<&CacheEntry> = Vec::new();

    for entry in entries.into_iter().filter(|e| e.is_cached()) {
        used += entry.size_bytes;
        if !is_protected(&entry.path) {
            eligible.push(entry);
        }
    }

    if used + incoming <= limit {
        return Ok(EvictionPlan::default());
    }

    let eligible_bytes: u64 = eligible.iter().map(|e| e.size_bytes).sum();
    let pinned_bytes = used - eligible_bytes;
    if pinned_bytes + incoming > limit {
        return Err(QuotaShortfall {
            incoming,
            limit,
            pinned_bytes,
        });
    }

    eligible.sort_by_key(|e| (e.last_access, e.insert_order));

    let mut plan = EvictionPlan::default();
    for entry in eligible {
        if used - plan.freed_bytes + incoming <= limit {
            break;
        }
        plan.freed_bytes += entry.size_bytes;
        plan.victims.push(entry.path.clone());
    }

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::entry::EntryState;

    fn entry(path: &str, size: u64, access: u64, order: u64) -> CacheEntry {
        CacheEntry::cached(path, size, access, order)
    }

    #[test]
    fn test_no_eviction_when_fits() {
        let entries = vec![entry("a", 3, 1, 1), entry("b", 3, 2, 2)];
        let plan = plan_eviction(&entries, |_| false, 0, 2, 8).unwrap();
        assert!(plan.victims.is_empty());
    }

    #[test]
    fn test_evicts_least_recently_used_until_fit() {
        // 10 单位已缓存，上限 8，写入 2 → 需要降到 6
        let entries = vec![
            entry("old", 3, 1, 1),
            entry("mid", 3, 2, 2),
            entry("new", 4, 3, 3),
        ];
        let plan = plan_eviction(&entries, |_| false, 0, 2, 8).unwrap();
        assert_eq!(plan.victims, vec!["old", "mid"]);
        assert_eq!(plan.freed_bytes, 6);
    }

    #[test]
    fn test_ties_broken_by_insert_order() {
        let entries = vec![entry("second", 2, 5, 2), entry("first", 2, 5, 1)];
        let plan = plan_eviction(&entries, |_| false, 0, 1, 4).unwrap();
        assert_eq!(plan.victims, vec!["first"]);
    }

    #[test]
    fn test_protected_entries_are_skipped() {
        let entries = vec![entry("playing", 4, 1, 1), entry("other", 4, 2, 2)];
        let plan = plan_eviction(&entries, |p| p == "playing", 0, 4, 8).unwrap();
        assert_eq!(plan.victims, vec!["other"]);
    }

    #[test]
    fn test_shortfall_when_item_exceeds_quota() {
        let entries = vec![entry("a", 2, 1, 1)];
        let err = plan_eviction(&entries, |_| false, 0, 9, 8).unwrap_err();
        assert_eq!(err.incoming, 9);
        assert_eq!(err.pinned_bytes, 0);
    }

    #[test]
    fn test_shortfall_counts_protected_and_reserved() {
        let entries = vec![entry("playing", 5, 1, 1), entry("a", 1, 2, 2)];
        let err = plan_eviction(&entries, |p| p == "playing", 2, 2, 8).unwrap_err();
        assert_eq!(err.pinned_bytes, 7);
    }

    #[test]
    fn test_non_cached_entries_are_ignored() {
        let mut failed = entry("failed", 100, 0, 0);
        failed.state = EntryState::Failed;
        let entries = vec![failed, entry("a", 2, 1, 1)];
        let plan = plan_eviction(&entries, |_| false, 0, 2, 4).unwrap();
        assert!(plan.victims.is_empty());
    }
}
