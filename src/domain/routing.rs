//! Route Predicates - 请求路径分类
//!
//! - 音频: `<prefix><digits>/audio/...`
//! - API:  `<prefix>[<digits>/](folder|collections|transcodings)...`

const API_SECTIONS: &[&str] = &["folder", "collections", "transcodings"];

/// 规范化部署根路径，保证以 `/` 开头和结尾
pub fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}

/// 拆出开头的 `<digits>/`，返回剩余部分
fn strip_collection_index(rest: &str) -> Option<&str> {
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    rest[digits..].strip_prefix('/')
}

pub fn is_audio_path(prefix: &str, path: &str) -> bool {
    path.strip_prefix(prefix)
        .and_then(strip_collection_index)
        .map(|rest| rest.starts_with("audio/"))
        .unwrap_or(false)
}

pub fn is_api_path(prefix: &str, path: &str) -> bool {
    let Some(rest) = path.strip_prefix(prefix) else {
        return false;
    };
    let starts_with_section = |s: &str| API_SECTIONS.iter().any(|section| s.starts_with(section));

    starts_with_section(rest)
        || strip_collection_index(rest)
            .map(starts_with_section)
            .unwrap_or(false)
}
