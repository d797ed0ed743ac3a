//! TaskType - 下流での扱いを決めるタグ
//!
//! 既知のカテゴリは enum の variant として持ち、それ以外の値は
//! `Other` にそのまま入れて運びます。未知の type を拒否するのは producer の
//! 責務ではありません（consumer 側が恒久的失敗として扱う）。

use serde::{Deserialize, Serialize};
use std::fmt;

/// TaskType は envelope の `type` フィールド
///
/// # シリアライズ
/// - 既知の値は小文字（`"email"`, `"report"` ...）
/// - `Other` は受け取った綴りのまま
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskType {
    Email,
    Notification,
    Report,
    Backup,
    Cleanup,
    Generic,
    Other(String),
}

impl TaskType {
    pub fn as_str(&self) -> &str {
        match self {
            TaskType::Email => "email",
            TaskType::Notification => "notification",
            TaskType::Report => "report",
            TaskType::Backup => "backup",
            TaskType::Cleanup => "cleanup",
            TaskType::Generic => "generic",
            TaskType::Other(raw) => raw,
        }
    }

    /// 既知のカテゴリかどうか
    pub fn is_known(&self) -> bool {
        !matches!(self, TaskType::Other(_))
    }
}

impl From<&str> for TaskType {
    fn from(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "email" => TaskType::Email,
            "notification" => TaskType::Notification,
            "report" => TaskType::Report,
            "backup" => TaskType::Backup,
            "cleanup" => TaskType::Cleanup,
            "generic" => TaskType::Generic,
            _ => TaskType::Other(value.to_string()),
        }
    }
}

impl From<String> for TaskType {
    fn from(value: String) -> Self {
        TaskType::from(value.as_str())
    }
}

impl From<TaskType> for String {
    fn from(value: TaskType) -> Self {
        match value {
            TaskType::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::email("email", TaskType::Email)]
    #[case::upper("EMAIL", TaskType::Email)]
    #[case::report("Report", TaskType::Report)]
    #[case::cleanup("cleanup", TaskType::Cleanup)]
    #[case::generic("generic", TaskType::Generic)]
    fn known_types_parse_case_insensitively(#[case] raw: &str, #[case] expected: TaskType) {
        assert_eq!(TaskType::from(raw), expected);
    }

    #[test]
    fn unknown_type_keeps_original_spelling() {
        let t = TaskType::from("UNKNOWN");
        assert_eq!(t, TaskType::Other("UNKNOWN".to_string()));
        assert!(!t.is_known());
        assert_eq!(serde_json::to_string(&t).unwrap(), r#""UNKNOWN""#);
    }

    #[test]
    fn known_type_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TaskType::Notification).unwrap(),
            r#""notification""#
        );
        let back: TaskType = serde_json::from_str(r#""backup""#).unwrap();
        assert_eq!(back, TaskType::Backup);
    }
}
