//! Batch grouping - type ごとに連続したまとまりにする
//!
//! type は最初に現れた順、同じ type の中では入力順を保ちます。

use crate::domain::{TaskDraft, TaskType};

/// 同じ type のタスクの連続した送信単位
#[derive(Debug, Clone, PartialEq)]
pub struct TypeGroup {
    pub task_type: TaskType,
    pub drafts: Vec<TaskDraft>,
}

pub fn group_by_type(drafts: Vec<TaskDraft>) -> Vec<TypeGroup> {
    let mut groups: Vec<TypeGroup> = Vec::new();
    for draft in drafts {
        match groups.iter_mut().find(|g| g.task_type == draft.task_type) {
            Some(group) => group.drafts.push(draft),
            None => groups.push(TypeGroup {
                task_type: draft.task_type.clone(),
                drafts: vec![draft],
            }),
        }
    }
    groups
}
