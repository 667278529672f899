//! 规则动作定义
//!
//! 动作在规则匹配后按声明顺序执行。单个动作失败不影响后续动作，
//! 失败信息记录在对应的 ActionOutcome 中。

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 规则动作
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    /// 未提供时自动生成，保证每个 ActionOutcome 都能回指动作
    #[serde(default = "default_action_id")]
    pub id: String,
    #[serde(flatten)]
    pub kind: ActionKind,
}

fn default_action_id() -> String {
    Uuid::new_v4().to_string()
}

impl Action {
    pub fn new(kind: ActionKind) -> Self {
        Self {
            id: default_action_id(),
            kind,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// 动作类型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    /// 覆盖写入字段
    SetField { field: String, value: Value },
    /// 基于现有值修改字段
    ModifyField {
        field: String,
        operation: ModifyOperation,
        value: Value,
    },
    /// 标记该行跳过（建议性标记，不中断后续规则）
    Skip,
    /// 将该行加入命名分组
    AddToGroup { group: String },
    /// 给该行打标签
    AddTag { tag: String },
    /// 写入定向键值（同键后写覆盖先写）
    SetTargeting { key: String, value: Value },
    /// 表达式计算结果写入字段，依赖上下文中的表达式求值器
    Calculate { field: String, expression: String },
    /// 用行内 key 字段的值查参照表，命中值写入字段
    Lookup {
        field: String,
        table: String,
        key: String,
    },
}

impl ActionKind {
    /// 动作类型名，用于 ActionOutcome 的 type 字段
    pub fn name(&self) -> &'static str {
        match self {
            Self::SetField { .. } => "set_field",
            Self::ModifyField { .. } => "modify_field",
            Self::Skip => "skip",
            Self::AddToGroup { .. } => "add_to_group",
            Self::AddTag { .. } => "add_tag",
            Self::SetTargeting { .. } => "set_targeting",
            Self::Calculate { .. } => "calculate",
            Self::Lookup { .. } => "lookup",
        }
    }
}

/// modify_field 的修改方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModifyOperation {
    Append,
    Prepend,
    Replace,
}
