//! 规则引擎领域模型
//!
//! 规则 = 条件树 + 有序动作列表。数据集中的行是扁平的 JSON 对象，
//! 字段值可以是字符串、数值、布尔或 null（日期以字符串形式传入）。

use crate::actions::Action;
use crate::operators::{LogicalOperator, Operator};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// 数据集中的一行：字段名到值的有序映射
pub type Row = serde_json::Map<String, Value>;

/// 规则定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    /// 禁用的规则在评估前即短路为不匹配
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 数值越小越先执行，相同优先级保持输入顺序
    #[serde(default)]
    pub priority: i32,
    pub conditions: ConditionGroup,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

fn default_enabled() -> bool {
    true
}

impl Rule {
    pub fn new(name: impl Into<String>, conditions: ConditionGroup) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            enabled: true,
            priority: 0,
            conditions,
            actions: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// 条件树节点（叶子条件或逻辑组）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionNode {
    Condition(Condition),
    Group(ConditionGroup),
}

/// 叶子条件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }
}

/// 逻辑组节点
///
/// 空组有明确语义：AND 组为 true，OR 组为 false。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionGroup {
    pub logic: LogicalOperator,
    pub conditions: Vec<ConditionNode>,
}

impl ConditionGroup {
    pub fn new(logic: LogicalOperator, conditions: Vec<ConditionNode>) -> Self {
        Self { logic, conditions }
    }

    pub fn and(conditions: Vec<ConditionNode>) -> Self {
        Self::new(LogicalOperator::And, conditions)
    }

    pub fn or(conditions: Vec<ConditionNode>) -> Self {
        Self::new(LogicalOperator::Or, conditions)
    }
}
