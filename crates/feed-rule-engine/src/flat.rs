//! 扁平条件列表与条件树的互转
//!
//! 持久化层的历史形态是单一逻辑 + 扁平条件列表，内存中的规范形态
//! 是嵌套条件树。into_tree 是全函数；try_flatten 在树含嵌套组时
//! 返回错误，而不是悄悄丢弃嵌套语义。

use crate::error::{Result, RuleError};
use crate::models::{Condition, ConditionGroup, ConditionNode};
use crate::operators::LogicalOperator;
use serde::{Deserialize, Serialize};

/// 扁平形态：单一逻辑 + 条件列表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatConditions {
    pub logic: LogicalOperator,
    pub conditions: Vec<Condition>,
}

impl FlatConditions {
    pub fn new(logic: LogicalOperator, conditions: Vec<Condition>) -> Self {
        Self { logic, conditions }
    }

    /// 转换为等价的单层条件树
    pub fn into_tree(self) -> ConditionGroup {
        ConditionGroup::new(
            self.logic,
            self.conditions
                .into_iter()
                .map(ConditionNode::Condition)
                .collect(),
        )
    }
}

impl ConditionGroup {
    /// 尝试展平为扁平形态
    ///
    /// 只有单层树可以展平。遇到嵌套组返回错误，由调用方决定改用
    /// 树形存储，嵌套语义不允许丢失。
    pub fn try_flatten(&self) -> Result<FlatConditions> {
        let mut conditions = Vec::with_capacity(self.conditions.len());

        for (i, node) in self.conditions.iter().enumerate() {
            match node {
                ConditionNode::Condition(cond) => conditions.push(cond.clone()),
                ConditionNode::Group(_) => {
                    return Err(RuleError::FlattenError(format!(
                        "嵌套组 root.conditions[{}] 无法展平为单层列表",
                        i
                    )));
                }
            }
        }

        Ok(FlatConditions::new(self.logic, conditions))
    }
}
