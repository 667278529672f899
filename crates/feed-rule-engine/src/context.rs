//! 评估上下文
//!
//! 一次数据集处理所需的外部资源：lookup 动作的参照表、
//! calculate 动作的表达式求值器。引擎本身不持有任何跨调用状态。

use crate::error::Result;
use crate::models::Row;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 表达式求值器接口
///
/// calculate 动作的表达式语法由宿主系统决定，引擎只负责把表达式和
/// 当前行交给实现方，并把结果写回目标字段。实现方的错误会被转换为
/// 对应动作的失败结果，不会中断数据集处理。
#[cfg_attr(test, mockall::automock)]
pub trait ExpressionEvaluator: Send + Sync {
    fn evaluate(&self, expression: &str, row: &Row) -> Result<Value>;
}

/// 评估上下文
#[derive(Clone, Default)]
pub struct EvaluationContext {
    /// 参照表：表名 -> (键 -> 值)
    lookup_tables: HashMap<String, HashMap<String, Value>>,
    expression_evaluator: Option<Arc<dyn ExpressionEvaluator>>,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一张参照表
    pub fn with_lookup_table(
        mut self,
        name: impl Into<String>,
        table: HashMap<String, Value>,
    ) -> Self {
        self.lookup_tables.insert(name.into(), table);
        self
    }

    /// 注册表达式求值器
    pub fn with_expression_evaluator(mut self, evaluator: Arc<dyn ExpressionEvaluator>) -> Self {
        self.expression_evaluator = Some(evaluator);
        self
    }

    pub fn lookup_table(&self, name: &str) -> Option<&HashMap<String, Value>> {
        self.lookup_tables.get(name)
    }

    pub fn expression_evaluator(&self) -> Option<&dyn ExpressionEvaluator> {
        self.expression_evaluator.as_deref()
    }
}

impl fmt::Debug for EvaluationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EvaluationContext")
            .field("lookup_tables", &self.lookup_tables.keys().collect::<Vec<_>>())
            .field(
                "has_expression_evaluator",
                &self.expression_evaluator.is_some(),
            )
            .finish()
    }
}
