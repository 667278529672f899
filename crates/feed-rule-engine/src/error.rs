//! 规则引擎错误类型
//!
//! 仅覆盖规则的解析、校验与结构转换阶段。数据集评估阶段不产生错误：
//! 条件评估失败按 false 处理，动作失败记录在 ActionOutcome 中。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("规则校验失败 ({path}): {message}")]
    ValidationError { path: String, message: String },

    #[error("条件树展平失败: {0}")]
    FlattenError(String),

    #[error("表达式求值失败: {0}")]
    ExpressionError(String),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RuleError>;
