//! 数据集规则引擎
//!
//! 广告投放数据集的规则评估与变换核心，支持：
//! - JSON 规则定义和解析（条件树 + 有序动作）
//! - 条件树短路求值
//! - 动作顺序执行与逐动作失败隔离
//! - 按优先级的整轮数据集处理与分块迭代
//! - 规则静态检查与扁平/树形条件互转

pub mod actions;
pub mod context;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod flat;
pub mod lint;
pub mod models;
pub mod operators;
pub mod processor;
pub mod results;

pub use actions::{Action, ActionKind, ModifyOperation};
pub use context::{EvaluationContext, ExpressionEvaluator};
pub use error::{Result, RuleError};
pub use evaluator::ConditionEvaluator;
pub use executor::{ActionExecutor, RuleApplier};
pub use flat::FlatConditions;
pub use lint::{LintIssue, LintSeverity, RuleLinter};
pub use models::{Condition, ConditionGroup, ConditionNode, Row, Rule};
pub use operators::{LogicalOperator, Operator};
pub use processor::{DatasetChunks, DatasetProcessor};
pub use results::{
    ActionOutcome, DatasetResult, DatasetRowResult, DatasetSummary, RowAnnotations,
    RuleEvaluationResult, RuleTestReport, RuleTestRow,
};
