//! 规则执行器
//!
//! 条件树的短路求值 + 动作的顺序执行。单条规则对单行的完整应用
//! 由 RuleApplier 驱动：先评估条件树，命中后克隆行并执行动作。

use crate::actions::{Action, ActionKind, ModifyOperation};
use crate::context::EvaluationContext;
use crate::evaluator::ConditionEvaluator;
use crate::models::{Condition, ConditionGroup, ConditionNode, Row, Rule};
use crate::operators::LogicalOperator;
use crate::results::{ActionOutcome, RowAnnotations, RuleEvaluationResult};
use serde_json::Value;
use tracing::warn;

/// 动作执行器
///
/// 每个动作独立成败：失败只产生对应的失败结果，行保持该动作执行前
/// 的状态，后续动作照常执行。
pub struct ActionExecutor;

impl ActionExecutor {
    /// 执行单个动作，返回执行结果
    pub fn apply(
        action: &Action,
        row: &mut Row,
        annotations: &mut RowAnnotations,
        context: &EvaluationContext,
    ) -> ActionOutcome {
        let kind = action.kind.name();

        match &action.kind {
            ActionKind::SetField { field, value } => {
                Self::write_field(&action.id, kind, field, value.clone(), row)
            }
            ActionKind::ModifyField {
                field,
                operation,
                value,
            } => Self::modify_field(&action.id, kind, field, *operation, value, row),
            ActionKind::Skip => {
                annotations.should_skip = true;
                ActionOutcome::ok(&action.id, kind)
            }
            ActionKind::AddToGroup { group } => {
                annotations.add_group(group);
                ActionOutcome::ok(&action.id, kind)
            }
            ActionKind::AddTag { tag } => {
                annotations.add_tag(tag);
                ActionOutcome::ok(&action.id, kind)
            }
            ActionKind::SetTargeting { key, value } => {
                annotations.set_targeting(key, value.clone());
                ActionOutcome::ok(&action.id, kind)
            }
            ActionKind::Calculate { field, expression } => {
                Self::calculate(&action.id, kind, field, expression, row, context)
            }
            ActionKind::Lookup { field, table, key } => {
                Self::lookup(&action.id, kind, field, table, key, row, context)
            }
        }
    }

    /// 覆盖写入字段
    fn write_field(
        action_id: &str,
        kind: &str,
        field: &str,
        value: Value,
        row: &mut Row,
    ) -> ActionOutcome {
        if field.is_empty() {
            return ActionOutcome::failed(action_id, kind, "Target field name is empty");
        }
        row.insert(field.to_string(), value);
        ActionOutcome::ok(action_id, kind)
    }

    /// 基于现有值修改字段
    ///
    /// append/prepend 按字符串拼接（缺失字段视为空串），replace 等同于覆盖写入。
    fn modify_field(
        action_id: &str,
        kind: &str,
        field: &str,
        operation: ModifyOperation,
        value: &Value,
        row: &mut Row,
    ) -> ActionOutcome {
        if field.is_empty() {
            return ActionOutcome::failed(action_id, kind, "Target field name is empty");
        }

        let new_value = match operation {
            ModifyOperation::Replace => value.clone(),
            ModifyOperation::Append => {
                let current = ConditionEvaluator::stringify(row.get(field));
                let suffix = ConditionEvaluator::stringify(Some(value));
                Value::String(format!("{}{}", current, suffix))
            }
            ModifyOperation::Prepend => {
                let current = ConditionEvaluator::stringify(row.get(field));
                let prefix = ConditionEvaluator::stringify(Some(value));
                Value::String(format!("{}{}", prefix, current))
            }
        };

        row.insert(field.to_string(), new_value);
        ActionOutcome::ok(action_id, kind)
    }

    /// 表达式计算，结果写入目标字段
    fn calculate(
        action_id: &str,
        kind: &str,
        field: &str,
        expression: &str,
        row: &mut Row,
        context: &EvaluationContext,
    ) -> ActionOutcome {
        if field.is_empty() {
            return ActionOutcome::failed(action_id, kind, "Target field name is empty");
        }

        let Some(evaluator) = context.expression_evaluator() else {
            return ActionOutcome::failed(action_id, kind, "No expression evaluator configured");
        };

        match evaluator.evaluate(expression, row) {
            Ok(value) => {
                row.insert(field.to_string(), value);
                ActionOutcome::ok(action_id, kind)
            }
            Err(e) => ActionOutcome::failed(
                action_id,
                kind,
                format!("Expression evaluation failed: {}", e),
            ),
        }
    }

    /// 参照表查询，命中值写入目标字段
    fn lookup(
        action_id: &str,
        kind: &str,
        field: &str,
        table: &str,
        key: &str,
        row: &mut Row,
        context: &EvaluationContext,
    ) -> ActionOutcome {
        if field.is_empty() {
            return ActionOutcome::failed(action_id, kind, "Target field name is empty");
        }

        let Some(table_map) = context.lookup_table(table) else {
            return ActionOutcome::failed(
                action_id,
                kind,
                format!("Lookup table '{}' not found", table),
            );
        };

        let Some(key_value) = row.get(key) else {
            return ActionOutcome::failed(
                action_id,
                kind,
                format!("Key field '{}' not found in row", key),
            );
        };

        let key_str = ConditionEvaluator::stringify(Some(key_value));
        match table_map.get(&key_str) {
            Some(value) => {
                let value = value.clone();
                row.insert(field.to_string(), value);
                ActionOutcome::ok(action_id, kind)
            }
            None => ActionOutcome::failed(
                action_id,
                kind,
                format!("No entry for key '{}' in table '{}'", key_str, table),
            ),
        }
    }
}

/// 规则应用器
pub struct RuleApplier {
    /// 是否记录详细评估追踪
    trace_enabled: bool,
}

impl RuleApplier {
    pub fn new() -> Self {
        Self {
            trace_enabled: false,
        }
    }

    /// 启用评估追踪（预览路径使用）
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    /// 对单行应用单条规则
    ///
    /// 禁用规则直接返回未匹配，不评估条件树。命中后克隆该行，
    /// 按声明顺序执行全部动作，每个动作都产生一条结果。
    pub fn apply(
        &self,
        rule: &Rule,
        row: &Row,
        context: &EvaluationContext,
    ) -> RuleEvaluationResult {
        let mut result = RuleEvaluationResult::unmatched(&rule.id, &rule.name);

        if !rule.enabled {
            if self.trace_enabled {
                result.trace.push(format!("root: 规则 {} 已禁用", rule.id));
            }
            return result;
        }

        result.matched = self.evaluate_group(&rule.conditions, row, &mut result.trace, "root");
        if !result.matched {
            return result;
        }

        let mut working_row = row.clone();
        let mut annotations = RowAnnotations::default();

        for action in &rule.actions {
            let outcome =
                ActionExecutor::apply(action, &mut working_row, &mut annotations, context);
            if !outcome.success {
                warn!(
                    rule_id = %rule.id,
                    action_id = %outcome.action_id,
                    action_type = %outcome.action_type,
                    error = outcome.error.as_deref().unwrap_or(""),
                    "动作执行失败"
                );
            }
            result.action_outcomes.push(outcome);
        }

        result.modified_row = Some(working_row);
        result.annotations = annotations;
        result
    }

    /// 递归评估条件节点
    fn evaluate_node(
        &self,
        node: &ConditionNode,
        row: &Row,
        trace: &mut Vec<String>,
        path: &str,
    ) -> bool {
        match node {
            ConditionNode::Condition(cond) => self.evaluate_condition(cond, row, trace, path),
            ConditionNode::Group(group) => self.evaluate_group(group, row, trace, path),
        }
    }

    /// 评估叶子条件
    fn evaluate_condition(
        &self,
        cond: &Condition,
        row: &Row,
        trace: &mut Vec<String>,
        path: &str,
    ) -> bool {
        let matched =
            ConditionEvaluator::evaluate(row.get(&cond.field), cond.operator, &cond.value);

        if self.trace_enabled {
            trace.push(format!(
                "{}: {} {} {} => {}",
                path,
                cond.field,
                cond.operator,
                cond.value,
                if matched { "MATCHED" } else { "NOT_MATCHED" }
            ));
        }

        matched
    }

    /// 评估逻辑组（短路求值，子节点严格按声明顺序）
    fn evaluate_group(
        &self,
        group: &ConditionGroup,
        row: &Row,
        trace: &mut Vec<String>,
        path: &str,
    ) -> bool {
        if self.trace_enabled {
            trace.push(format!(
                "{}: 开始评估 {} 组 (共 {} 个子节点)",
                path,
                group.logic,
                group.conditions.len()
            ));
        }

        // 空组显式语义：AND 为 true，OR 为 false
        if group.conditions.is_empty() {
            return match group.logic {
                LogicalOperator::And => {
                    if self.trace_enabled {
                        trace.push(format!("{}: 空 AND 组视为 true", path));
                    }
                    true
                }
                LogicalOperator::Or => {
                    if self.trace_enabled {
                        trace.push(format!("{}: 空 OR 组视为 false", path));
                    }
                    false
                }
            };
        }

        match group.logic {
            LogicalOperator::And => {
                // AND: 所有子节点必须匹配，遇到 false 立即返回
                for (i, child) in group.conditions.iter().enumerate() {
                    let child_path = format!("{}.conditions[{}]", path, i);
                    if !self.evaluate_node(child, row, trace, &child_path) {
                        if self.trace_enabled {
                            trace.push(format!("{}: AND 短路 - 子节点 {} 不匹配", path, i));
                        }
                        return false;
                    }
                }
                true
            }
            LogicalOperator::Or => {
                // OR: 任一子节点匹配即可，遇到 true 立即返回
                for (i, child) in group.conditions.iter().enumerate() {
                    let child_path = format!("{}.conditions[{}]", path, i);
                    if self.evaluate_node(child, row, trace, &child_path) {
                        if self.trace_enabled {
                            trace.push(format!("{}: OR 短路 - 子节点 {} 匹配", path, i));
                        }
                        return true;
                    }
                }
                false
            }
        }
    }
}

impl Default for RuleApplier {
    fn default() -> Self {
        Self::new()
    }
}
