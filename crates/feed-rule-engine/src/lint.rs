//! 规则静态检查
//!
//! 在保存或编辑规则时做一次完整的结构检查，独立于评估路径。
//! 评估路径对同类问题按宽松语义处理（非法正则不匹配、标量 in 按
//! 单元素集合），lint 负责在编辑期把这些问题暴露给规则作者。

use crate::actions::{Action, ActionKind};
use crate::error::{Result, RuleError};
use crate::evaluator::ConditionEvaluator;
use crate::models::{Condition, ConditionGroup, ConditionNode, Rule};
use crate::operators::{LogicalOperator, Operator};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// 检查结果级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LintSeverity {
    /// 规则无法按作者意图工作，保存时应拒绝
    Error,
    /// 规则可以运行，但语义可能不是作者想要的
    Warning,
}

impl fmt::Display for LintSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// 单条检查发现
#[derive(Debug, Clone, Serialize)]
pub struct LintIssue {
    /// 节点定位，如 "root.conditions[1]" 或 "actions[0]"
    pub path: String,
    pub severity: LintSeverity,
    /// 面向界面的英文描述
    pub message: String,
}

impl LintIssue {
    fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            severity: LintSeverity::Error,
            message: message.into(),
        }
    }

    fn warning(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            severity: LintSeverity::Warning,
            message: message.into(),
        }
    }
}

/// 规则静态检查器
pub struct RuleLinter;

impl RuleLinter {
    /// 检查整条规则，返回全部发现（不短路）
    pub fn lint(rule: &Rule) -> Vec<LintIssue> {
        let mut issues = Vec::new();

        if rule.id.is_empty() {
            issues.push(LintIssue::error("rule", "Rule id is empty"));
        }
        if rule.name.is_empty() {
            issues.push(LintIssue::error("rule", "Rule name is empty"));
        }
        if rule.actions.is_empty() {
            issues.push(LintIssue::warning(
                "rule",
                "Rule has no actions and will only mark rows as matched",
            ));
        }

        Self::lint_group(&rule.conditions, "root", &mut issues);

        for (i, action) in rule.actions.iter().enumerate() {
            Self::lint_action(action, &format!("actions[{}]", i), &mut issues);
        }

        issues
    }

    /// 从 JSON 解析并严格校验一条规则，保存路径的入口
    pub fn parse_and_validate(json: &str) -> Result<Rule> {
        let rule: Rule = serde_json::from_str(json)?;
        Self::validate(&rule)?;
        Ok(rule)
    }

    /// 严格校验：遇到 error 级别的发现即返回错误（保存路径使用）
    pub fn validate(rule: &Rule) -> Result<()> {
        let issues = Self::lint(rule);
        let first_error = issues
            .iter()
            .find(|issue| issue.severity == LintSeverity::Error);

        if let Some(issue) = first_error {
            warn!(
                rule_id = %rule.id,
                path = %issue.path,
                message = %issue.message,
                total_issues = issues.len(),
                "规则校验未通过"
            );
            return Err(RuleError::ValidationError {
                path: issue.path.clone(),
                message: issue.message.clone(),
            });
        }

        Ok(())
    }

    fn lint_node(node: &ConditionNode, path: &str, issues: &mut Vec<LintIssue>) {
        match node {
            ConditionNode::Condition(cond) => Self::lint_condition(cond, path, issues),
            ConditionNode::Group(group) => Self::lint_group(group, path, issues),
        }
    }

    fn lint_group(group: &ConditionGroup, path: &str, issues: &mut Vec<LintIssue>) {
        // 空组合法，但语义容易出乎作者意料
        if group.conditions.is_empty() {
            let message = match group.logic {
                LogicalOperator::And => "Empty AND group matches every row",
                LogicalOperator::Or => "Empty OR group never matches",
            };
            issues.push(LintIssue::warning(path, message));
            return;
        }

        for (i, child) in group.conditions.iter().enumerate() {
            let child_path = format!("{}.conditions[{}]", path, i);
            Self::lint_node(child, &child_path, issues);
        }
    }

    fn lint_condition(cond: &Condition, path: &str, issues: &mut Vec<LintIssue>) {
        if cond.field.is_empty() {
            issues.push(LintIssue::error(path, "Condition field is empty"));
        }

        match cond.operator {
            Operator::Regex => {
                let pattern = ConditionEvaluator::stringify(Some(&cond.value));
                if let Err(e) = Regex::new(&pattern) {
                    issues.push(LintIssue::error(
                        path,
                        format!("Invalid regex pattern: {}", e),
                    ));
                }
            }
            Operator::In | Operator::NotIn => {
                if !cond.value.is_array() {
                    issues.push(LintIssue::warning(
                        path,
                        format!(
                            "Value for '{}' should be an array; a single value is treated as a one-element list",
                            cond.operator
                        ),
                    ));
                }
            }
            Operator::GreaterThan | Operator::LessThan => {
                if ConditionEvaluator::as_f64(&cond.value).is_none() {
                    issues.push(LintIssue::warning(
                        path,
                        format!(
                            "Value for '{}' is not numeric; the condition will never match",
                            cond.operator
                        ),
                    ));
                }
            }
            _ => {}
        }
    }

    fn lint_action(action: &Action, path: &str, issues: &mut Vec<LintIssue>) {
        match &action.kind {
            ActionKind::SetField { field, .. } | ActionKind::ModifyField { field, .. } => {
                if field.is_empty() {
                    issues.push(LintIssue::error(path, "Target field name is empty"));
                }
            }
            ActionKind::Skip => {}
            ActionKind::AddToGroup { group } => {
                if group.is_empty() {
                    issues.push(LintIssue::warning(path, "Group name is empty"));
                }
            }
            ActionKind::AddTag { tag } => {
                if tag.is_empty() {
                    issues.push(LintIssue::warning(path, "Tag name is empty"));
                }
            }
            ActionKind::SetTargeting { key, .. } => {
                if key.is_empty() {
                    issues.push(LintIssue::warning(path, "Targeting key is empty"));
                }
            }
            ActionKind::Calculate { field, expression } => {
                if field.is_empty() {
                    issues.push(LintIssue::error(path, "Target field name is empty"));
                }
                if expression.is_empty() {
                    issues.push(LintIssue::error(path, "Expression is empty"));
                }
            }
            ActionKind::Lookup { field, table, key } => {
                if field.is_empty() {
                    issues.push(LintIssue::error(path, "Target field name is empty"));
                }
                if table.is_empty() {
                    issues.push(LintIssue::error(path, "Lookup table name is empty"));
                }
                if key.is_empty() {
                    issues.push(LintIssue::error(path, "Lookup key field is empty"));
                }
            }
        }
    }
}
