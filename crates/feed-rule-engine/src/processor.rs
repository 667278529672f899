//! 数据集处理器
//!
//! 对整个数据集执行一轮规则处理：规则按优先级升序稳定排序（每轮
//! 只排一次），逐行把工作副本依次交给各规则，后面的规则看到前面
//! 规则的修改。skip 只是建议性标记，不会中断该行的后续规则。

use crate::context::EvaluationContext;
use crate::executor::RuleApplier;
use crate::models::{Row, Rule};
use crate::results::{
    DatasetResult, DatasetRowResult, DatasetSummary, RowAnnotations, RuleTestReport, RuleTestRow,
};
use std::collections::HashSet;
use tracing::{debug, info};

/// 默认分块大小
const DEFAULT_CHUNK_SIZE: usize = 500;

/// 数据集处理器
pub struct DatasetProcessor {
    applier: RuleApplier,
    chunk_size: usize,
}

impl DatasetProcessor {
    pub fn new() -> Self {
        Self {
            applier: RuleApplier::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// 调整分块大小（0 按 1 处理）
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// 对数据集执行一轮完整处理
    ///
    /// 行顺序与输入一致，整轮处理不产生错误：条件评估失败按不匹配
    /// 处理，动作失败记录在对应行的 appliedActions 中。
    pub fn process(
        &self,
        rules: &[Rule],
        rows: &[Row],
        context: &EvaluationContext,
    ) -> DatasetResult {
        let enabled = rules.iter().filter(|r| r.enabled).count();
        info!(
            total_rows = rows.len(),
            total_rules = rules.len(),
            enabled_rules = enabled,
            "开始处理数据集"
        );

        let mut results = Vec::with_capacity(rows.len());
        for chunk in self.process_chunked(rules, rows, context) {
            results.extend(chunk);
        }

        let summary = Self::summarize(rows.len(), &results);
        info!(
            total_rows = summary.total_rows,
            skipped_rows = summary.skipped_rows,
            rules_applied = summary.rules_applied,
            "数据集处理完成"
        );

        DatasetResult {
            rows: results,
            summary,
        }
    }

    /// 分块处理，供协作式调度的宿主在块间让出
    ///
    /// 每次迭代产出一块行结果，行结果与一次性 process 完全一致，
    /// 分块大小不影响任何行的输出。
    pub fn process_chunked<'a>(
        &'a self,
        rules: &'a [Rule],
        rows: &'a [Row],
        context: &'a EvaluationContext,
    ) -> DatasetChunks<'a> {
        DatasetChunks {
            processor: self,
            sorted: Self::sorted_enabled_rules(rules),
            rows,
            context,
            offset: 0,
        }
    }

    /// 单规则预览：对样本行逐行试运行，返回带评估追踪的明细报告
    ///
    /// 与正式处理共用同一套条件与动作语义，禁用规则同样短路为不匹配。
    pub fn test_rule(
        &self,
        rule: &Rule,
        rows: &[Row],
        context: &EvaluationContext,
    ) -> RuleTestReport {
        let applier = RuleApplier::new().with_trace();
        let mut report_rows = Vec::with_capacity(rows.len());
        let mut matched_rows = 0;

        for (row_index, row) in rows.iter().enumerate() {
            let result = applier.apply(rule, row, context);
            if result.matched {
                matched_rows += 1;
            }
            report_rows.push(RuleTestRow {
                row_index,
                matched: result.matched,
                modified_row: result.modified_row,
                action_outcomes: result.action_outcomes,
                should_skip: result.annotations.should_skip,
                groups: result.annotations.groups,
                tags: result.annotations.tags,
                targeting: result.annotations.targeting,
                trace: result.trace,
            });
        }

        debug!(
            rule_id = %rule.id,
            total_rows = rows.len(),
            matched_rows,
            "规则预览完成"
        );

        RuleTestReport {
            rule_id: rule.id.clone(),
            rule_name: rule.name.clone(),
            total_rows: rows.len(),
            matched_rows,
            rows: report_rows,
        }
    }

    /// 处理单行：工作副本依次经过每条规则
    fn process_row(
        &self,
        sorted_rules: &[&Rule],
        row: &Row,
        context: &EvaluationContext,
    ) -> DatasetRowResult {
        let mut working_row = row.clone();
        let mut annotations = RowAnnotations::default();
        let mut matched_rule_ids = Vec::new();
        let mut applied_actions = Vec::new();

        for rule in sorted_rules {
            let result = self.applier.apply(rule, &working_row, context);
            if !result.matched {
                continue;
            }

            matched_rule_ids.push(rule.id.clone());
            if let Some(modified) = result.modified_row {
                working_row = modified;
            }
            applied_actions.extend(result.action_outcomes);
            annotations.merge(&result.annotations);
        }

        DatasetRowResult {
            original_row: row.clone(),
            modified_row: working_row,
            matched_rule_ids,
            applied_actions,
            should_skip: annotations.should_skip,
            groups: annotations.groups,
            tags: annotations.tags,
            targeting: annotations.targeting,
        }
    }

    /// 过滤禁用规则并按优先级升序稳定排序
    fn sorted_enabled_rules(rules: &[Rule]) -> Vec<&Rule> {
        let mut sorted: Vec<&Rule> = rules.iter().filter(|r| r.enabled).collect();
        sorted.sort_by_key(|r| r.priority);
        sorted
    }

    fn summarize(total_rows: usize, results: &[DatasetRowResult]) -> DatasetSummary {
        let skipped_rows = results.iter().filter(|r| r.should_skip).count();
        let distinct: HashSet<&str> = results
            .iter()
            .flat_map(|r| r.matched_rule_ids.iter().map(String::as_str))
            .collect();

        DatasetSummary {
            total_rows,
            processed_rows: results.len(),
            skipped_rows,
            rules_applied: distinct.len(),
        }
    }
}

impl Default for DatasetProcessor {
    fn default() -> Self {
        Self::new()
    }
}

/// process_chunked 的分块迭代器
pub struct DatasetChunks<'a> {
    processor: &'a DatasetProcessor,
    sorted: Vec<&'a Rule>,
    rows: &'a [Row],
    context: &'a EvaluationContext,
    offset: usize,
}

impl Iterator for DatasetChunks<'_> {
    type Item = Vec<DatasetRowResult>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.offset >= self.rows.len() {
            return None;
        }

        let end = (self.offset + self.processor.chunk_size).min(self.rows.len());
        let chunk: Vec<DatasetRowResult> = self.rows[self.offset..end]
            .iter()
            .map(|row| self.processor.process_row(&self.sorted, row, self.context))
            .collect();

        debug!(from = self.offset, to = end, "分块处理完成");
        self.offset = end;
        Some(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{Action, ActionKind, ModifyOperation};
    use crate::models::{Condition, ConditionGroup, ConditionNode};
    use crate::operators::Operator;
    use serde_json::json;

    fn row(value: serde_json::Value) -> Row {
        serde_json::from_value(value).unwrap()
    }

    fn sample_rows() -> Vec<Row> {
        vec![
            row(json!({"id": "sku-1", "title": "Air Runner", "price": 150.0, "stock": 3})),
            row(json!({"id": "sku-2", "title": "Trail Low", "price": 80.0, "stock": 25})),
            row(json!({"id": "sku-3", "title": "Peak Boot", "price": 210.0, "stock": 0})),
        ]
    }

    fn condition(field: &str, operator: Operator, value: serde_json::Value) -> ConditionNode {
        ConditionNode::Condition(Condition::new(field, operator, value))
    }

    /// price > 100 时打上 tier = premium
    fn premium_rule() -> Rule {
        Rule::new(
            "premium",
            ConditionGroup::and(vec![condition(
                "price",
                Operator::GreaterThan,
                json!(100),
            )]),
        )
        .with_id("premium")
        .with_priority(10)
        .with_actions(vec![Action::new(ActionKind::SetField {
            field: "tier".to_string(),
            value: json!("premium"),
        })])
    }

    /// tier == premium 时改写标题（依赖上一条规则写入的字段）
    fn premium_title_rule() -> Rule {
        Rule::new(
            "premium_title",
            ConditionGroup::and(vec![condition("tier", Operator::Equals, json!("premium"))]),
        )
        .with_id("premium_title")
        .with_priority(20)
        .with_actions(vec![Action::new(ActionKind::ModifyField {
            field: "title".to_string(),
            operation: ModifyOperation::Append,
            value: json!(" | Premium"),
        })])
    }

    /// stock < 5 时标记跳过
    fn low_stock_skip_rule() -> Rule {
        Rule::new(
            "low_stock",
            ConditionGroup::and(vec![condition("stock", Operator::LessThan, json!(5))]),
        )
        .with_id("low_stock")
        .with_priority(0)
        .with_actions(vec![Action::new(ActionKind::Skip)])
    }

    #[test]
    fn test_priority_chaining_across_rules() {
        let rules = vec![premium_title_rule(), premium_rule()];
        let result =
            DatasetProcessor::new().process(&rules, &sample_rows(), &EvaluationContext::default());

        // sku-1: 先 premium（优先级 10）再 premium_title（优先级 20）
        let first = &result.rows[0];
        assert_eq!(first.matched_rule_ids, vec!["premium", "premium_title"]);
        assert_eq!(first.modified_row.get("tier"), Some(&json!("premium")));
        assert_eq!(
            first.modified_row.get("title"),
            Some(&json!("Air Runner | Premium"))
        );

        // sku-2 价格不足，两条规则都不命中
        let second = &result.rows[1];
        assert!(second.matched_rule_ids.is_empty());
        assert_eq!(second.modified_row, second.original_row);
    }

    #[test]
    fn test_same_priority_keeps_input_order() {
        let first = Rule::new("first", ConditionGroup::and(vec![]))
            .with_id("first")
            .with_actions(vec![Action::new(ActionKind::ModifyField {
                field: "title".to_string(),
                operation: ModifyOperation::Append,
                value: json!("-a"),
            })]);
        let second = Rule::new("second", ConditionGroup::and(vec![]))
            .with_id("second")
            .with_actions(vec![Action::new(ActionKind::ModifyField {
                field: "title".to_string(),
                operation: ModifyOperation::Append,
                value: json!("-b"),
            })]);

        let rows = vec![row(json!({"title": "x"}))];
        let result =
            DatasetProcessor::new().process(&[first, second], &rows, &EvaluationContext::default());

        // 相同优先级按输入顺序执行（稳定排序）
        assert_eq!(result.rows[0].matched_rule_ids, vec!["first", "second"]);
        assert_eq!(result.rows[0].modified_row.get("title"), Some(&json!("x-a-b")));
    }

    #[test]
    fn test_disabled_rules_are_excluded() {
        let rules = vec![premium_rule().with_enabled(false)];
        let result =
            DatasetProcessor::new().process(&rules, &sample_rows(), &EvaluationContext::default());

        assert!(result.rows.iter().all(|r| r.matched_rule_ids.is_empty()));
        assert_eq!(result.summary.rules_applied, 0);
    }

    #[test]
    fn test_skip_is_advisory_not_control_flow() {
        let rules = vec![low_stock_skip_rule(), premium_rule()];
        let result =
            DatasetProcessor::new().process(&rules, &sample_rows(), &EvaluationContext::default());

        // sku-1: stock=3 被标记跳过，但后续 premium 规则仍然执行
        let first = &result.rows[0];
        assert!(first.should_skip);
        assert_eq!(first.matched_rule_ids, vec!["low_stock", "premium"]);
        assert_eq!(first.modified_row.get("tier"), Some(&json!("premium")));
    }

    #[test]
    fn test_summary_counts() {
        let rules = vec![low_stock_skip_rule(), premium_rule()];
        let result =
            DatasetProcessor::new().process(&rules, &sample_rows(), &EvaluationContext::default());

        assert_eq!(result.summary.total_rows, 3);
        assert_eq!(result.summary.processed_rows, 3);
        // sku-1 与 sku-3 被标记跳过
        assert_eq!(result.summary.skipped_rows, 2);
        // 两条规则都至少命中一行
        assert_eq!(result.summary.rules_applied, 2);
    }

    #[test]
    fn test_empty_dataset() {
        let rules = vec![premium_rule()];
        let result = DatasetProcessor::new().process(&rules, &[], &EvaluationContext::default());

        assert!(result.rows.is_empty());
        assert_eq!(result.summary.total_rows, 0);
        assert_eq!(result.summary.rules_applied, 0);
    }

    #[test]
    fn test_empty_rule_set_passes_rows_through() {
        let rows = sample_rows();
        let result = DatasetProcessor::new().process(&[], &rows, &EvaluationContext::default());

        assert_eq!(result.rows.len(), 3);
        for row_result in &result.rows {
            assert!(row_result.matched_rule_ids.is_empty());
            assert_eq!(row_result.modified_row, row_result.original_row);
        }
    }

    #[test]
    fn test_chunk_size_does_not_change_output() {
        let rules = vec![low_stock_skip_rule(), premium_rule(), premium_title_rule()];
        let rows = sample_rows();
        let context = EvaluationContext::default();

        let whole = DatasetProcessor::new().process(&rules, &rows, &context);
        let chunked = DatasetProcessor::new()
            .with_chunk_size(1)
            .process(&rules, &rows, &context);

        assert_eq!(
            serde_json::to_value(&whole).unwrap(),
            serde_json::to_value(&chunked).unwrap()
        );
    }

    #[test]
    fn test_process_chunked_yields_expected_chunks() {
        let rules = vec![premium_rule()];
        let rows = sample_rows();
        let context = EvaluationContext::default();

        let processor = DatasetProcessor::new().with_chunk_size(2);
        let chunks: Vec<Vec<DatasetRowResult>> =
            processor.process_chunked(&rules, &rows, &context).collect();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 2);
        assert_eq!(chunks[1].len(), 1);
    }

    #[test]
    fn test_rule_preview_report() {
        let rule = premium_rule();
        let report =
            DatasetProcessor::new().test_rule(&rule, &sample_rows(), &EvaluationContext::default());

        assert_eq!(report.rule_id, "premium");
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.matched_rows, 2);

        assert!(report.rows[0].matched);
        assert!(!report.rows[1].matched);
        assert!(report.rows[2].matched);
        // 预览附带评估追踪
        assert!(!report.rows[0].trace.is_empty());
        assert_eq!(
            report.rows[0].modified_row.as_ref().unwrap().get("tier"),
            Some(&json!("premium"))
        );
    }

    #[test]
    fn test_rule_preview_disabled_rule_is_unmatched() {
        let rule = premium_rule().with_enabled(false);
        let report =
            DatasetProcessor::new().test_rule(&rule, &sample_rows(), &EvaluationContext::default());

        assert_eq!(report.matched_rows, 0);
        assert!(report.rows.iter().all(|r| !r.matched));
    }
}
