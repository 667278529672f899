//! 评估结果模型
//!
//! 对外序列化统一用 camelCase，与宿主平台的 JSON 约定一致。

use crate::models::Row;
use serde::Serialize;
use serde_json::Value;

/// 单个动作的执行结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOutcome {
    pub action_id: String,
    #[serde(rename = "type")]
    pub action_type: String,
    pub success: bool,
    /// 面向界面的英文错误描述，成功时为 None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn ok(action_id: impl Into<String>, action_type: &str) -> Self {
        Self {
            action_id: action_id.into(),
            action_type: action_type.to_string(),
            success: true,
            error: None,
        }
    }

    pub fn failed(
        action_id: impl Into<String>,
        action_type: &str,
        error: impl Into<String>,
    ) -> Self {
        Self {
            action_id: action_id.into(),
            action_type: action_type.to_string(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// 行级旁路累积：skip 标记、分组、标签、定向键值
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowAnnotations {
    pub should_skip: bool,
    pub groups: Vec<String>,
    pub tags: Vec<String>,
    pub targeting: serde_json::Map<String, Value>,
}

impl RowAnnotations {
    /// 分组去重追加，保持首次出现的顺序
    pub fn add_group(&mut self, group: &str) {
        if !self.groups.iter().any(|g| g == group) {
            self.groups.push(group.to_string());
        }
    }

    /// 标签去重追加，保持首次出现的顺序
    pub fn add_tag(&mut self, tag: &str) {
        if !self.tags.iter().any(|t| t == tag) {
            self.tags.push(tag.to_string());
        }
    }

    /// 定向键值写入，同键后写覆盖先写
    pub fn set_targeting(&mut self, key: &str, value: Value) {
        self.targeting.insert(key.to_string(), value);
    }

    /// 合并另一份累积（跨规则汇总时使用）
    pub fn merge(&mut self, other: &RowAnnotations) {
        self.should_skip = self.should_skip || other.should_skip;
        for group in &other.groups {
            self.add_group(group);
        }
        for tag in &other.tags {
            self.add_tag(tag);
        }
        for (key, value) in &other.targeting {
            self.targeting.insert(key.clone(), value.clone());
        }
    }
}

/// 单条规则对单行的评估结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleEvaluationResult {
    pub rule_id: String,
    pub rule_name: String,
    pub matched: bool,
    /// 匹配时为执行完动作的行副本，未匹配时为 None
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_row: Option<Row>,
    pub action_outcomes: Vec<ActionOutcome>,
    #[serde(flatten)]
    pub annotations: RowAnnotations,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<String>,
}

impl RuleEvaluationResult {
    /// 未匹配结果：不克隆行，不执行动作
    pub fn unmatched(rule_id: impl Into<String>, rule_name: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            rule_name: rule_name.into(),
            matched: false,
            modified_row: None,
            action_outcomes: Vec::new(),
            annotations: RowAnnotations::default(),
            trace: Vec::new(),
        }
    }
}

/// 数据集中单行的汇总结果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRowResult {
    pub original_row: Row,
    pub modified_row: Row,
    /// 按执行顺序记录的命中规则 id
    pub matched_rule_ids: Vec<String>,
    pub applied_actions: Vec<ActionOutcome>,
    pub should_skip: bool,
    pub groups: Vec<String>,
    pub tags: Vec<String>,
    pub targeting: serde_json::Map<String, Value>,
}

/// 一次数据集处理的统计
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub total_rows: usize,
    pub processed_rows: usize,
    pub skipped_rows: usize,
    /// 至少命中一行的规则数
    pub rules_applied: usize,
}

/// 一次数据集处理的完整输出
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetResult {
    pub rows: Vec<DatasetRowResult>,
    pub summary: DatasetSummary,
}

/// 单规则预览（试运行）报告
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTestReport {
    pub rule_id: String,
    pub rule_name: String,
    pub total_rows: usize,
    pub matched_rows: usize,
    pub rows: Vec<RuleTestRow>,
}

/// 预览报告中的单行明细
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTestRow {
    pub row_index: usize,
    pub matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_row: Option<Row>,
    pub action_outcomes: Vec<ActionOutcome>,
    pub should_skip: bool,
    pub groups: Vec<String>,
    pub tags: Vec<String>,
    pub targeting: serde_json::Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<String>,
}
