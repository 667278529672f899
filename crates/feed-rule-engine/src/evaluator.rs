//! 条件评估器
//!
//! 实现各操作符对单个字段值的评估。评估是全函数：任何类型不匹配、
//! 缺失字段或非法正则都按 false 处理，绝不向上抛错。

use crate::operators::Operator;
use regex::Regex;
use serde_json::Value;

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估单个条件
    ///
    /// # Arguments
    /// * `field_value` - 从行中取出的字段值，字段不存在时为 None
    /// * `operator` - 操作符
    /// * `compare_value` - 规则中定义的比较值
    pub fn evaluate(
        field_value: Option<&Value>,
        operator: Operator,
        compare_value: &Value,
    ) -> bool {
        match operator {
            Operator::Equals => Self::eq(field_value, compare_value),
            Operator::NotEquals => !Self::eq(field_value, compare_value),
            Operator::Contains => {
                Self::stringify(field_value).contains(&Self::stringify(Some(compare_value)))
            }
            Operator::StartsWith => {
                Self::stringify(field_value).starts_with(&Self::stringify(Some(compare_value)))
            }
            Operator::EndsWith => {
                Self::stringify(field_value).ends_with(&Self::stringify(Some(compare_value)))
            }
            Operator::Regex => Self::regex_match(field_value, compare_value),
            Operator::GreaterThan => Self::compare(field_value, compare_value, |a, b| a > b),
            Operator::LessThan => Self::compare(field_value, compare_value, |a, b| a < b),
            Operator::In => Self::in_list(field_value, compare_value),
            Operator::NotIn => !Self::in_list(field_value, compare_value),
        }
    }

    /// 相等比较
    ///
    /// 两侧都能转为数值时按数值比较（"100" 与 100 相等），
    /// 否则按字符串化后的精确比较（区分大小写）。
    fn eq(field: Option<&Value>, compare: &Value) -> bool {
        if let (Some(f1), Some(f2)) = (field.and_then(Self::as_f64), Self::as_f64(compare)) {
            return (f1 - f2).abs() < f64::EPSILON;
        }

        Self::stringify(field) == Self::stringify(Some(compare))
    }

    /// 数值比较，任一侧无法转为有限数值时为 false
    fn compare<F>(field: Option<&Value>, compare: &Value, cmp: F) -> bool
    where
        F: Fn(f64, f64) -> bool,
    {
        match (field.and_then(Self::as_f64), Self::as_f64(compare)) {
            (Some(a), Some(b)) => cmp(a, b),
            _ => false,
        }
    }

    /// 列表成员检查，逐元素沿用 eq 的相等语义
    ///
    /// 比较值不是数组时按单元素集合处理（lint 会对此给出警告）。
    fn in_list(field: Option<&Value>, compare: &Value) -> bool {
        match compare {
            Value::Array(items) => items.iter().any(|item| Self::eq(field, item)),
            other => Self::eq(field, other),
        }
    }

    /// 正则匹配，模式非法时为 false（lint 在保存时即可发现）
    fn regex_match(field: Option<&Value>, compare: &Value) -> bool {
        let pattern = Self::stringify(Some(compare));

        // 按需编译（生产环境可用 LRU 缓存避免重复编译）
        match Regex::new(&pattern) {
            Ok(regex) => regex.is_match(&Self::stringify(field)),
            Err(_) => false,
        }
    }

    /// 字符串化
    ///
    /// 缺失字段与 null 都视为空字符串，数值不带多余小数位，
    /// 布尔为 "true"/"false"，数组和对象取紧凑 JSON。
    pub fn stringify(value: Option<&Value>) -> String {
        match value {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(other) => serde_json::to_string(other).unwrap_or_default(),
        }
    }

    /// 尝试将 Value 转换为有限的 f64
    pub(crate) fn as_f64(value: &Value) -> Option<f64> {
        let n = match value {
            Value::Number(n) => n.as_f64()?,
            Value::String(s) => s.trim().parse().ok()?,
            _ => return None,
        };
        n.is_finite().then_some(n)
    }
}
