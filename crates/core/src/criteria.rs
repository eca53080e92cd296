//! Criteria and conditions for automatic scoring.
//!
//! On disk a condition is a flat mapping (`greater_than: 30`,
//! `checklist_completion: {required_items: all}`, `and: [...]`, ...). In
//! memory it is an expression tree that is evaluated explicitly, so no field
//! is ever silently ignored.

use crate::checklist::ChecklistProgress;
use crate::error::{Result, ValidationError};
use crate::field_type::FieldKind;
use crate::timestamp::{format_time_of_day, parse_time_of_day};
use crate::value::EntryValue;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// The only checklist completion policy currently supported.
pub const REQUIRED_ITEMS_ALL: &str = "all";

/// Scoring rule attached to a habit or tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Criteria {
    /// Human description of the rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Rule body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
}

impl Criteria {
    /// Criteria with the given condition.
    pub fn new(condition: Condition) -> Self {
        Self {
            description: None,
            condition: Some(condition),
        }
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Numeric bound used for tier ordering, if one can be extracted.
    pub fn numeric_bound(&self) -> Option<f64> {
        self.condition.as_ref().and_then(Condition::numeric_bound)
    }

    /// Evaluate against an input. Criteria without a condition are an error.
    pub fn evaluate(&self, input: &EvalInput<'_>) -> Result<bool> {
        match &self.condition {
            Some(condition) => condition.evaluate(input),
            None => Err(ValidationError::required("criteria has no condition")),
        }
    }
}

/// Numeric comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
}

impl CompareOp {
    fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            CompareOp::GreaterThan => lhs > rhs,
            CompareOp::GreaterThanOrEqual => lhs >= rhs,
            CompareOp::LessThan => lhs < rhs,
            CompareOp::LessThanOrEqual => lhs <= rhs,
        }
    }
}

/// Numeric interval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeCondition {
    /// Lower bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Upper bound
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Whether `min` itself is in range (default true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_inclusive: Option<bool>,
    /// Whether `max` itself is in range (default true)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_inclusive: Option<bool>,
}

impl RangeCondition {
    fn contains(&self, x: f64) -> bool {
        let above_min = match self.min {
            Some(min) if self.min_inclusive.unwrap_or(true) => x >= min,
            Some(min) => x > min,
            None => true,
        };
        let below_max = match self.max {
            Some(max) if self.max_inclusive.unwrap_or(true) => x <= max,
            Some(max) => x < max,
            None => true,
        };
        above_min && below_max
    }
}

/// Checklist completion requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistCompletionCondition {
    /// Which items must be complete; only `"all"` is supported
    pub required_items: String,
}

impl ChecklistCompletionCondition {
    /// Require every non-heading item.
    pub fn all() -> Self {
        Self {
            required_items: REQUIRED_ITEMS_ALL.to_string(),
        }
    }
}

/// Condition expression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCondition", into = "RawCondition")]
pub enum Condition {
    /// Numeric comparison against the value
    Compare(CompareOp, f64),
    /// Value equality
    Equals(EntryValue),
    /// Time of day strictly before
    Before(NaiveTime),
    /// Time of day strictly after
    After(NaiveTime),
    /// Numeric interval
    Range(RangeCondition),
    /// Checklist completion requirement
    ChecklistCompletion(ChecklistCompletionCondition),
    /// Explicit `and` list
    And(Vec<Condition>),
    /// Explicit `or` list
    Or(Vec<Condition>),
    /// Negation
    Not(Box<Condition>),
    /// Several clauses written in one mapping; all must hold
    Conjunction(Vec<Condition>),
}

/// What a condition is evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct EvalInput<'a> {
    /// Recorded value, if any
    pub value: Option<&'a EntryValue>,
    /// Field kind of the owning habit
    pub kind: FieldKind,
    /// Checklist progress, for checklist habits
    pub checklist: Option<ChecklistProgress>,
}

impl<'a> EvalInput<'a> {
    /// Input carrying a value.
    pub fn value(value: &'a EntryValue, kind: FieldKind) -> Self {
        Self {
            value: Some(value),
            kind,
            checklist: None,
        }
    }

    /// Input carrying checklist progress.
    pub fn checklist(progress: ChecklistProgress) -> Self {
        Self {
            value: None,
            kind: FieldKind::Checklist,
            checklist: Some(progress),
        }
    }
}

impl Condition {
    /// `value > x`
    pub fn greater_than(x: f64) -> Self {
        Condition::Compare(CompareOp::GreaterThan, x)
    }

    /// `value >= x`
    pub fn greater_than_or_equal(x: f64) -> Self {
        Condition::Compare(CompareOp::GreaterThanOrEqual, x)
    }

    /// `value < x`
    pub fn less_than(x: f64) -> Self {
        Condition::Compare(CompareOp::LessThan, x)
    }

    /// `value <= x`
    pub fn less_than_or_equal(x: f64) -> Self {
        Condition::Compare(CompareOp::LessThanOrEqual, x)
    }

    /// All non-heading checklist items complete.
    pub fn all_checklist_items() -> Self {
        Condition::ChecklistCompletion(ChecklistCompletionCondition::all())
    }

    /// The clauses written at this level of the mapping.
    fn clauses(&self) -> &[Condition] {
        match self {
            Condition::Conjunction(clauses) => clauses,
            other => std::slice::from_ref(other),
        }
    }

    /// First present of `greater_than`, `greater_than_or_equal`,
    /// `less_than`, `less_than_or_equal`, else `range.min`.
    pub fn numeric_bound(&self) -> Option<f64> {
        let clauses = self.clauses();
        for op in [
            CompareOp::GreaterThan,
            CompareOp::GreaterThanOrEqual,
            CompareOp::LessThan,
            CompareOp::LessThanOrEqual,
        ] {
            let found = clauses.iter().find_map(|c| match c {
                Condition::Compare(o, x) if *o == op => Some(*x),
                _ => None,
            });
            if found.is_some() {
                return found;
            }
        }
        clauses.iter().find_map(|c| match c {
            Condition::Range(range) => range.min,
            _ => None,
        })
    }

    /// The checklist completion clause at this level, if any.
    pub fn checklist_completion(&self) -> Option<&ChecklistCompletionCondition> {
        self.clauses().iter().find_map(|c| match c {
            Condition::ChecklistCompletion(cc) => Some(cc),
            _ => None,
        })
    }

    /// Evaluate the expression.
    pub fn evaluate(&self, input: &EvalInput<'_>) -> Result<bool> {
        match self {
            Condition::Compare(op, bound) => {
                let x = numeric_input(input)?;
                Ok(op.apply(x, *bound))
            }
            Condition::Range(range) => Ok(range.contains(numeric_input(input)?)),
            Condition::Equals(expected) => {
                let actual = input
                    .value
                    .ok_or_else(|| ValidationError::required("condition requires a value"))?;
                Ok(match (actual.numeric_for(input.kind), expected.as_f64()) {
                    (Some(a), Some(b)) => a == b,
                    _ => actual == expected,
                })
            }
            Condition::Before(limit) => Ok(time_input(input)? < *limit),
            Condition::After(limit) => Ok(time_input(input)? > *limit),
            Condition::ChecklistCompletion(cc) => {
                if cc.required_items != REQUIRED_ITEMS_ALL {
                    return Err(ValidationError::inconsistent(format!(
                        "unsupported checklist completion policy '{}'",
                        cc.required_items
                    )));
                }
                let progress = input.checklist.ok_or_else(|| {
                    ValidationError::required("checklist completion requires checklist progress")
                })?;
                Ok(progress.is_complete())
            }
            Condition::And(children) | Condition::Conjunction(children) => {
                for child in children {
                    if !child.evaluate(input)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Condition::Or(children) => {
                for child in children {
                    if child.evaluate(input)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Condition::Not(child) => Ok(!child.evaluate(input)?),
        }
    }
}

fn numeric_input(input: &EvalInput<'_>) -> Result<f64> {
    let value = input
        .value
        .ok_or_else(|| ValidationError::required("condition requires a value"))?;
    value.numeric_for(input.kind).ok_or_else(|| {
        ValidationError::inconsistent(format!(
            "numeric condition cannot be applied to {} value '{}'",
            value.kind_name(),
            value
        ))
    })
}

fn time_input(input: &EvalInput<'_>) -> Result<NaiveTime> {
    let value = input
        .value
        .ok_or_else(|| ValidationError::required("condition requires a value"))?;
    match value {
        EntryValue::TimeOfDay(t) => Ok(*t),
        EntryValue::Text(s) => parse_time_of_day(s).ok_or_else(|| {
            ValidationError::format(format!("value '{}' is not a time of day", s))
        }),
        other => Err(ValidationError::inconsistent(format!(
            "time condition cannot be applied to {} value",
            other.kind_name()
        ))),
    }
}

/// Flat on-disk shape of a condition.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    greater_than: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    greater_than_or_equal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    less_than: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    less_than_or_equal: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    equals: Option<EntryValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    after: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    range: Option<RangeCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    checklist_completion: Option<ChecklistCompletionCondition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    and: Option<Vec<Condition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    or: Option<Vec<Condition>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    not: Option<Box<Condition>>,
}

impl TryFrom<RawCondition> for Condition {
    type Error = ValidationError;

    fn try_from(raw: RawCondition) -> Result<Self> {
        let parse_time = |field: &str, s: &str| {
            parse_time_of_day(s).ok_or_else(|| {
                ValidationError::format(format!("invalid {} time '{}': expected HH:MM", field, s))
            })
        };

        let mut clauses = Vec::new();
        if let Some(x) = raw.greater_than {
            clauses.push(Condition::greater_than(x));
        }
        if let Some(x) = raw.greater_than_or_equal {
            clauses.push(Condition::greater_than_or_equal(x));
        }
        if let Some(x) = raw.less_than {
            clauses.push(Condition::less_than(x));
        }
        if let Some(x) = raw.less_than_or_equal {
            clauses.push(Condition::less_than_or_equal(x));
        }
        if let Some(v) = raw.equals {
            clauses.push(Condition::Equals(v));
        }
        if let Some(s) = raw.before {
            clauses.push(Condition::Before(parse_time("before", &s)?));
        }
        if let Some(s) = raw.after {
            clauses.push(Condition::After(parse_time("after", &s)?));
        }
        if let Some(range) = raw.range {
            clauses.push(Condition::Range(range));
        }
        if let Some(cc) = raw.checklist_completion {
            clauses.push(Condition::ChecklistCompletion(cc));
        }
        if let Some(children) = raw.and {
            clauses.push(Condition::And(children));
        }
        if let Some(children) = raw.or {
            clauses.push(Condition::Or(children));
        }
        if let Some(child) = raw.not {
            clauses.push(Condition::Not(child));
        }

        match clauses.len() {
            0 => Err(ValidationError::required("condition must specify at least one clause")),
            1 => Ok(clauses.remove(0)),
            _ => Ok(Condition::Conjunction(clauses)),
        }
    }
}

impl From<Condition> for RawCondition {
    fn from(condition: Condition) -> Self {
        let mut raw = RawCondition::default();
        let clauses = match condition {
            Condition::Conjunction(clauses) => clauses,
            other => vec![other],
        };
        let mut overflow = Vec::new();

        for clause in clauses {
            let slot_taken = match &clause {
                Condition::Compare(CompareOp::GreaterThan, _) => raw.greater_than.is_some(),
                Condition::Compare(CompareOp::GreaterThanOrEqual, _) => {
                    raw.greater_than_or_equal.is_some()
                }
                Condition::Compare(CompareOp::LessThan, _) => raw.less_than.is_some(),
                Condition::Compare(CompareOp::LessThanOrEqual, _) => {
                    raw.less_than_or_equal.is_some()
                }
                Condition::Equals(_) => raw.equals.is_some(),
                Condition::Before(_) => raw.before.is_some(),
                Condition::After(_) => raw.after.is_some(),
                Condition::Range(_) => raw.range.is_some(),
                Condition::ChecklistCompletion(_) => raw.checklist_completion.is_some(),
                Condition::And(_) => raw.and.is_some(),
                Condition::Or(_) => raw.or.is_some(),
                Condition::Not(_) => raw.not.is_some(),
                Condition::Conjunction(_) => true,
            };
            if slot_taken {
                overflow.push(clause);
                continue;
            }
            match clause {
                Condition::Compare(CompareOp::GreaterThan, x) => raw.greater_than = Some(x),
                Condition::Compare(CompareOp::GreaterThanOrEqual, x) => {
                    raw.greater_than_or_equal = Some(x)
                }
                Condition::Compare(CompareOp::LessThan, x) => raw.less_than = Some(x),
                Condition::Compare(CompareOp::LessThanOrEqual, x) => {
                    raw.less_than_or_equal = Some(x)
                }
                Condition::Equals(v) => raw.equals = Some(v),
                Condition::Before(t) => raw.before = Some(format_time_of_day(&t)),
                Condition::After(t) => raw.after = Some(format_time_of_day(&t)),
                Condition::Range(r) => raw.range = Some(r),
                Condition::ChecklistCompletion(cc) => raw.checklist_completion = Some(cc),
                Condition::And(children) => raw.and = Some(children),
                Condition::Or(children) => raw.or = Some(children),
                Condition::Not(child) => raw.not = Some(child),
                Condition::Conjunction(_) => {}
            }
        }

        // Clauses that collide with an occupied key still have to hold.
        if !overflow.is_empty() {
            raw.and.get_or_insert_with(Vec::new).extend(overflow);
        }
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> Condition {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_single_clause_parses_to_leaf() {
        assert_eq!(parse("greater_than: 30\n"), Condition::greater_than(30.0));
        assert_eq!(
            parse("checklist_completion:\n  required_items: all\n"),
            Condition::all_checklist_items()
        );
    }

    #[test]
    fn test_multiple_fields_form_conjunction_in_field_order() {
        let c = parse("less_than: 60\ngreater_than: 10\n");
        assert_eq!(
            c,
            Condition::Conjunction(vec![Condition::greater_than(10.0), Condition::less_than(60.0)])
        );
    }

    #[test]
    fn test_empty_condition_rejected() {
        assert!(serde_yaml::from_str::<Condition>("{}").is_err());
    }

    #[test]
    fn test_numeric_bound_priority() {
        assert_eq!(parse("less_than: 5\ngreater_than_or_equal: 3\n").numeric_bound(), Some(3.0));
        assert_eq!(parse("less_than_or_equal: 8\n").numeric_bound(), Some(8.0));
        assert_eq!(parse("range:\n  min: 2\n  max: 9\n").numeric_bound(), Some(2.0));
        assert_eq!(parse("range:\n  max: 9\n").numeric_bound(), None);
        assert_eq!(parse("equals: 4\n").numeric_bound(), None);
        assert_eq!(parse("before: \"07:00\"\n").numeric_bound(), None);
    }

    #[test]
    fn test_yaml_shape_is_preserved() {
        for yaml in [
            "greater_than: 30.0\n",
            "greater_than: 10.0\nless_than: 60.0\n",
            "checklist_completion:\n  required_items: all\n",
            "and:\n- greater_than: 1.0\n- less_than: 5.0\n",
            "not:\n  equals: 0\n",
        ] {
            let c = parse(yaml);
            let out = serde_yaml::to_string(&c).unwrap();
            assert_eq!(parse(&out), c, "yaml: {yaml}");
            assert_eq!(out, yaml);
        }
    }

    #[test]
    fn test_evaluate_numeric() {
        let v = EntryValue::Int(45);
        let input = EvalInput::value(&v, FieldKind::UnsignedInt);
        assert!(parse("greater_than_or_equal: 45\n").evaluate(&input).unwrap());
        assert!(!parse("greater_than: 45\n").evaluate(&input).unwrap());
        assert!(parse("range:\n  min: 30\n  max: 60\n").evaluate(&input).unwrap());
        assert!(!parse("range:\n  min: 45\n  min_inclusive: false\n").evaluate(&input).unwrap());
        assert!(parse("or:\n- less_than: 10\n- equals: 45\n").evaluate(&input).unwrap());
        assert!(parse("not:\n  less_than: 10\n").evaluate(&input).unwrap());
    }

    #[test]
    fn test_evaluate_time() {
        let v = EntryValue::TimeOfDay(NaiveTime::from_hms_opt(6, 45, 0).unwrap());
        let input = EvalInput::value(&v, FieldKind::Time);
        assert!(parse("before: \"07:00\"\n").evaluate(&input).unwrap());
        assert!(!parse("after: \"07:00\"\n").evaluate(&input).unwrap());
    }

    #[test]
    fn test_evaluate_type_mismatch_is_error() {
        let v = EntryValue::Text("lots".into());
        let input = EvalInput::value(&v, FieldKind::Text);
        assert!(parse("greater_than: 1\n").evaluate(&input).is_err());
    }

    #[test]
    fn test_evaluate_checklist_completion() {
        let c = Condition::all_checklist_items();
        let done = EvalInput::checklist(ChecklistProgress { completed: 2, total: 2 });
        let partial = EvalInput::checklist(ChecklistProgress { completed: 1, total: 2 });
        assert!(c.evaluate(&done).unwrap());
        assert!(!c.evaluate(&partial).unwrap());

        let most = Condition::ChecklistCompletion(ChecklistCompletionCondition {
            required_items: "most".into(),
        });
        assert!(most.evaluate(&done).is_err());
    }
}
