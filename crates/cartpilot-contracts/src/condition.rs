//! Conditions evaluated by `if` and `while` commands.

use serde::{Deserialize, Serialize};

use crate::selector::Selector;

/// A boolean test evaluated by the page-side interpreter.
///
/// The `type` field selects the variant: `element_visible` (or
/// `element-visible`) is a DOM presence check, while `and` / `or` / `not`
/// combine operands that the interpreter has already evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ConditionRepr", into = "ConditionRepr")]
pub enum Condition {
    ElementVisible(ElementVisible),
    Logic(LogicCondition),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementVisible {
    pub value: Option<Selector>,
    /// Sub-conditions combined with the visibility check.
    pub operands: Option<Vec<Condition>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogicCondition {
    pub operator: LogicOperator,
    /// Name of the evaluated operand set the operator applies to.
    pub operands: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicOperator {
    And,
    Or,
    Not,
}

impl Condition {
    pub fn visible(selector: impl Into<Selector>) -> Self {
        Self::ElementVisible(ElementVisible {
            value: Some(selector.into()),
            operands: None,
        })
    }

    pub fn logic(operator: LogicOperator, operands: Option<&str>) -> Self {
        Self::Logic(LogicCondition {
            operator,
            operands: operands.map(str::to_string),
        })
    }

    /// Nesting depth of this condition (a leaf has depth 1).
    pub fn depth(&self) -> usize {
        match self {
            Self::ElementVisible(visible) => {
                1 + visible
                    .operands
                    .iter()
                    .flatten()
                    .map(Condition::depth)
                    .max()
                    .unwrap_or(0)
            }
            Self::Logic(_) => 1,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type")]
enum ConditionRepr {
    #[serde(rename = "element_visible", alias = "element-visible")]
    ElementVisible {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<Selector>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operands: Option<Vec<Condition>>,
    },
    #[serde(rename = "and")]
    And {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operands: Option<String>,
    },
    #[serde(rename = "or")]
    Or {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operands: Option<String>,
    },
    #[serde(rename = "not")]
    Not {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        operands: Option<String>,
    },
}

impl From<ConditionRepr> for Condition {
    fn from(repr: ConditionRepr) -> Self {
        let (operator, operands) = match repr {
            ConditionRepr::ElementVisible { value, operands } => {
                return Self::ElementVisible(ElementVisible { value, operands });
            }
            ConditionRepr::And { operands } => (LogicOperator::And, operands),
            ConditionRepr::Or { operands } => (LogicOperator::Or, operands),
            ConditionRepr::Not { operands } => (LogicOperator::Not, operands),
        };
        Self::Logic(LogicCondition { operator, operands })
    }
}

impl From<Condition> for ConditionRepr {
    fn from(condition: Condition) -> Self {
        match condition {
            Condition::ElementVisible(ElementVisible { value, operands }) => {
                Self::ElementVisible { value, operands }
            }
            Condition::Logic(LogicCondition { operator, operands }) => match operator {
                LogicOperator::And => Self::And { operands },
                LogicOperator::Or => Self::Or { operands },
                LogicOperator::Not => Self::Not { operands },
            },
        }
    }
}
