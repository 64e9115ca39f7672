use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ParamType {
    Number,
    Boolean,
}
impl ParamType {
    pub fn default_value(self) -> ParamValue {
        match self {
            ParamType::Number => ParamValue::Number(0.0),
            ParamType::Boolean => ParamValue::Boolean(false),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum ParamValue {
    Number(f32),
    Boolean(bool),
}
impl ParamValue {
    pub fn param_type(self) -> ParamType {
        match self {
            ParamValue::Number(_) => ParamType::Number,
            ParamValue::Boolean(_) => ParamType::Boolean,
        }
    }

    /// Booleans compare as 0 / 1.
    pub fn as_f32(self) -> f32 {
        match self {
            ParamValue::Number(n) => n,
            ParamValue::Boolean(b) => b as u8 as f32,
        }
    }
}
impl From<f32> for ParamValue {
    fn from(n: f32) -> Self {
        ParamValue::Number(n)
    }
}
impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        ParamValue::Boolean(b)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parameter {
    param_type: ParamType,
    pub(crate) value: ParamValue,
}
impl Parameter {
    pub fn new(param_type: ParamType) -> Self {
        Self {
            param_type,
            value: param_type.default_value(),
        }
    }

    pub fn param_type(&self) -> ParamType {
        self.param_type
    }

    pub fn value(&self) -> ParamValue {
        self.value
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ConditionOp {
    Equal,
    NotEqual,
    Greater,
    Less,
}

/// `parameter <op> operand`, looked up by name each time it is evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub parameter: String,
    pub op: ConditionOp,
    pub operand: ParamValue,
}
impl Condition {
    pub fn new(parameter: impl Into<String>, op: ConditionOp, operand: ParamValue) -> Self {
        Self {
            parameter: parameter.into(),
            op,
            operand,
        }
    }

    /// A condition on a parameter that no longer exists never holds.
    pub fn satisfied(&self, params: &HashMap<String, Parameter>) -> bool {
        let Some(param) = params.get(&self.parameter) else {
            return false;
        };
        let (lhs, rhs) = (param.value.as_f32(), self.operand.as_f32());
        match self.op {
            ConditionOp::Equal => lhs == rhs,
            ConditionOp::NotEqual => lhs != rhs,
            ConditionOp::Greater => lhs > rhs,
            ConditionOp::Less => lhs < rhs,
        }
    }
}
