use crate::validation::{self, LabelError};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

pub type Map = BTreeMap<String, String>;

/// A compiled set of label requirements. All requirements must hold.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selector {
    expressions: Vec<Expression>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Expression {
    key: String,
    operator: Operator,
    values: BTreeSet<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("invalid label key: {0}")]
    Key(#[source] LabelError),

    #[error("invalid value for key {key:?}: {source}")]
    Value {
        key: String,
        #[source]
        source: LabelError,
    },

    #[error("unsupported operator {operator:?} for key {key:?}")]
    Operator { key: String, operator: String },

    #[error("operator {operator:?} for key {key:?} requires at least one value")]
    MissingValues { key: String, operator: &'static str },

    #[error("operator {operator:?} for key {key:?} must not have values")]
    UnexpectedValues { key: String, operator: &'static str },
}

// === Selector ===

impl Selector {
    /// Compiles match expressions, rejecting unknown operators, malformed keys
    /// or values, and value sets that don't fit the operator.
    pub fn compile(requirements: &[LabelSelectorRequirement]) -> Result<Self, Error> {
        let expressions = requirements
            .iter()
            .map(Expression::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { expressions })
    }

    pub fn matches(&self, labels: &Map) -> bool {
        self.expressions.iter().all(|expr| expr.matches(labels))
    }
}

impl std::iter::FromIterator<Expression> for Selector {
    fn from_iter<T: IntoIterator<Item = Expression>>(iter: T) -> Self {
        Self {
            expressions: iter.into_iter().collect(),
        }
    }
}

// === Expression ===

impl Expression {
    pub fn new(
        key: impl Into<String>,
        operator: Operator,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            key: key.into(),
            operator,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    fn compile(req: &LabelSelectorRequirement) -> Result<Self, Error> {
        validation::validate_qualified_name(&req.key).map_err(Error::Key)?;

        let operator = req.operator.parse::<Operator>().map_err(|()| Error::Operator {
            key: req.key.clone(),
            operator: req.operator.clone(),
        })?;

        let values = req.values.as_deref().unwrap_or_default();
        match operator {
            Operator::In | Operator::NotIn if values.is_empty() => {
                return Err(Error::MissingValues {
                    key: req.key.clone(),
                    operator: operator.as_str(),
                });
            }
            Operator::Exists | Operator::DoesNotExist if !values.is_empty() => {
                return Err(Error::UnexpectedValues {
                    key: req.key.clone(),
                    operator: operator.as_str(),
                });
            }
            _ => {}
        }

        for value in values {
            validation::validate_label_value(value).map_err(|source| Error::Value {
                key: req.key.clone(),
                source,
            })?;
        }

        Ok(Self {
            key: req.key.clone(),
            operator,
            values: values.iter().cloned().collect(),
        })
    }

    fn matches(&self, labels: &Map) -> bool {
        match self.operator {
            Operator::In => labels
                .get(&self.key)
                .map(|v| self.values.contains(v))
                .unwrap_or(false),
            Operator::NotIn => labels
                .get(&self.key)
                .map(|v| !self.values.contains(v))
                .unwrap_or(true),
            Operator::Exists => labels.contains_key(&self.key),
            Operator::DoesNotExist => !labels.contains_key(&self.key),
        }
    }
}

// === Operator ===

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "In",
            Self::NotIn => "NotIn",
            Self::Exists => "Exists",
            Self::DoesNotExist => "DoesNotExist",
        }
    }
}

impl std::str::FromStr for Operator {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "In" => Ok(Self::In),
            "NotIn" => Ok(Self::NotIn),
            "Exists" => Ok(Self::Exists),
            "DoesNotExist" => Ok(Self::DoesNotExist),
            _ => Err(()),
        }
    }
}
