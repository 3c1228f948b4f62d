use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelectorRequirement;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Selects objects by identity fields and labels. Field and label
/// requirements are ANDed; a selector with neither matches everything.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenericSelector {
    /// Only the `name` and `namespace` keys and the `In` and `NotIn`
    /// operators are evaluated. Other requirements are ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_selector: Option<Vec<FieldSelectorRequirement>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<Vec<LabelSelectorRequirement>>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub struct FieldSelectorRequirement {
    pub key: String,
    pub operator: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldKey {
    Name,
    Namespace,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldOperator {
    In,
    NotIn,
}

// === impl GenericSelector ===

impl GenericSelector {
    pub fn fields(&self) -> impl Iterator<Item = &FieldSelectorRequirement> {
        self.field_selector.iter().flatten()
    }

    pub fn label_requirements(&self) -> &[LabelSelectorRequirement] {
        self.label_selector.as_deref().unwrap_or_default()
    }
}

// === impl FieldSelectorRequirement ===

impl FieldSelectorRequirement {
    pub fn new(
        key: impl Into<String>,
        operator: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            key: key.into(),
            operator: operator.into(),
            values: Some(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Returns the key and operator when both are supported.
    pub fn supported(&self) -> Option<(FieldKey, FieldOperator)> {
        let key = match self.key.as_str() {
            "name" => FieldKey::Name,
            "namespace" => FieldKey::Namespace,
            _ => return None,
        };
        let op = match self.operator.as_str() {
            "In" => FieldOperator::In,
            "NotIn" => FieldOperator::NotIn,
            _ => return None,
        };
        Some((key, op))
    }

    pub fn values(&self) -> &[String] {
        self.values.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_fields() {
        let req = FieldSelectorRequirement::new("name", "In", ["a"]);
        assert_eq!(req.supported(), Some((FieldKey::Name, FieldOperator::In)));

        let req = FieldSelectorRequirement::new("namespace", "NotIn", ["a"]);
        assert_eq!(
            req.supported(),
            Some((FieldKey::Namespace, FieldOperator::NotIn))
        );

        assert_eq!(
            FieldSelectorRequirement::new("uid", "In", ["a"]).supported(),
            None
        );
        assert_eq!(
            FieldSelectorRequirement::new("name", "Exists", None::<String>).supported(),
            None
        );
    }

    #[test]
    fn deserialize() {
        let selector: GenericSelector = serde_json::from_value(serde_json::json!({
            "fieldSelector": [{"key": "name", "operator": "In", "values": ["fast-ssd"]}],
            "labelSelector": [{"key": "tier", "operator": "Exists"}],
        }))
        .expect("selector must deserialize");

        assert_eq!(
            selector.fields().collect::<Vec<_>>(),
            vec![&FieldSelectorRequirement::new("name", "In", ["fast-ssd"])]
        );
        assert_eq!(selector.label_requirements().len(), 1);
        assert_eq!(selector.label_requirements()[0].key, "tier");
        assert_eq!(selector.label_requirements()[0].values, None);
    }
}
