use std::collections::BTreeMap;

use snafu::{OptionExt, ensure};

use super::{
    Condition, FieldMarker, IncludeRequiresBoolSnafu, Literal, ResourceMarker, Result, Scope,
    UnknownFieldSnafu, ValueTypeMismatchSnafu,
};
use crate::api::FieldType;

/// The non-arbitrary fields declared by the field markers of one API,
/// keyed by their dotted name.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkerSet {
    fields: BTreeMap<String, FieldType>,
}

impl MarkerSet {
    pub fn insert(&mut self, marker: &FieldMarker) {
        if !marker.arbitrary {
            self.fields.insert(marker.name.clone(), marker.field_type);
        }
    }

    pub fn get(&self, name: &str) -> Option<FieldType> {
        self.fields.get(name).copied()
    }

    /// Iterates over the references to all fields (as used in rewritten
    /// manifests) along with their types.
    pub fn references(&self, scope: Scope) -> impl Iterator<Item = (String, FieldType)> + '_ {
        self.fields
            .iter()
            .map(move |(name, field_type)| (scope.reference(name), *field_type))
    }
}

/// A resource marker which has been checked against the declared fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Guard {
    /// The reference to the field, e.g. `parent.Spec.Provider`.
    pub reference: String,
    pub field_type: FieldType,
    pub expected: Literal,
}

impl ResourceMarker {
    /// Checks the marker against the fields of the workload (`own`) and of
    /// its collection, if any.
    pub fn resolve(&self, own: &MarkerSet, collection: Option<&MarkerSet>) -> Result<Guard> {
        let fields = match self.scope {
            Scope::Parent => Some(own),
            Scope::Collection => collection,
        };
        let field_type = fields
            .and_then(|fields| fields.get(&self.field))
            .context(UnknownFieldSnafu {
                field: &self.field,
                line: self.line,
            })?;

        let expected = match &self.condition {
            Condition::Include(include) => {
                ensure!(
                    field_type == FieldType::Bool,
                    IncludeRequiresBoolSnafu {
                        field: &self.field,
                        field_type,
                        line: self.line,
                    }
                );
                Literal::Bool(*include)
            }
            Condition::Value(value) => {
                Literal::parse(field_type, value).context(ValueTypeMismatchSnafu {
                    field: &self.field,
                    value,
                    field_type,
                    line: self.line,
                })?
            }
        };

        Ok(Guard {
            reference: self.scope.reference(&self.field),
            field_type,
            expected,
        })
    }
}
