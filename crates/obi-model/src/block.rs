//! Blocks: leaf configuration fragments
//!
//! A block declares its sweepable fields in a field table (see
//! [`impl_block!`](crate::impl_block)). Sweep detection and the single
//! coordinate checks both read that table; nothing is discovered by
//! inspecting values at runtime.

use serde::{Deserialize, Serialize};

use crate::path::LocationPath;
use crate::value::{ParamValue, SweepField};

/// A configuration model carrying a concrete type name
///
/// Serialized models write this name under the `type` key.
pub trait Polymorphic {
    /// Concrete type name of this value
    fn type_name(&self) -> &'static str;
}

/// Leaf configuration fragment
pub trait Block: Polymorphic {
    /// Declared sweepable fields in declaration order
    fn sweep_fields(&self) -> Vec<(&'static str, &dyn SweepField)>;

    /// Field constraints checked once every field holds a single value
    ///
    /// # Errors
    /// Returns [`BlockError::Constraint`] naming the violating field
    fn validate(&self) -> Result<(), BlockError> {
        Ok(())
    }

    /// Swept fields of this block
    ///
    /// Every field holding a list of more than one value yields one
    /// parameter located at `[category_name, block_key?, field]`. Lists of
    /// length one or zero are not sweeps.
    fn multiple_value_parameters(&self, category_name: &str, block_key: &str) -> Vec<MultiValueParameter> {
        let base = if block_key.is_empty() {
            LocationPath::single(category_name)
        } else {
            LocationPath::single(category_name).child(block_key)
        };

        self.sweep_fields()
            .into_iter()
            .filter(|(_, field)| field.list_len().is_some_and(|len| len > 1))
            .map(|(name, field)| MultiValueParameter {
                location: base.child(name),
                values: field.candidates(),
            })
            .collect()
    }

    /// Fail if any field still holds a list, of any length
    ///
    /// # Errors
    /// Returns [`BlockError::UnresolvedList`] for the first list field
    fn enforce_no_lists(&self) -> Result<(), BlockError> {
        for (name, field) in self.sweep_fields() {
            if let Some(len) = field.list_len() {
                return Err(BlockError::UnresolvedList {
                    block: self.type_name().to_string(),
                    field: name.to_string(),
                    len,
                });
            }
        }
        Ok(())
    }
}

/// One swept field: where it lives and the values it takes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiValueParameter {
    /// Location from the form root
    #[serde(rename = "location_list")]
    pub location: LocationPath,
    /// Candidate values in source order
    pub values: Vec<ParamValue>,
}

impl MultiValueParameter {
    /// Number of candidate values
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if there are no candidates
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Block validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BlockError {
    /// A field still holds a list on a single coordinate
    #[error("{block}.{field} holds a list of {len} value(s) where a single value is required")]
    UnresolvedList {
        block: String,
        field: String,
        len: usize,
    },

    /// A resolved value violates a field constraint
    #[error("{block}.{field}: {message}")]
    Constraint {
        block: String,
        field: String,
        message: String,
    },
}

impl BlockError {
    /// Create constraint violation
    #[inline]
    pub fn constraint(block: &dyn Polymorphic, field: &str, message: impl Into<String>) -> Self {
        Self::Constraint {
            block: block.type_name().to_string(),
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Implement [`Polymorphic`] and [`Block`] for a struct from its sweepable fields
///
/// ```rust,ignore
/// impl_block!(Initialize { simulation_length, v_init });
/// impl_block!(Stimulus { probability } validate: Stimulus::check);
/// ```
#[macro_export]
macro_rules! impl_block {
    ($ty:ident { $($field:ident),* $(,)? } $(validate: $validate:path)?) => {
        impl $crate::Polymorphic for $ty {
            fn type_name(&self) -> &'static str {
                stringify!($ty)
            }
        }

        impl $crate::Block for $ty {
            fn sweep_fields(&self) -> ::std::vec::Vec<(&'static str, &dyn $crate::SweepField)> {
                ::std::vec![$((stringify!($field), &self.$field as &dyn $crate::SweepField)),*]
            }

            $(
                fn validate(&self) -> ::std::result::Result<(), $crate::BlockError> {
                    $validate(self)
                }
            )?
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Sweepable;

    #[derive(Debug, Clone)]
    struct Initialize {
        param_a: Sweepable<i64>,
        label: Sweepable<String>,
        window: Sweepable<(f64, f64)>,
    }

    crate::impl_block!(Initialize { param_a, label, window });

    #[derive(Debug, Clone)]
    struct Bounded {
        probability: Sweepable<f64>,
    }

    fn check_bounded(block: &Bounded) -> Result<(), BlockError> {
        match block.probability.resolved() {
            Some(p) if !(0.0..=1.0).contains(p) => Err(BlockError::constraint(block, "probability", "must lie in [0, 1]")),
            _ => Ok(()),
        }
    }

    crate::impl_block!(Bounded { probability } validate: check_bounded);

    fn initialize() -> Initialize {
        Initialize {
            param_a: Sweepable::Swept(vec![1, 2]),
            label: Sweepable::Resolved("x".into()),
            window: Sweepable::Swept(vec![(0.0, 1.0), (1.0, 2.0), (2.0, 3.0)]),
        }
    }

    #[test]
    fn type_name_from_macro() {
        assert_eq!(initialize().type_name(), "Initialize");
    }

    #[test]
    fn multiple_value_parameters_in_field_order() {
        let params = initialize().multiple_value_parameters("initialize", "");
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].location.to_string(), "initialize.param_a");
        assert_eq!(params[0].values, vec![ParamValue::Int(1), ParamValue::Int(2)]);
        assert_eq!(params[1].location.to_string(), "initialize.window");
        assert_eq!(params[1].len(), 3);
    }

    #[test]
    fn multiple_value_parameters_with_block_key() {
        let params = initialize().multiple_value_parameters("stimuli", "s1");
        assert_eq!(params[0].location.segments(), &["stimuli", "s1", "param_a"]);
    }

    #[test]
    fn short_lists_are_not_sweeps() {
        let mut block = initialize();
        block.param_a = Sweepable::Swept(vec![1]);
        block.window = Sweepable::Swept(Vec::new());
        assert!(block.multiple_value_parameters("initialize", "").is_empty());
    }

    #[test]
    fn enforce_no_lists_rejects_any_list() {
        let mut block = initialize();
        block.param_a = Sweepable::Resolved(1);
        block.window = Sweepable::Swept(vec![(0.0, 1.0)]);

        let err = block.enforce_no_lists().unwrap_err();
        assert_eq!(
            err,
            BlockError::UnresolvedList {
                block: "Initialize".into(),
                field: "window".into(),
                len: 1,
            }
        );
    }

    #[test]
    fn enforce_no_lists_accepts_resolved() {
        let block = Initialize {
            param_a: Sweepable::Resolved(1),
            label: Sweepable::Resolved("x".into()),
            window: Sweepable::Resolved((0.0, 1.0)),
        };
        assert!(block.enforce_no_lists().is_ok());
    }

    #[test]
    fn custom_validate_from_macro() {
        let ok = Bounded { probability: Sweepable::Resolved(0.5) };
        assert!(ok.validate().is_ok());

        let bad = Bounded { probability: Sweepable::Resolved(1.5) };
        let err = bad.validate().unwrap_err();
        assert!(err.to_string().contains("Bounded.probability"));
    }

    #[test]
    fn default_validate_accepts() {
        assert!(initialize().validate().is_ok());
    }
}
