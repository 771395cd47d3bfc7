//! Resolution: turning a [`QueryExpression`] plus execution-time input into a
//! fully concrete [`ResolvedQuery`].
//!
//! Every deferred value is evaluated to a literal, includes and projections
//! are expanded against the metadata oracle, and pagination is pinned down.
//! Resolutions are independent of one another, so resolving the same
//! expression twice with the same context yields structurally equal results,
//! and re-resolving with different parameters rebinds only the parameterized
//! positions.

mod context;
mod resolved;

pub use context::QueryContext;
pub use resolved::{
    ResolvedAggregation, ResolvedFilter, ResolvedInclude, ResolvedIncludeKind, ResolvedProjection,
    ResolvedQuery, ResolvedSubcollectionProjection,
};

use crate::error::{failed_precondition, invalid_argument, OdmResult};
use crate::expression::{
    AggregationSpec, CursorExpression, FirestoreCursor, IncludeSpec, ProjectionSpec,
    SubcollectionProjection, QueryExpression, ValueExpression, WhereClause,
};
use crate::metadata::{MetadataProvider, NavigationKind};
use crate::value::{Value, ValueKind};

/// Exclusive upper bound appended for prefix matching.
const PREFIX_UPPER_BOUND: char = '\u{ffff}';

pub struct QueryResolver<'a> {
    metadata: &'a dyn MetadataProvider,
}

impl<'a> QueryResolver<'a> {
    pub fn new(metadata: &'a dyn MetadataProvider) -> Self {
        Self { metadata }
    }

    pub fn resolve(
        &self,
        expression: &QueryExpression,
        context: &QueryContext,
    ) -> OdmResult<ResolvedQuery> {
        let filters = expression
            .filters()
            .iter()
            .map(|clause| self.resolve_filter(clause, context))
            .collect::<OdmResult<Vec<_>>>()?;

        let limit = expression
            .limit()
            .map(|expr| self.resolve_integer(expr, context, "limit"))
            .transpose()?;
        let skip = expression
            .skip()
            .map(|expr| self.resolve_integer(expr, context, "skip"))
            .transpose()?;
        let document_id = expression
            .id_lookup()
            .map(|expr| self.resolve_document_id(expr, context))
            .transpose()?;
        let cursor = expression
            .cursor()
            .map(|cursor| self.resolve_cursor(cursor, context))
            .transpose()?;

        let includes = self.resolve_includes(expression.entity(), expression.includes())?;
        let projection = expression
            .projection()
            .map(|projection| self.resolve_projection(expression.entity(), projection, context))
            .transpose()?;

        Ok(ResolvedQuery::new(
            expression.source_collection().to_string(),
            expression.entity(),
            filters,
            expression.order_by().to_vec(),
            limit,
            skip,
            document_id,
            cursor,
            includes,
            expression.aggregation().cloned().map(ResolvedAggregation::from_spec),
            projection,
        ))
    }

    pub fn resolve_value(
        &self,
        expression: &ValueExpression,
        context: &QueryContext,
    ) -> OdmResult<Value> {
        match expression {
            ValueExpression::Constant(value) => Ok(value.clone()),
            ValueExpression::Parameter(name) => context.parameter(name).cloned().ok_or_else(|| {
                invalid_argument(format!("No value bound for query parameter '{name}'"))
            }),
            ValueExpression::Member { target, path } => {
                target.value_at(path).cloned().ok_or_else(|| {
                    invalid_argument(format!(
                        "Captured object has no member at path '{}'",
                        path.canonical_string()
                    ))
                })
            }
            ValueExpression::PrefixUpperBound(inner) => {
                let prefix = self.resolve_value(inner, context)?;
                match prefix.kind() {
                    ValueKind::String(s) => {
                        Ok(Value::from_string(format!("{s}{PREFIX_UPPER_BOUND}")))
                    }
                    other => Err(invalid_argument(format!(
                        "Prefix upper bounds require a string operand (found {other:?})"
                    ))),
                }
            }
        }
    }

    fn resolve_filter(
        &self,
        clause: &WhereClause,
        context: &QueryContext,
    ) -> OdmResult<ResolvedFilter> {
        Ok(ResolvedFilter::new(
            clause.property().clone(),
            clause.operator(),
            self.resolve_value(clause.value(), context)?,
        ))
    }

    fn resolve_integer(
        &self,
        expression: &ValueExpression,
        context: &QueryContext,
        position: &str,
    ) -> OdmResult<i64> {
        let value = self.resolve_value(expression, context)?;
        value.as_integer().ok_or_else(|| {
            invalid_argument(format!("Query {position} must resolve to an integer"))
        })
    }

    fn resolve_document_id(
        &self,
        expression: &ValueExpression,
        context: &QueryContext,
    ) -> OdmResult<String> {
        let value = self.resolve_value(expression, context)?;
        match value.kind() {
            ValueKind::String(id) => Ok(id.clone()),
            other => Err(invalid_argument(format!(
                "Document id lookups must resolve to a string (found {other:?})"
            ))),
        }
    }

    fn resolve_cursor(
        &self,
        cursor: &CursorExpression,
        context: &QueryContext,
    ) -> OdmResult<FirestoreCursor> {
        let values = cursor
            .order_by_values()
            .iter()
            .map(|expr| self.resolve_value(expr, context))
            .collect::<OdmResult<Vec<_>>>()?;
        Ok(FirestoreCursor::new(cursor.anchor_document_id(), values))
    }

    fn resolve_includes(
        &self,
        entity: &str,
        includes: &[IncludeSpec],
    ) -> OdmResult<Vec<ResolvedInclude>> {
        if includes.is_empty() {
            return Ok(Vec::new());
        }

        let descriptor = self.metadata.descriptor(entity).ok_or_else(|| {
            failed_precondition(format!("No metadata registered for entity '{entity}'"))
        })?;

        includes
            .iter()
            .map(|include| {
                let navigation = descriptor.navigation(include.name()).ok_or_else(|| {
                    invalid_argument(format!(
                        "Entity '{entity}' has no navigation named '{}'",
                        include.name()
                    ))
                })?;
                let target = self
                    .metadata
                    .descriptor(navigation.target_entity())
                    .ok_or_else(|| {
                        failed_precondition(format!(
                            "No metadata registered for entity '{}'",
                            navigation.target_entity()
                        ))
                    })?;

                let (kind, target_collection) = match navigation.kind() {
                    NavigationKind::Reference { field } => (
                        ResolvedIncludeKind::Reference {
                            field: field.clone(),
                        },
                        target.collection().to_string(),
                    ),
                    NavigationKind::Collection { collection_id } => (
                        ResolvedIncludeKind::Collection {
                            collection_id: collection_id.clone(),
                        },
                        collection_id.clone(),
                    ),
                };

                Ok(ResolvedInclude::new(
                    include.name().to_string(),
                    kind,
                    navigation.target_entity(),
                    target_collection,
                    self.resolve_includes(navigation.target_entity(), include.nested())?,
                ))
            })
            .collect()
    }

    fn resolve_projection(
        &self,
        entity: &str,
        projection: &ProjectionSpec,
        context: &QueryContext,
    ) -> OdmResult<ResolvedProjection> {
        let subcollections = projection
            .subcollections()
            .iter()
            .map(|sub| self.resolve_subcollection(entity, sub, context))
            .collect::<OdmResult<Vec<_>>>()?;
        Ok(ResolvedProjection::new(
            projection.fields().to_vec(),
            subcollections,
        ))
    }

    fn resolve_subcollection(
        &self,
        entity: &str,
        projection: &SubcollectionProjection,
        context: &QueryContext,
    ) -> OdmResult<ResolvedSubcollectionProjection> {
        let descriptor = self.metadata.descriptor(entity).ok_or_else(|| {
            failed_precondition(format!("No metadata registered for entity '{entity}'"))
        })?;
        let navigation = descriptor
            .navigation(projection.navigation_name())
            .ok_or_else(|| {
                invalid_argument(format!(
                    "Entity '{entity}' has no navigation named '{}'",
                    projection.navigation_name()
                ))
            })?;
        let collection_id = match navigation.kind() {
            NavigationKind::Collection { collection_id } => collection_id.clone(),
            NavigationKind::Reference { .. } => {
                return Err(invalid_argument(format!(
                    "Navigation '{}' is a reference; subcollection projections require a \
                     collection navigation",
                    projection.navigation_name()
                )))
            }
        };

        let filters = projection
            .filters()
            .iter()
            .map(|clause| self.resolve_filter(clause, context))
            .collect::<OdmResult<Vec<_>>>()?;
        let limit = projection
            .limit()
            .map(|expr| self.resolve_integer(expr, context, "limit"))
            .transpose()?;
        let nested = projection
            .nested()
            .iter()
            .map(|sub| self.resolve_subcollection(navigation.target_entity(), sub, context))
            .collect::<OdmResult<Vec<_>>>()?;

        Ok(ResolvedSubcollectionProjection::new(
            projection.result_name().to_string(),
            collection_id,
            filters,
            projection.order_by().to_vec(),
            limit,
            projection
                .aggregation()
                .cloned()
                .map(ResolvedAggregation::from_spec),
            projection.fields().to_vec(),
            nested,
        ))
    }
}

impl ResolvedAggregation {
    fn from_spec(spec: AggregationSpec) -> Self {
        ResolvedAggregation::new(spec.kind(), spec.property().cloned(), spec.result())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{FilterOperator, OrderByClause, WhereClause};
    use crate::metadata::MetadataRegistry;
    use crate::model::FieldPath;

    fn field(path: &str) -> FieldPath {
        FieldPath::from_dot_separated(path).unwrap()
    }

    fn expression() -> QueryExpression {
        QueryExpression::for_collection("Order", "orders")
            .with_filter(WhereClause::new(
                field("status"),
                FilterOperator::Equal,
                ValueExpression::parameter("status"),
            ))
            .with_order_by(OrderByClause::ascending(field("total")))
            .with_limit(ValueExpression::parameter("page_size"))
    }

    fn context(status: &str, page_size: i64) -> QueryContext {
        QueryContext::new()
            .with_parameter("status", Value::from_string(status))
            .with_parameter("page_size", Value::from_integer(page_size))
    }

    #[test]
    fn resolution_is_deterministic() {
        let registry = MetadataRegistry::new();
        let resolver = QueryResolver::new(&registry);
        let expression = expression();
        let context = context("paid", 10);

        let first = resolver.resolve(&expression, &context).unwrap();
        let second = resolver.resolve(&expression, &context).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn different_parameters_rebind_only_parameterized_fields() {
        let registry = MetadataRegistry::new();
        let resolver = QueryResolver::new(&registry);
        let expression = expression();

        let first = resolver.resolve(&expression, &context("paid", 10)).unwrap();
        let second = resolver
            .resolve(&expression, &context("pending", 25))
            .unwrap();

        assert_ne!(first.filters()[0].value(), second.filters()[0].value());
        assert_ne!(first.limit(), second.limit());
        assert_eq!(first.order_by(), second.order_by());
        assert_eq!(first.collection(), second.collection());
    }

    #[test]
    fn missing_parameter_is_an_error() {
        let registry = MetadataRegistry::new();
        let resolver = QueryResolver::new(&registry);
        let err = resolver
            .resolve(&expression(), &QueryContext::new())
            .unwrap_err();
        assert_eq!(err.code_str(), "odm/invalid-argument");
    }

    #[test]
    fn prefix_upper_bound_appends_max_char() {
        let registry = MetadataRegistry::new();
        let resolver = QueryResolver::new(&registry);
        let value = resolver
            .resolve_value(
                &ValueExpression::prefix_upper_bound(ValueExpression::constant("ord")),
                &QueryContext::new(),
            )
            .unwrap();
        assert_eq!(value.as_str(), Some("ord\u{ffff}"));
    }

    #[test]
    fn member_access_walks_captured_object() {
        let registry = MetadataRegistry::new();
        let resolver = QueryResolver::new(&registry);
        let mut captured = crate::value::MapValue::default();
        captured.insert("region", Value::from_string("emea"));

        let value = resolver
            .resolve_value(
                &ValueExpression::member(captured, field("region")),
                &QueryContext::new(),
            )
            .unwrap();
        assert_eq!(value.as_str(), Some("emea"));
    }
}
