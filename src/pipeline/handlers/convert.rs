use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::client::DocumentSnapshot;
use crate::convert::{RelatedEntities, TypeConverter};
use crate::error::{empty_sequence, failed_precondition, internal_error, OdmResult};
use crate::metadata::MetadataProvider;
use crate::model::{strip_qualified_prefix, FieldPath, ResourcePath};
use crate::pipeline::{
    EntityRecord, ExecutionArtifacts, Next, PipelineContext, PipelineItem, PipelineResult,
    QueryHandler, QueryKind,
};
use crate::resolver::{
    ResolvedAggregation, ResolvedInclude, ResolvedProjection, ResolvedQuery,
    ResolvedSubcollectionProjection,
};
use crate::value::{value_order, MapValue, Value};

/// Turns raw execution output into typed results: scalars are
/// type-converted, entity snapshots are materialized (reassembling the
/// object graph bottom-up when includes were loaded), and projections are
/// reshaped into rows.
pub struct ConvertHandler {
    metadata: Arc<dyn MetadataProvider>,
    converter: Arc<dyn TypeConverter>,
}

impl ConvertHandler {
    pub fn new(metadata: Arc<dyn MetadataProvider>, converter: Arc<dyn TypeConverter>) -> Self {
        Self {
            metadata,
            converter,
        }
    }

    /// Applies the empty-sequence policy, then coerces to the declared
    /// result shape: a null aggregate over a nullable target stays null, a
    /// null over a non-nullable target is an error. Applied uniformly to
    /// average, min and max.
    fn finish_aggregation_value(
        &self,
        aggregation: &ResolvedAggregation,
        value: Value,
    ) -> OdmResult<Value> {
        if value.is_null() {
            if aggregation.result().nullable {
                return Ok(Value::null());
            }
            return Err(empty_sequence(format!(
                "{:?} over an empty sequence cannot produce a non-nullable result",
                aggregation.kind()
            )));
        }
        self.converter.convert(value, &aggregation.result())
    }

    fn assemble_records(
        &self,
        resolved: &ResolvedQuery,
        items: Vec<PipelineItem>,
        artifacts: &ExecutionArtifacts,
    ) -> OdmResult<Vec<PipelineItem>> {
        let root_materializer = self.metadata.materializer(resolved.entity()).ok_or_else(|| {
            failed_precondition(format!(
                "No metadata registered for entity '{}'",
                resolved.entity()
            ))
        })?;
        let related = if resolved.includes().is_empty() {
            RelatedEntities::new()
        } else {
            self.build_related(resolved, artifacts)?
        };

        items
            .into_iter()
            .map(|item| match item {
                PipelineItem::Snapshot(snapshot) => {
                    let instance = root_materializer(&snapshot, &related)?;
                    Ok(PipelineItem::Record(EntityRecord::new(
                        snapshot.key().clone(),
                        resolved.entity(),
                        instance,
                    )))
                }
                other => Ok(other),
            })
            .collect()
    }

    /// Bottom-up graph assembly over the flat snapshot map.
    ///
    /// Depth is computed from the database-relative path (the qualified
    /// `projects/.../documents` prefix is noise). Non-root documents are
    /// materialized strictly deepest-first, so by the time any document is
    /// deserialized, every entity it could reference already exists in the
    /// related map. Each document's target type comes from matching its
    /// collection id against the resolved include tree.
    fn build_related(
        &self,
        resolved: &ResolvedQuery,
        artifacts: &ExecutionArtifacts,
    ) -> OdmResult<RelatedEntities> {
        let mut related_docs: Vec<(usize, String, &DocumentSnapshot)> = Vec::new();
        for (path, snapshot) in artifacts.snapshots() {
            let relative = strip_qualified_prefix(&ResourcePath::from_string(path)?);
            let depth = relative.len() / 2;
            let is_root = depth == 1 && relative.first_segment() == Some(resolved.collection());
            if is_root {
                continue;
            }
            related_docs.push((depth, relative.canonical_string(), snapshot));
        }
        related_docs.sort_by(|left, right| {
            right.0.cmp(&left.0).then_with(|| left.1.cmp(&right.1))
        });

        let mut related = RelatedEntities::new();
        for (_, path, snapshot) in related_docs {
            let collection_id = snapshot.key().collection_id();
            let Some(include) = find_include(resolved.includes(), collection_id) else {
                continue;
            };
            let materializer = self
                .metadata
                .materializer(include.target_entity())
                .ok_or_else(|| {
                    failed_precondition(format!(
                        "No metadata registered for entity '{}'",
                        include.target_entity()
                    ))
                })?;
            let instance = materializer(snapshot, &related)?;
            related.insert(path, instance);
        }
        Ok(related)
    }

    fn project_rows(
        &self,
        resolved: &ResolvedQuery,
        items: Vec<PipelineItem>,
        artifacts: &ExecutionArtifacts,
    ) -> OdmResult<Vec<PipelineItem>> {
        let projection = resolved
            .projection()
            .ok_or_else(|| internal_error("Projection queries carry a resolved projection"))?;
        items
            .into_iter()
            .map(|item| match item {
                PipelineItem::Snapshot(snapshot) => {
                    let row = self.project_document(&snapshot, projection, artifacts)?;
                    Ok(PipelineItem::Row(row))
                }
                other => Ok(other),
            })
            .collect()
    }

    fn project_document(
        &self,
        snapshot: &DocumentSnapshot,
        projection: &ResolvedProjection,
        artifacts: &ExecutionArtifacts,
    ) -> OdmResult<MapValue> {
        let mut row = select_fields(snapshot, projection.fields());
        for sub in projection.subcollections() {
            self.project_subcollection(snapshot, sub, artifacts, &mut row)?;
        }
        Ok(row)
    }

    fn project_subcollection(
        &self,
        parent: &DocumentSnapshot,
        sub: &ResolvedSubcollectionProjection,
        artifacts: &ExecutionArtifacts,
        row: &mut MapValue,
    ) -> OdmResult<()> {
        if let Some(aggregation) = sub.aggregation() {
            let key = format!(
                "{}:{}",
                parent.path().canonical_string(),
                sub.result_name()
            );
            let value = artifacts
                .aggregation(&key)
                .cloned()
                .unwrap_or_else(Value::null);
            row.insert(
                sub.result_name(),
                self.finish_aggregation_value(aggregation, value)?,
            );
            return Ok(());
        }

        let mut children = artifacts.children_of(parent.path(), sub.collection_id());
        sort_by_order_by(&mut children, sub.order_by());

        let rows = children
            .into_iter()
            .map(|child| {
                let mut child_row = select_fields(child, sub.fields());
                for nested in sub.nested() {
                    self.project_subcollection(child, nested, artifacts, &mut child_row)?;
                }
                Ok(Value::from_map(child_row.fields().clone()))
            })
            .collect::<OdmResult<Vec<_>>>()?;
        row.insert(sub.result_name(), Value::from_array(rows));
        Ok(())
    }
}

fn find_include<'a>(
    includes: &'a [ResolvedInclude],
    collection_id: &str,
) -> Option<&'a ResolvedInclude> {
    for include in includes {
        if include.target_collection() == collection_id {
            return Some(include);
        }
        if let Some(found) = find_include(include.nested(), collection_id) {
            return Some(found);
        }
    }
    None
}

fn select_fields(snapshot: &DocumentSnapshot, fields: &[FieldPath]) -> MapValue {
    if fields.is_empty() {
        return snapshot.data().clone();
    }
    let mut out = MapValue::default();
    for field in fields {
        if let Some(value) = snapshot.field(field) {
            out.insert(field.canonical_string(), value);
        }
    }
    out
}

fn sort_by_order_by(
    children: &mut [&DocumentSnapshot],
    order_by: &[crate::expression::OrderByClause],
) {
    if order_by.is_empty() {
        return;
    }
    children.sort_by(|left, right| {
        for order in order_by {
            let lv = left.field(order.property()).unwrap_or_else(Value::null);
            let rv = right.field(order.property()).unwrap_or_else(Value::null);
            let mut ordering = value_order(&lv, &rv);
            if order.direction() == crate::expression::OrderDirection::Descending {
                ordering = ordering.reverse();
            }
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        ResourcePath::comparator(left.path(), right.path())
    });
}

#[async_trait]
impl QueryHandler for ConvertHandler {
    fn name(&self) -> &'static str {
        "convert"
    }

    async fn handle(
        &self,
        context: PipelineContext,
        next: Next<'_>,
        cancel: &CancellationToken,
    ) -> OdmResult<PipelineResult> {
        let kind = context.kind();
        let resolved = context.resolved_query()?;
        let result = next.run(context, cancel).await?;

        match (kind, result) {
            (_, PipelineResult::Empty) => Ok(PipelineResult::Empty),

            (QueryKind::Predicate, PipelineResult::Scalar(value)) => {
                let matched = value.as_integer().unwrap_or(0) > 0;
                Ok(PipelineResult::Scalar(Value::from_bool(matched)))
            }

            (QueryKind::Aggregation, PipelineResult::Scalar(value)) => {
                let aggregation = resolved
                    .aggregation()
                    .ok_or_else(|| internal_error("Aggregation queries carry an aggregation"))?;
                Ok(PipelineResult::Scalar(
                    self.finish_aggregation_value(aggregation, value)?,
                ))
            }

            // Min/max: the ordered limit-1 query produced zero or one raw
            // documents; extract and convert the aggregated field here.
            (QueryKind::Aggregation, PipelineResult::Materialized { items, .. }) => {
                let aggregation = resolved
                    .aggregation()
                    .ok_or_else(|| internal_error("Aggregation queries carry an aggregation"))?;
                let property = aggregation
                    .property()
                    .ok_or_else(|| internal_error("Min/max aggregations carry a property"))?;
                let value = items
                    .iter()
                    .find_map(|item| match item {
                        PipelineItem::Snapshot(snapshot) => {
                            Some(snapshot.field(property).unwrap_or_else(Value::null))
                        }
                        _ => None,
                    })
                    .unwrap_or_else(Value::null);
                Ok(PipelineResult::Scalar(
                    self.finish_aggregation_value(aggregation, value)?,
                ))
            }

            (QueryKind::Entity, PipelineResult::Materialized { items, context }) => {
                let items = self.assemble_records(&resolved, items, context.artifacts())?;
                Ok(PipelineResult::Materialized { items, context })
            }

            (QueryKind::Entity, PipelineResult::Streaming { stream, context }) => {
                let materializer =
                    self.metadata.materializer(resolved.entity()).ok_or_else(|| {
                        failed_precondition(format!(
                            "No metadata registered for entity '{}'",
                            resolved.entity()
                        ))
                    })?;
                let entity = resolved.entity();
                let stream = stream
                    .map(move |item| {
                        item.and_then(|item| match item {
                            PipelineItem::Snapshot(snapshot) => {
                                let instance = materializer(&snapshot, &RelatedEntities::new())?;
                                Ok(PipelineItem::Record(EntityRecord::new(
                                    snapshot.key().clone(),
                                    entity,
                                    instance,
                                )))
                            }
                            other => Ok(other),
                        })
                    })
                    .boxed();
                Ok(PipelineResult::Streaming { stream, context })
            }

            (QueryKind::Projection, PipelineResult::Materialized { items, context }) => {
                let items = self.project_rows(&resolved, items, context.artifacts())?;
                Ok(PipelineResult::Materialized { items, context })
            }

            (kind, _) => Err(internal_error(format!(
                "Execution produced an unexpected result shape for a {kind:?} query"
            ))),
        }
    }
}
