use crate::expression::ValueExpression;
use crate::value::Value;

/// A concrete "continue after" pagination anchor: the id of the anchor
/// document plus its values for each ordering key, position for position.
///
/// The value list either matches the query's order-by clause count exactly or
/// is empty (a document-id-only cursor); the query builder rejects anything
/// else.
#[derive(Clone, Debug, PartialEq)]
pub struct FirestoreCursor {
    anchor_document_id: String,
    order_by_values: Vec<Value>,
}

impl FirestoreCursor {
    pub fn new(anchor_document_id: impl Into<String>, order_by_values: Vec<Value>) -> Self {
        Self {
            anchor_document_id: anchor_document_id.into(),
            order_by_values,
        }
    }

    pub fn document_only(anchor_document_id: impl Into<String>) -> Self {
        Self::new(anchor_document_id, Vec::new())
    }

    pub fn anchor_document_id(&self) -> &str {
        &self.anchor_document_id
    }

    pub fn order_by_values(&self) -> &[Value] {
        &self.order_by_values
    }
}

/// Cursor position in the query description; order-by values may still be
/// deferred.
#[derive(Clone, Debug, PartialEq)]
pub struct CursorExpression {
    anchor_document_id: String,
    order_by_values: Vec<ValueExpression>,
}

impl CursorExpression {
    pub fn new(
        anchor_document_id: impl Into<String>,
        order_by_values: Vec<ValueExpression>,
    ) -> Self {
        Self {
            anchor_document_id: anchor_document_id.into(),
            order_by_values,
        }
    }

    pub fn anchor_document_id(&self) -> &str {
        &self.anchor_document_id
    }

    pub fn order_by_values(&self) -> &[ValueExpression] {
        &self.order_by_values
    }
}

impl From<FirestoreCursor> for CursorExpression {
    fn from(cursor: FirestoreCursor) -> Self {
        CursorExpression {
            anchor_document_id: cursor.anchor_document_id,
            order_by_values: cursor
                .order_by_values
                .into_iter()
                .map(ValueExpression::Constant)
                .collect(),
        }
    }
}
