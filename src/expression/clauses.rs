use crate::expression::ValueExpression;
use crate::model::FieldPath;

/// Filter operators understood by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    ArrayContains,
    ArrayContainsAny,
    In,
    NotIn,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Equal => "EQUAL",
            FilterOperator::NotEqual => "NOT_EQUAL",
            FilterOperator::LessThan => "LESS_THAN",
            FilterOperator::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
            FilterOperator::GreaterThan => "GREATER_THAN",
            FilterOperator::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
            FilterOperator::ArrayContains => "ARRAY_CONTAINS",
            FilterOperator::ArrayContainsAny => "ARRAY_CONTAINS_ANY",
            FilterOperator::In => "IN",
            FilterOperator::NotIn => "NOT_IN",
        }
    }
}

/// One filter over a document field.
#[derive(Clone, Debug, PartialEq)]
pub struct WhereClause {
    property: FieldPath,
    operator: FilterOperator,
    value: ValueExpression,
}

impl WhereClause {
    pub fn new(
        property: FieldPath,
        operator: FilterOperator,
        value: impl Into<ValueExpression>,
    ) -> Self {
        Self {
            property,
            operator,
            value: value.into(),
        }
    }

    pub fn property(&self) -> &FieldPath {
        &self.property
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn value(&self) -> &ValueExpression {
        &self.value
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrderDirection {
    #[default]
    Ascending,
    Descending,
}

impl OrderDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderDirection::Ascending => "ASCENDING",
            OrderDirection::Descending => "DESCENDING",
        }
    }

    pub fn reversed(&self) -> Self {
        match self {
            OrderDirection::Ascending => OrderDirection::Descending,
            OrderDirection::Descending => OrderDirection::Ascending,
        }
    }
}

/// One ordering key of the query.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderByClause {
    property: FieldPath,
    direction: OrderDirection,
}

impl OrderByClause {
    pub fn new(property: FieldPath, direction: OrderDirection) -> Self {
        Self {
            property,
            direction,
        }
    }

    pub fn ascending(property: FieldPath) -> Self {
        Self::new(property, OrderDirection::Ascending)
    }

    pub fn descending(property: FieldPath) -> Self {
        Self::new(property, OrderDirection::Descending)
    }

    pub fn property(&self) -> &FieldPath {
        &self.property
    }

    pub fn direction(&self) -> OrderDirection {
        self.direction
    }
}
