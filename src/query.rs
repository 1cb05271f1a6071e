//! Query builder and record reconciliation.
//!
//! [`SelectBuilder`] accumulates selection, filter, ordering and paging intent
//! and builds an immutable [`SelectAst`]. [`QueryBuilder`] adds an executor:
//! it runs the descriptor, maps each raw provider record back onto the
//! model's logical keys and validates it against the model schema.
//!
//! ```ignore
//! let rows = orm
//!     .from(&opportunity)?
//!     .select_fields(["id", "name"])
//!     .filter(Filter::new().field("amount", FieldOps::new().gte(25000)))
//!     .order_by([OrderBy::desc("createdDate")])
//!     .limit(100)
//!     .get_many(None)
//!     .await?;
//! ```

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value as Json;

use crate::ast::{OrderBy, SelectAst, Selection};
use crate::error::{QueryError, QueryResult};
use crate::executor::QueryExecutor;
use crate::filter::Filter;
use crate::model::ModelDef;
use crate::normalizer::{UnknownFieldPolicy, normalize_with};
use crate::schema::Record;

pub use crate::ast::{PaginationConfig, PaginationStrategy};
pub use crate::executor::QueryContext;

/// Relationship alias marker some providers drop in nested record keys.
const RELATIONSHIP_SUFFIX: &str = "__r";

/// Accumulates query intent for one model. Each setter replaces the
/// previous value.
#[derive(Debug, Clone)]
pub struct SelectBuilder {
    model: Arc<ModelDef>,
    selection: Option<Selection>,
    filter: Option<Filter>,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
    pagination: Option<PaginationConfig>,
    policy: UnknownFieldPolicy,
}

impl SelectBuilder {
    pub fn new(model: Arc<ModelDef>) -> Self {
        Self {
            model,
            selection: None,
            filter: None,
            order_by: Vec::new(),
            limit: None,
            offset: None,
            pagination: None,
            policy: UnknownFieldPolicy::default(),
        }
    }

    pub fn model(&self) -> &Arc<ModelDef> {
        &self.model
    }

    pub fn select(mut self, selection: Selection) -> Self {
        self.selection = Some(selection);
        self
    }

    /// Select exactly these keys.
    pub fn select_fields<I, S>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select(Selection::fields(keys))
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn order_by(mut self, order: impl IntoIterator<Item = OrderBy>) -> Self {
        self.order_by = order.into_iter().collect();
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    pub fn paginate(mut self, config: PaginationConfig) -> Self {
        self.pagination = Some(config);
        self
    }

    /// How undeclared keys in the filter, selection and ordering are handled.
    pub fn unknown_fields(mut self, policy: UnknownFieldPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Normalize the filter and freeze everything into a descriptor.
    ///
    /// Chunk directives found while normalizing are dropped here; the
    /// descriptor always carries the full membership lists.
    pub fn build(&self) -> QueryResult<SelectAst> {
        if self.policy == UnknownFieldPolicy::Reject {
            self.check_keys()?;
        }

        let normalized = normalize_with(&self.model, self.filter.as_ref(), self.policy)?;

        Ok(SelectAst {
            model: Arc::clone(&self.model),
            selection: self.selection.clone(),
            filter: normalized.ast,
            order_by: self.order_by.clone(),
            limit: self.limit,
            offset: self.offset,
            pagination: self.pagination.clone(),
        })
    }

    fn check_keys(&self) -> QueryResult<()> {
        let selected = self.selection.iter().flat_map(|s| s.keys());
        let ordered = self.order_by.iter().map(|o| o.field.as_str());
        match selected.chain(ordered).find(|k| self.model.field(k).is_none()) {
            Some(key) => Err(QueryError::unknown_field(&self.model.name, key)),
            None => Ok(()),
        }
    }

    /// Logical keys the results will carry.
    fn result_keys(&self) -> Vec<String> {
        match &self.selection {
            Some(sel) => sel.included_keys().map(str::to_string).collect(),
            None => self.model.field_keys().map(str::to_string).collect(),
        }
    }
}

/// A [`SelectBuilder`] bound to the executor for its model's provider.
#[derive(Clone)]
pub struct QueryBuilder {
    select: SelectBuilder,
    executor: Arc<dyn QueryExecutor>,
}

impl QueryBuilder {
    pub fn new(model: Arc<ModelDef>, executor: Arc<dyn QueryExecutor>) -> Self {
        Self { select: SelectBuilder::new(model), executor }
    }

    fn map(mut self, f: impl FnOnce(SelectBuilder) -> SelectBuilder) -> Self {
        self.select = f(self.select);
        self
    }

    pub fn select(self, selection: Selection) -> Self {
        self.map(|b| b.select(selection))
    }

    pub fn select_fields<I, S>(self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.map(|b| b.select_fields(keys))
    }

    pub fn filter(self, filter: Filter) -> Self {
        self.map(|b| b.filter(filter))
    }

    pub fn order_by(self, order: impl IntoIterator<Item = OrderBy>) -> Self {
        self.map(|b| b.order_by(order))
    }

    pub fn limit(self, n: u64) -> Self {
        self.map(|b| b.limit(n))
    }

    pub fn offset(self, n: u64) -> Self {
        self.map(|b| b.offset(n))
    }

    pub fn paginate(self, config: PaginationConfig) -> Self {
        self.map(|b| b.paginate(config))
    }

    pub fn unknown_fields(self, policy: UnknownFieldPolicy) -> Self {
        self.map(|b| b.unknown_fields(policy))
    }

    pub fn build(&self) -> QueryResult<SelectAst> {
        self.select.build()
    }

    /// Execute and return every validated record, in provider order.
    pub async fn get_many(self, ctx: Option<&QueryContext>) -> QueryResult<Vec<Record>> {
        let ast = self.select.build()?;
        let rows = self.executor.execute_select(&ast, ctx).await?;

        let model = self.select.model();
        let keys = self.select.result_keys();
        let schema = model.schema.project(keys.iter().map(String::as_str));

        tracing::debug!(model = %model.name, rows = rows.len(), "reconciling records");

        rows.iter()
            .enumerate()
            .map(|(idx, row)| {
                let mapped = map_record(model, &keys, row);
                schema.validate(mapped, idx).map_err(QueryError::from)
            })
            .collect()
    }

    /// First record with the limit forced to 1.
    pub async fn get_one(self, ctx: Option<&QueryContext>) -> QueryResult<Option<Record>> {
        let rows = self.limit(1).get_many(ctx).await?;
        Ok(rows.into_iter().next())
    }

    pub async fn get_many_as<T: DeserializeOwned>(
        self,
        ctx: Option<&QueryContext>,
    ) -> QueryResult<Vec<T>> {
        self.get_many(ctx)
            .await?
            .into_iter()
            .map(|r| serde_json::from_value(Json::Object(r)).map_err(QueryError::from))
            .collect()
    }

    pub async fn get_one_as<T: DeserializeOwned>(
        self,
        ctx: Option<&QueryContext>,
    ) -> QueryResult<Option<T>> {
        match self.get_one(ctx).await? {
            Some(r) => Ok(Some(serde_json::from_value(Json::Object(r))?)),
            None => Ok(None),
        }
    }
}

impl std::fmt::Debug for QueryBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryBuilder").field("select", &self.select).finish()
    }
}

/// Entry point for one model; every method starts a fresh builder.
#[derive(Clone)]
pub struct QueryApi {
    model: Arc<ModelDef>,
    executor: Arc<dyn QueryExecutor>,
}

impl QueryApi {
    pub fn new(model: Arc<ModelDef>, executor: Arc<dyn QueryExecutor>) -> Self {
        Self { model, executor }
    }

    pub fn model(&self) -> &Arc<ModelDef> {
        &self.model
    }

    pub fn builder(&self) -> QueryBuilder {
        QueryBuilder::new(Arc::clone(&self.model), Arc::clone(&self.executor))
    }

    pub fn select(&self, selection: Selection) -> QueryBuilder {
        self.builder().select(selection)
    }

    pub fn select_fields<I, S>(&self, keys: I) -> QueryBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.builder().select_fields(keys)
    }

    pub fn filter(&self, filter: Filter) -> QueryBuilder {
        self.builder().filter(filter)
    }

    pub fn order_by(&self, order: impl IntoIterator<Item = OrderBy>) -> QueryBuilder {
        self.builder().order_by(order)
    }

    pub fn limit(&self, n: u64) -> QueryBuilder {
        self.builder().limit(n)
    }

    pub fn offset(&self, n: u64) -> QueryBuilder {
        self.builder().offset(n)
    }

    pub fn paginate(&self, config: PaginationConfig) -> QueryBuilder {
        self.builder().paginate(config)
    }

    /// Every mapped field, no filter.
    pub async fn get_many(&self, ctx: Option<&QueryContext>) -> QueryResult<Vec<Record>> {
        self.builder().get_many(ctx).await
    }

    pub async fn get_one(&self, ctx: Option<&QueryContext>) -> QueryResult<Option<Record>> {
        self.builder().get_one(ctx).await
    }
}

/// Project a raw provider row onto logical keys.
///
/// Keys the model does not declare and paths that do not resolve are left
/// out of the result. Rows that are not objects map to an empty record.
pub fn map_record(model: &ModelDef, keys: &[String], row: &Json) -> Record {
    let mut out = Record::new();
    for key in keys {
        let Some(path) = model.path_for(key) else {
            continue;
        };
        if let Some(value) = get_by_path(row, path) {
            out.insert(key.clone(), value.clone());
        }
    }
    out
}

/// Walk a dotted path through nested objects.
///
/// A segment missing from its object is retried with a trailing `__r`
/// stripped. A null or non-object intermediate yields `None`.
pub fn get_by_path<'a>(row: &'a Json, path: &str) -> Option<&'a Json> {
    let mut cur = row;
    for segment in path.split('.') {
        let obj = cur.as_object()?;
        cur = match obj.get(segment) {
            Some(v) => v,
            None => obj.get(segment.strip_suffix(RELATIONSHIP_SUFFIX)?)?,
        };
    }
    Some(cur)
}
