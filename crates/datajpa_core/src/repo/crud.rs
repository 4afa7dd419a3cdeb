//! Generic CRUD and specification execution over SQLite.
//!
//! # Responsibility
//! - Implement insert-or-update `save`, lookups, counts and deletes for any
//!   [`Entity`].
//! - Execute specifications as lists, single results, pages and slices.
//! - Run bulk UPDATE/DELETE statements that bypass entity loading.
//!
//! # Invariants
//! - `save` stamps audit fields; bulk statements never do.
//! - Result order is deterministic: requested sort keys, then primary key.
//! - Values loaded before a bulk statement are stale until [`refresh`]ed.
//!
//! [`refresh`]: CrudRepository::refresh

use crate::db::migrations::{latest_version, schema_version};
use crate::db::LockMode;
use crate::model::audit::now_epoch_ms;
use crate::query::predicate::SqlFilter;
use crate::query::{
    Field, FieldUpdate, Page, PageRequest, Query, Slice, Sort, Specification, Value,
};
use crate::repo::entity::{select_list, Entity};
use crate::repo::{RepoError, RepoResult};
use log::{debug, info};
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use std::marker::PhantomData;

/// Basic persistence operations for one entity type.
pub trait CrudRepository<T: Entity> {
    /// Inserts a new entity or updates an existing one and returns the stored
    /// value, including generated id and audit stamps.
    fn save(&self, entity: T) -> RepoResult<T>;
    fn save_all(&self, entities: Vec<T>) -> RepoResult<Vec<T>> {
        entities.into_iter().map(|entity| self.save(entity)).collect()
    }
    fn find_by_id(&self, id: &T::Id) -> RepoResult<Option<T>>;
    fn exists_by_id(&self, id: &T::Id) -> RepoResult<bool>;
    fn find_all(&self) -> RepoResult<Vec<T>>;
    fn find_all_sorted(&self, sort: &Sort<T::Field>) -> RepoResult<Vec<T>>;
    fn count(&self) -> RepoResult<u64>;
    /// Removes the row behind `entity`; transient or already-removed
    /// entities are ignored.
    fn delete(&self, entity: &T) -> RepoResult<()>;
    /// Removes one row, failing with `NotFound` if it does not exist.
    fn delete_by_id(&self, id: &T::Id) -> RepoResult<()>;
    /// Reloads `entity` from storage, discarding in-memory state.
    fn refresh(&self, entity: &mut T) -> RepoResult<()>;
}

/// Dynamic queries driven by [`Specification`] values.
pub trait SpecificationExecutor<T: Entity> {
    fn find_all_matching(&self, spec: &Specification<T::Field>) -> RepoResult<Vec<T>>;
    fn find_list(&self, query: &Query<T::Field>) -> RepoResult<Vec<T>>;
    /// At most one row; more than one is `NonUniqueResult`, whose count covers
    /// only the rows inside the query's offset and limit.
    fn find_optional(&self, query: &Query<T::Field>) -> RepoResult<Option<T>>;
    /// Exactly one row; none is `EmptyResult`, more is `NonUniqueResult`.
    fn find_single(&self, query: &Query<T::Field>) -> RepoResult<T>;
    fn count_matching(&self, spec: &Specification<T::Field>) -> RepoResult<u64>;
    fn find_page(
        &self,
        spec: &Specification<T::Field>,
        request: &PageRequest<T::Field>,
    ) -> RepoResult<Page<T>>;
    fn find_slice(
        &self,
        spec: &Specification<T::Field>,
        request: &PageRequest<T::Field>,
    ) -> RepoResult<Slice<T>>;
    /// Applies `updates` to every matching row in one statement and returns
    /// the number of rows changed.
    fn bulk_update(
        &self,
        spec: &Specification<T::Field>,
        updates: &[FieldUpdate<T::Field>],
    ) -> RepoResult<usize>;
    fn bulk_delete(&self, spec: &Specification<T::Field>) -> RepoResult<usize>;
}

/// SQL text with positional parameters, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BoundSql {
    pub sql: String,
    pub params: Vec<Value>,
}

/// SQLite-backed repository for any mapped entity.
pub struct SqliteRepository<'conn, T: Entity> {
    conn: &'conn Connection,
    _entity: PhantomData<fn() -> T>,
}

impl<'conn, T: Entity> SqliteRepository<'conn, T> {
    /// Builds a repository over a migrated connection or session.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema is not at the latest
    ///   migration version.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self {
            conn,
            _entity: PhantomData,
        })
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    /// Builds `SELECT columns FROM table` with the query's filter, sort and
    /// window. `base_joins` are always emitted, before any filter joins.
    pub(crate) fn build_select(
        &self,
        columns: &str,
        base_joins: &[&'static str],
        query: &Query<T::Field>,
    ) -> BoundSql {
        let mut filter = query.filter.compile();
        for order in query.sort.orders() {
            filter.require_join(order.field.join());
        }

        let mut sql = format!("SELECT {columns} FROM {} {}", T::TABLE, T::ALIAS);
        push_joins(&mut sql, base_joins, &filter);
        sql.push_str(" WHERE ");
        sql.push_str(&filter.clause);

        sql.push_str(" ORDER BY ");
        for order in query.sort.orders() {
            sql.push_str(order.field.column());
            sql.push(' ');
            sql.push_str(order.direction.sql());
            sql.push_str(", ");
        }
        sql.push_str(&format!("{}.{} ASC", T::ALIAS, T::ID_COLUMN));

        let mut params = filter.params;
        match query.limit {
            Some(limit) => {
                sql.push_str(" LIMIT ? OFFSET ?");
                params.push(Value::Integer(to_sql_int(limit)));
                params.push(Value::Integer(to_sql_int(query.offset)));
            }
            None if query.offset > 0 => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                params.push(Value::Integer(to_sql_int(query.offset)));
            }
            None => {}
        }

        BoundSql { sql, params }
    }

    pub(crate) fn query_rows<R>(
        &self,
        bound: &BoundSql,
        mut map: impl FnMut(&Row<'_>) -> RepoResult<R>,
    ) -> RepoResult<Vec<R>> {
        let mut stmt = self.conn.prepare(&bound.sql)?;
        let mut rows = stmt.query(params_from_iter(bound.params.iter()))?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(map(row)?);
        }
        Ok(out)
    }

    /// Runs `query` selecting `columns` and maps each row with `map`.
    ///
    /// Used for projections and fetch joins that read more or fewer columns
    /// than the entity itself.
    pub(crate) fn find_projected<R>(
        &self,
        columns: &str,
        base_joins: &[&'static str],
        query: &Query<T::Field>,
        map: impl FnMut(&Row<'_>) -> RepoResult<R>,
    ) -> RepoResult<Vec<R>> {
        self.acquire_lock(query.lock)?;
        let bound = self.build_select(columns, base_joins, query);
        self.query_rows(&bound, map)
    }

    /// Takes the lock `mode` asks for inside the current session.
    ///
    /// A shared lock needs no extra statement: the following SELECT takes it
    /// and SQLite holds it until the transaction ends.
    pub(crate) fn acquire_lock(&self, mode: LockMode) -> RepoResult<()> {
        if mode == LockMode::None {
            return Ok(());
        }
        if self.conn.is_autocommit() {
            return Err(RepoError::LockRequiresTransaction);
        }
        if mode == LockMode::PessimisticWrite {
            self.conn.execute(
                &format!(
                    "UPDATE {table} SET {id} = {id} WHERE 0;",
                    table = T::TABLE,
                    id = T::ID_COLUMN
                ),
                [],
            )?;
        }
        debug!(
            "event=lock_acquired module=repo entity={} mode={mode:?}",
            T::NAME
        );
        Ok(())
    }

    fn insert(&self, entity: &mut T, now_ms: i64) -> RepoResult<()> {
        entity.audit_mut().mark_created(now_ms);

        let mut columns: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        if !T::GENERATED_ID {
            let id = entity.identity().ok_or_else(|| {
                RepoError::InvalidData(format!("{} requires a client-assigned id", T::NAME))
            })?;
            columns.push(T::ID_COLUMN);
            values.push(T::id_value(&id));
        }
        columns.extend_from_slice(T::DATA_COLUMNS);
        values.extend(entity.data_values());
        columns.push("created_at");
        values.push(audit_value(entity.audit().created_at));
        columns.push("last_modified_at");
        values.push(audit_value(entity.audit().last_modified_at));

        let placeholders = vec!["?"; columns.len()].join(", ");
        self.conn.execute(
            &format!(
                "INSERT INTO {} ({}) VALUES ({placeholders});",
                T::TABLE,
                columns.join(", ")
            ),
            params_from_iter(values),
        )?;

        if T::GENERATED_ID {
            entity.assign_generated_id(self.conn.last_insert_rowid());
        }
        Ok(())
    }

    fn update(&self, entity: &mut T, now_ms: i64) -> RepoResult<()> {
        let id = entity.identity().ok_or_else(|| {
            RepoError::InvalidData(format!("cannot update a {} without id", T::NAME))
        })?;
        entity.audit_mut().mark_modified(now_ms);

        let mut assignments: Vec<String> = T::DATA_COLUMNS
            .iter()
            .map(|column| format!("{column} = ?"))
            .collect();
        assignments.push("last_modified_at = MAX(last_modified_at, ?)".to_string());

        let mut values = entity.data_values();
        values.push(audit_value(entity.audit().last_modified_at));
        values.push(T::id_value(&id));

        let stamps = self
            .conn
            .query_row(
                &format!(
                    "UPDATE {} SET {} WHERE {} = ? RETURNING created_at, last_modified_at;",
                    T::TABLE,
                    assignments.join(", "),
                    T::ID_COLUMN
                ),
                params_from_iter(values),
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        let (created_at, last_modified_at) = stamps.ok_or_else(|| RepoError::NotFound {
            entity: T::NAME,
            id: T::id_to_string(&id),
        })?;
        let audit = entity.audit_mut();
        audit.created_at = Some(created_at);
        audit.last_modified_at = Some(last_modified_at);
        Ok(())
    }
}

impl<T: Entity> CrudRepository<T> for SqliteRepository<'_, T> {
    fn save(&self, mut entity: T) -> RepoResult<T> {
        entity.validate()?;

        let now_ms = now_epoch_ms();
        let op = if entity.is_new() {
            self.insert(&mut entity, now_ms)?;
            "insert"
        } else {
            self.update(&mut entity, now_ms)?;
            "update"
        };

        debug!(
            "event=repo_save module=repo entity={} op={op} status=ok",
            T::NAME
        );
        Ok(entity)
    }

    fn find_by_id(&self, id: &T::Id) -> RepoResult<Option<T>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} {} WHERE {}.{} = ?1;",
            select_list::<T>(),
            T::TABLE,
            T::ALIAS,
            T::ALIAS,
            T::ID_COLUMN
        ))?;
        let mut rows = stmt.query([T::id_value(id)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(T::from_row(row)?));
        }
        Ok(None)
    }

    fn exists_by_id(&self, id: &T::Id) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE {} = ?1);",
                T::TABLE,
                T::ID_COLUMN
            ),
            [T::id_value(id)],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn find_all(&self) -> RepoResult<Vec<T>> {
        self.find_list(&Query::new(Specification::all()))
    }

    fn find_all_sorted(&self, sort: &Sort<T::Field>) -> RepoResult<Vec<T>> {
        self.find_list(&Query::new(Specification::all()).sorted(sort.clone()))
    }

    fn count(&self) -> RepoResult<u64> {
        self.count_matching(&Specification::all())
    }

    fn delete(&self, entity: &T) -> RepoResult<()> {
        if entity.is_new() {
            return Ok(());
        }
        if let Some(id) = entity.identity() {
            let removed = delete_row::<T>(self.conn, &id)?;
            debug!(
                "event=repo_delete module=repo entity={} rows={removed}",
                T::NAME
            );
        }
        Ok(())
    }

    fn delete_by_id(&self, id: &T::Id) -> RepoResult<()> {
        if delete_row::<T>(self.conn, id)? == 0 {
            return Err(RepoError::NotFound {
                entity: T::NAME,
                id: T::id_to_string(id),
            });
        }
        Ok(())
    }

    fn refresh(&self, entity: &mut T) -> RepoResult<()> {
        let id = entity.identity().ok_or_else(|| {
            RepoError::InvalidData(format!("cannot refresh a transient {}", T::NAME))
        })?;
        *entity = self
            .find_by_id(&id)?
            .ok_or_else(|| RepoError::NotFound {
                entity: T::NAME,
                id: T::id_to_string(&id),
            })?;
        Ok(())
    }
}

impl<T: Entity> SpecificationExecutor<T> for SqliteRepository<'_, T> {
    fn find_all_matching(&self, spec: &Specification<T::Field>) -> RepoResult<Vec<T>> {
        self.find_list(&Query::new(spec.clone()))
    }

    fn find_list(&self, query: &Query<T::Field>) -> RepoResult<Vec<T>> {
        self.find_projected(&select_list::<T>(), &[], query, T::from_row)
    }

    fn find_optional(&self, query: &Query<T::Field>) -> RepoResult<Option<T>> {
        let window = query.limit.map_or(2, |limit| limit.min(2));
        let mut rows = self.find_list(&query.clone().limit(window))?;
        if rows.len() > 1 {
            let mut count = self.count_matching(&query.filter)?.saturating_sub(query.offset);
            if let Some(limit) = query.limit {
                count = count.min(limit);
            }
            return Err(RepoError::NonUniqueResult {
                entity: T::NAME,
                count: count.max(rows.len() as u64),
            });
        }
        Ok(rows.pop())
    }

    fn find_single(&self, query: &Query<T::Field>) -> RepoResult<T> {
        self.find_optional(query)?
            .ok_or(RepoError::EmptyResult(T::NAME))
    }

    fn count_matching(&self, spec: &Specification<T::Field>) -> RepoResult<u64> {
        let filter = spec.compile();
        let mut sql = format!("SELECT COUNT(*) FROM {} {}", T::TABLE, T::ALIAS);
        push_joins(&mut sql, &[], &filter);
        sql.push_str(" WHERE ");
        sql.push_str(&filter.clause);

        let count: i64 =
            self.conn
                .query_row(&sql, params_from_iter(filter.params.iter()), |row| row.get(0))?;
        u64::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative row count {count}")))
    }

    fn find_page(
        &self,
        spec: &Specification<T::Field>,
        request: &PageRequest<T::Field>,
    ) -> RepoResult<Page<T>> {
        request.validate()?;
        let total = self.count_matching(spec)?;
        let content = if request.offset() >= total {
            Vec::new()
        } else {
            self.find_list(&page_query(spec, request, u64::from(request.size)))?
        };
        Ok(Page::new(content, request.page, request.size, total))
    }

    fn find_slice(
        &self,
        spec: &Specification<T::Field>,
        request: &PageRequest<T::Field>,
    ) -> RepoResult<Slice<T>> {
        request.validate()?;
        let probe = self.find_list(&page_query(spec, request, u64::from(request.size) + 1))?;
        Ok(Slice::from_probe(probe, request.page, request.size))
    }

    fn bulk_update(
        &self,
        spec: &Specification<T::Field>,
        updates: &[FieldUpdate<T::Field>],
    ) -> RepoResult<usize> {
        if updates.is_empty() {
            return Err(RepoError::InvalidQuery(
                "bulk update needs at least one assignment".to_string(),
            ));
        }
        if let Some(update) = updates.iter().find(|update| !update.field().is_writable()) {
            return Err(RepoError::InvalidQuery(format!(
                "field `{}` of {} cannot be bulk updated",
                update.field().name(),
                T::NAME
            )));
        }
        for update in updates {
            match update {
                FieldUpdate::Set(field, value) => T::validate_assignment(*field, value)?,
                FieldUpdate::Add(field, _) if !field.is_numeric() => {
                    return Err(RepoError::InvalidQuery(format!(
                        "field `{}` of {} is not numeric",
                        field.name(),
                        T::NAME
                    )));
                }
                FieldUpdate::Add(..) => {}
            }
        }

        let mut assignments = Vec::with_capacity(updates.len());
        let mut params = Vec::with_capacity(updates.len());
        for update in updates {
            let (assignment, value) = update.assignment();
            assignments.push(assignment);
            params.push(value);
        }

        let target = matching_ids::<T>(spec);
        params.extend(target.params);
        let sql = format!(
            "UPDATE {} SET {} WHERE {} IN ({});",
            T::TABLE,
            assignments.join(", "),
            T::ID_COLUMN,
            target.sql
        );

        let changed = self.conn.execute(&sql, params_from_iter(params))?;
        info!(
            "event=bulk_update module=repo entity={} rows={changed} status=ok",
            T::NAME
        );
        Ok(changed)
    }

    fn bulk_delete(&self, spec: &Specification<T::Field>) -> RepoResult<usize> {
        let target = matching_ids::<T>(spec);
        let sql = format!(
            "DELETE FROM {} WHERE {} IN ({});",
            T::TABLE,
            T::ID_COLUMN,
            target.sql
        );

        let changed = self
            .conn
            .execute(&sql, params_from_iter(target.params))?;
        info!(
            "event=bulk_delete module=repo entity={} rows={changed} status=ok",
            T::NAME
        );
        Ok(changed)
    }
}

fn page_query<F: Field>(
    spec: &Specification<F>,
    request: &PageRequest<F>,
    limit: u64,
) -> Query<F> {
    Query::new(spec.clone())
        .sorted(request.sort.clone())
        .limit(limit)
        .offset(request.offset())
}

/// `SELECT alias.id FROM ...` sub-select for bulk statements, so relation
/// joins in the filter work without UPDATE ... FROM.
fn matching_ids<T: Entity>(spec: &Specification<T::Field>) -> BoundSql {
    let filter = spec.compile();
    let mut sql = format!(
        "SELECT {alias}.{id} FROM {table} {alias}",
        alias = T::ALIAS,
        id = T::ID_COLUMN,
        table = T::TABLE
    );
    push_joins(&mut sql, &[], &filter);
    sql.push_str(" WHERE ");
    sql.push_str(&filter.clause);
    BoundSql {
        sql,
        params: filter.params,
    }
}

fn push_joins(sql: &mut String, base_joins: &[&'static str], filter: &SqlFilter) {
    let mut emitted: Vec<&str> = Vec::new();
    for &join in base_joins.iter().chain(filter.joins.iter()) {
        if !emitted.contains(&join) {
            sql.push(' ');
            sql.push_str(join);
            emitted.push(join);
        }
    }
}

fn delete_row<T: Entity>(conn: &Connection, id: &T::Id) -> RepoResult<usize> {
    let removed = conn.execute(
        &format!("DELETE FROM {} WHERE {} = ?1;", T::TABLE, T::ID_COLUMN),
        [T::id_value(id)],
    )?;
    Ok(removed)
}

fn audit_value(stamp: Option<i64>) -> Value {
    stamp.map_or(Value::Null, Value::Integer)
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Rejects connections whose schema is not fully migrated.
pub(crate) fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let actual_version = schema_version(conn)?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}
