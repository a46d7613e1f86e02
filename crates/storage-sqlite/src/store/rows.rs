//! Kind-dispatched row access on a single connection.

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use rangeops_core::changes::{ChangeOperation, PendingChange};
use rangeops_core::entities::{Entity, EntityKey, EntityKind, Owner};
use rangeops_core::errors::DatabaseError;
use rangeops_core::Result;
use uuid::Uuid;

use crate::errors::{IntoCore, StorageError};
use crate::scenarios::{
    ScenarioDB, ScenarioMembershipDB, ScenarioTemplateDB, ScenarioTemplateMembershipDB,
};
use crate::schema::{
    results, scenario_memberships, scenario_template_memberships, scenario_templates, scenarios,
    tasks,
};
use crate::tasks::{ResultDB, TaskDB};

/// Decodes loaded rows into entities of one variant.
fn decode<R, M>(rows: Vec<R>, wrap: fn(M) -> Entity) -> Result<Vec<Entity>>
where
    M: TryFrom<R, Error = StorageError>,
{
    rows.into_iter()
        .map(|row| Ok(wrap(M::try_from(row)?)))
        .collect()
}

fn decode_one<R, M>(row: Option<R>, wrap: fn(M) -> Entity) -> Result<Option<Entity>>
where
    M: TryFrom<R, Error = StorageError>,
{
    Ok(row.map(M::try_from).transpose()?.map(wrap))
}

pub(crate) fn find_row(conn: &mut SqliteConnection, key: EntityKey) -> Result<Option<Entity>> {
    let id = key.id.to_string();
    match key.kind {
        EntityKind::ScenarioTemplate => {
            let row = scenario_templates::table
                .find(&id)
                .select(ScenarioTemplateDB::as_select())
                .first(conn)
                .optional()
                .into_core()?;
            decode_one(row, Entity::ScenarioTemplate)
        }
        EntityKind::Scenario => {
            let row = scenarios::table
                .find(&id)
                .select(ScenarioDB::as_select())
                .first(conn)
                .optional()
                .into_core()?;
            decode_one(row, Entity::Scenario)
        }
        EntityKind::Task => {
            let row = tasks::table
                .find(&id)
                .select(TaskDB::as_select())
                .first(conn)
                .optional()
                .into_core()?;
            decode_one(row, Entity::Task)
        }
        EntityKind::Result => {
            let row = results::table
                .find(&id)
                .select(ResultDB::as_select())
                .first(conn)
                .optional()
                .into_core()?;
            decode_one(row, Entity::Result)
        }
        EntityKind::ScenarioMembership => {
            let row = scenario_memberships::table
                .find(&id)
                .select(ScenarioMembershipDB::as_select())
                .first(conn)
                .optional()
                .into_core()?;
            decode_one(row, Entity::ScenarioMembership)
        }
        EntityKind::ScenarioTemplateMembership => {
            let row = scenario_template_memberships::table
                .find(&id)
                .select(ScenarioTemplateMembershipDB::as_select())
                .first(conn)
                .optional()
                .into_core()?;
            decode_one(row, Entity::ScenarioTemplateMembership)
        }
    }
}

pub(crate) fn list_owned_rows(
    conn: &mut SqliteConnection,
    kind: EntityKind,
    owner: Owner,
) -> Result<Vec<Entity>> {
    let owner_id = |id: Uuid| id.to_string();
    match (kind, owner) {
        (EntityKind::Task, Owner::Scenario(id)) => {
            let rows = tasks::table
                .filter(tasks::scenario_id.eq(owner_id(id)))
                .order((tasks::date_created.asc(), tasks::id.asc()))
                .select(TaskDB::as_select())
                .load(conn)
                .into_core()?;
            decode(rows, Entity::Task)
        }
        (EntityKind::Task, Owner::ScenarioTemplate(id)) => {
            let rows = tasks::table
                .filter(tasks::scenario_template_id.eq(owner_id(id)))
                .order((tasks::date_created.asc(), tasks::id.asc()))
                .select(TaskDB::as_select())
                .load(conn)
                .into_core()?;
            decode(rows, Entity::Task)
        }
        (EntityKind::Result, Owner::Task(id)) => {
            let rows = results::table
                .filter(results::task_id.eq(owner_id(id)))
                .order((results::status_date.asc(), results::id.asc()))
                .select(ResultDB::as_select())
                .load(conn)
                .into_core()?;
            decode(rows, Entity::Result)
        }
        (EntityKind::Result, Owner::Scenario(id)) => {
            let rows = results::table
                .filter(results::scenario_id.eq(owner_id(id)))
                .order((results::status_date.asc(), results::id.asc()))
                .select(ResultDB::as_select())
                .load(conn)
                .into_core()?;
            decode(rows, Entity::Result)
        }
        (EntityKind::Scenario, Owner::ScenarioTemplate(id)) => {
            let rows = scenarios::table
                .filter(scenarios::scenario_template_id.eq(owner_id(id)))
                .order((scenarios::date_created.asc(), scenarios::id.asc()))
                .select(ScenarioDB::as_select())
                .load(conn)
                .into_core()?;
            decode(rows, Entity::Scenario)
        }
        (EntityKind::ScenarioMembership, Owner::Scenario(id)) => {
            let rows = scenario_memberships::table
                .filter(scenario_memberships::scenario_id.eq(owner_id(id)))
                .order(scenario_memberships::date_created.asc())
                .select(ScenarioMembershipDB::as_select())
                .load(conn)
                .into_core()?;
            decode(rows, Entity::ScenarioMembership)
        }
        (EntityKind::ScenarioTemplateMembership, Owner::ScenarioTemplate(id)) => {
            let rows = scenario_template_memberships::table
                .filter(scenario_template_memberships::scenario_template_id.eq(owner_id(id)))
                .order(scenario_template_memberships::date_created.asc())
                .select(ScenarioTemplateMembershipDB::as_select())
                .load(conn)
                .into_core()?;
            decode(rows, Entity::ScenarioTemplateMembership)
        }
        _ => Ok(Vec::new()),
    }
}

/// Runs the insert, update or delete for one staged change against `$table`.
macro_rules! write_row {
    ($conn:expr, $operation:expr, $table:ident, $row:expr, $id:expr) => {
        match $operation {
            ChangeOperation::Created => diesel::insert_into($table::table)
                .values($row)
                .execute($conn),
            ChangeOperation::Updated => diesel::update($table::table.find($id))
                .set($row)
                .execute($conn),
            ChangeOperation::Deleted => diesel::delete($table::table.find($id)).execute($conn),
        }
    };
}

pub(crate) fn write_change(conn: &mut SqliteConnection, change: &PendingChange) -> Result<()> {
    let id = change.entity.id().to_string();
    let op = change.operation;
    let affected = match &change.entity {
        Entity::ScenarioTemplate(e) => {
            write_row!(conn, op, scenario_templates, &ScenarioTemplateDB::from(e), &id)
        }
        Entity::Scenario(e) => write_row!(conn, op, scenarios, &ScenarioDB::from(e), &id),
        Entity::Task(e) => write_row!(conn, op, tasks, &TaskDB::from(e), &id),
        Entity::Result(e) => write_row!(conn, op, results, &ResultDB::from(e), &id),
        Entity::ScenarioMembership(e) => write_row!(
            conn,
            op,
            scenario_memberships,
            &ScenarioMembershipDB::from(e),
            &id
        ),
        Entity::ScenarioTemplateMembership(e) => write_row!(
            conn,
            op,
            scenario_template_memberships,
            &ScenarioTemplateMembershipDB::from(e),
            &id
        ),
    }
    .into_core()?;

    if affected == 0 {
        return Err(DatabaseError::NotFound(change.key().to_string()).into());
    }
    Ok(())
}
