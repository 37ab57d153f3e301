//! MySQL-backed store.
//!
//! Tables used: `leave_types`, `leave_requests`, `leave_request_approvers`,
//! `leave_type_balances`, `comp_off_balances`, plus the read-only employee
//! directory (`employees`, `employee_managers`). Mutations lock the request
//! row first and the ledger row second so concurrent approvals serialize on
//! the ledger instead of deadlocking.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, MySqlConnection, MySqlPool};

use crate::{
    error::LeaveError,
    model::{
        balance::{Ledger, LedgerScope},
        days::Days,
        leave_request::{
            ApproverSlot, EmployeeProfile, LeaveRequest, MAX_APPROVERS, ManagerAssignment,
            NewLeaveRequest,
        },
        leave_status::{LeaveStatus, SlotStatus},
        leave_type::{LeaveType, LeaveTypeInput},
    },
    store::{
        LeaveStore, RequestPage, RequestQuery, duplicate_leave_type, leave_type_not_found,
        request_not_found,
    },
};

const REQUEST_COLUMNS: &str = r#"
    lr.id, lr.series, lr.employee_id, lr.employee_name, lr.leave_type,
    lr.leave_balance_before, lr.from_date, lr.to_date, lr.half_day,
    lr.total_leave_days, lr.reason, lr.status, lr.hr_id, lr.hr_name,
    lr.hr_approval_notes, lr.created_at, lr.manager_approved_at,
    lr.hr_approved_at, lr.cancelled_at
"#;

const APPROVER_COLUMNS: &str =
    "request_id, slot, manager_id, manager_name, status, notes, decided_at";

const LEAVE_TYPE_COLUMNS: &str =
    "id, type_name, description, color, max_days, carry_forward, is_active";

#[derive(Clone)]
pub struct MySqlLeaveStore {
    pool: MySqlPool,
}

impl MySqlLeaveStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct LeaveTypeRow {
    id: u64,
    type_name: String,
    description: Option<String>,
    color: Option<String>,
    max_days: Option<Decimal>,
    carry_forward: bool,
    is_active: bool,
}

impl From<LeaveTypeRow> for LeaveType {
    fn from(row: LeaveTypeRow) -> Self {
        LeaveType {
            id: row.id,
            type_name: row.type_name,
            description: row.description,
            color: row.color,
            max_days: row.max_days.map(Days::from),
            carry_forward: row.carry_forward,
            is_active: row.is_active,
        }
    }
}

#[derive(FromRow)]
struct LeaveRequestRow {
    id: u64,
    series: String,
    employee_id: u64,
    employee_name: String,
    leave_type: String,
    leave_balance_before: Option<Decimal>,
    from_date: NaiveDate,
    to_date: Option<NaiveDate>,
    half_day: bool,
    total_leave_days: Decimal,
    reason: String,
    status: String,
    hr_id: Option<u64>,
    hr_name: Option<String>,
    hr_approval_notes: Option<String>,
    created_at: DateTime<Utc>,
    manager_approved_at: Option<DateTime<Utc>>,
    hr_approved_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct ApproverRow {
    request_id: u64,
    slot: u8,
    manager_id: u64,
    manager_name: String,
    status: String,
    notes: Option<String>,
    decided_at: Option<DateTime<Utc>>,
}

impl TryFrom<ApproverRow> for ApproverSlot {
    type Error = LeaveError;

    fn try_from(row: ApproverRow) -> Result<Self, Self::Error> {
        let status = SlotStatus::from_str(&row.status).map_err(|_| {
            LeaveError::CorruptRecord(format!(
                "approver slot {} of request {} has status '{}'",
                row.slot, row.request_id, row.status
            ))
        })?;
        Ok(ApproverSlot {
            slot: row.slot,
            manager_id: row.manager_id,
            manager_name: row.manager_name,
            status,
            notes: row.notes,
            decided_at: row.decided_at,
        })
    }
}

fn assemble(row: LeaveRequestRow, approvers: Vec<ApproverSlot>) -> Result<LeaveRequest, LeaveError> {
    let status = LeaveStatus::from_str(&row.status).map_err(|_| {
        LeaveError::CorruptRecord(format!(
            "leave request {} has status '{}'",
            row.id, row.status
        ))
    })?;

    Ok(LeaveRequest {
        id: row.id,
        series: row.series,
        employee_id: row.employee_id,
        employee_name: row.employee_name,
        leave_type: row.leave_type,
        leave_balance_before: row.leave_balance_before.map(Days::from),
        from_date: row.from_date,
        to_date: row.to_date,
        half_day: row.half_day,
        total_leave_days: Days::from(row.total_leave_days),
        reason: row.reason,
        status,
        approvers,
        hr_id: row.hr_id,
        hr_name: row.hr_name,
        hr_approval_notes: row.hr_approval_notes,
        created_at: row.created_at,
        manager_approved_at: row.manager_approved_at,
        hr_approved_at: row.hr_approved_at,
        cancelled_at: row.cancelled_at,
    })
}

#[derive(FromRow)]
struct LedgerRow {
    leave_type: String,
    total_allocated: Decimal,
    used: Decimal,
}

impl From<&LedgerRow> for Ledger {
    fn from(row: &LedgerRow) -> Self {
        Ledger::new(Days::from(row.total_allocated), Days::from(row.used))
    }
}

// Helper enum for typed SQLx binding
enum FilterValue<'a> {
    U64(u64),
    Str(&'a str),
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000"))
}

async fn load_request(
    conn: &mut MySqlConnection,
    id: u64,
    for_update: bool,
) -> Result<Option<LeaveRequest>, LeaveError> {
    let lock = if for_update { " FOR UPDATE" } else { "" };

    let row = sqlx::query_as::<_, LeaveRequestRow>(&format!(
        "SELECT {REQUEST_COLUMNS} FROM leave_requests lr WHERE lr.id = ?{lock}"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let approvers = sqlx::query_as::<_, ApproverRow>(&format!(
        "SELECT {APPROVER_COLUMNS} FROM leave_request_approvers WHERE request_id = ? ORDER BY slot{lock}"
    ))
    .bind(id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(ApproverSlot::try_from)
    .collect::<Result<Vec<_>, _>>()?;

    assemble(row, approvers).map(Some)
}

async fn write_request(conn: &mut MySqlConnection, request: &LeaveRequest) -> Result<(), LeaveError> {
    sqlx::query(
        r#"
        UPDATE leave_requests
        SET status = ?,
            hr_id = ?,
            hr_name = ?,
            hr_approval_notes = ?,
            manager_approved_at = ?,
            hr_approved_at = ?,
            cancelled_at = ?,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = ?
        "#,
    )
    .bind(request.status.as_ref())
    .bind(request.hr_id)
    .bind(request.hr_name.as_deref())
    .bind(request.hr_approval_notes.as_deref())
    .bind(request.manager_approved_at)
    .bind(request.hr_approved_at)
    .bind(request.cancelled_at)
    .bind(request.id)
    .execute(&mut *conn)
    .await?;

    for slot in &request.approvers {
        sqlx::query(
            r#"
            UPDATE leave_request_approvers
            SET status = ?, notes = ?, decided_at = ?
            WHERE request_id = ? AND slot = ?
            "#,
        )
        .bind(slot.status.as_ref())
        .bind(slot.notes.as_deref())
        .bind(slot.decided_at)
        .bind(request.id)
        .bind(slot.slot)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Creates the ledger row if missing, then locks and reads it.
async fn lock_ledger(conn: &mut MySqlConnection, scope: &LedgerScope) -> Result<Ledger, LeaveError> {
    let row = match scope {
        LedgerScope::LeaveType {
            employee_id,
            year,
            leave_type,
        } => {
            sqlx::query(
                r#"
                INSERT IGNORE INTO leave_type_balances
                    (employee_id, year, leave_type, total_allocated, used, remaining)
                VALUES (?, ?, ?, 0, 0, 0)
                "#,
            )
            .bind(*employee_id)
            .bind(*year)
            .bind(leave_type.as_str())
            .execute(&mut *conn)
            .await?;

            sqlx::query_as::<_, LedgerRow>(
                r#"
                SELECT leave_type, total_allocated, used
                FROM leave_type_balances
                WHERE employee_id = ? AND year = ? AND leave_type = ?
                FOR UPDATE
                "#,
            )
            .bind(*employee_id)
            .bind(*year)
            .bind(leave_type.as_str())
            .fetch_one(&mut *conn)
            .await?
        }
        LedgerScope::CompOff { employee_id, year } => {
            sqlx::query(
                r#"
                INSERT IGNORE INTO comp_off_balances
                    (employee_id, year, total_earned, taken, remaining)
                VALUES (?, ?, 0, 0, 0)
                "#,
            )
            .bind(*employee_id)
            .bind(*year)
            .execute(&mut *conn)
            .await?;

            sqlx::query_as::<_, LedgerRow>(
                r#"
                SELECT 'Comp Off' AS leave_type, total_earned AS total_allocated, taken AS used
                FROM comp_off_balances
                WHERE employee_id = ? AND year = ?
                FOR UPDATE
                "#,
            )
            .bind(*employee_id)
            .bind(*year)
            .fetch_one(&mut *conn)
            .await?
        }
    };

    Ok(Ledger::from(&row))
}

async fn write_ledger(
    conn: &mut MySqlConnection,
    scope: &LedgerScope,
    ledger: &Ledger,
) -> Result<(), LeaveError> {
    match scope {
        LedgerScope::LeaveType {
            employee_id,
            year,
            leave_type,
        } => {
            sqlx::query(
                r#"
                UPDATE leave_type_balances
                SET total_allocated = ?, used = ?, remaining = ?, updated_at = CURRENT_TIMESTAMP
                WHERE employee_id = ? AND year = ? AND leave_type = ?
                "#,
            )
            .bind(ledger.allocated().value())
            .bind(ledger.used().value())
            .bind(ledger.remaining().value())
            .bind(*employee_id)
            .bind(*year)
            .bind(leave_type.as_str())
            .execute(&mut *conn)
            .await?;
        }
        LedgerScope::CompOff { employee_id, year } => {
            sqlx::query(
                r#"
                UPDATE comp_off_balances
                SET total_earned = ?, taken = ?, remaining = ?, updated_at = CURRENT_TIMESTAMP
                WHERE employee_id = ? AND year = ?
                "#,
            )
            .bind(ledger.allocated().value())
            .bind(ledger.used().value())
            .bind(ledger.remaining().value())
            .bind(*employee_id)
            .bind(*year)
            .execute(&mut *conn)
            .await?;
        }
    }

    Ok(())
}

impl MySqlLeaveStore {
    async fn leave_type_by_id(&self, id: u64) -> Result<Option<LeaveType>, LeaveError> {
        let row = sqlx::query_as::<_, LeaveTypeRow>(&format!(
            "SELECT {LEAVE_TYPE_COLUMNS} FROM leave_types WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(LeaveType::from))
    }

    async fn name_taken(&self, name: &str, except_id: Option<u64>) -> Result<bool, LeaveError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM leave_types WHERE LOWER(type_name) = LOWER(?) AND id <> ?",
        )
        .bind(name.trim())
        .bind(except_id.unwrap_or(0))
        .fetch_one(&self.pool)
        .await?;

        Ok(count > 0)
    }

    async fn approvers_for(&self, ids: &[u64]) -> Result<HashMap<u64, Vec<ApproverSlot>>, LeaveError> {
        let mut by_request: HashMap<u64, Vec<ApproverSlot>> = HashMap::new();
        if ids.is_empty() {
            return Ok(by_request);
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {APPROVER_COLUMNS} FROM leave_request_approvers WHERE request_id IN ({placeholders}) ORDER BY request_id, slot"
        );

        let mut q = sqlx::query_as::<_, ApproverRow>(&sql);
        for id in ids {
            q = q.bind(*id);
        }

        for row in q.fetch_all(&self.pool).await? {
            let request_id = row.request_id;
            by_request
                .entry(request_id)
                .or_default()
                .push(ApproverSlot::try_from(row)?);
        }

        Ok(by_request)
    }
}

impl LeaveStore for MySqlLeaveStore {
    async fn leave_types(&self, include_inactive: bool) -> Result<Vec<LeaveType>, LeaveError> {
        let filter = if include_inactive { "" } else { " WHERE is_active = TRUE" };
        let rows = sqlx::query_as::<_, LeaveTypeRow>(&format!(
            "SELECT {LEAVE_TYPE_COLUMNS} FROM leave_types{filter} ORDER BY type_name"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(LeaveType::from).collect())
    }

    async fn leave_type_by_name(&self, name: &str) -> Result<Option<LeaveType>, LeaveError> {
        let row = sqlx::query_as::<_, LeaveTypeRow>(&format!(
            "SELECT {LEAVE_TYPE_COLUMNS} FROM leave_types WHERE LOWER(type_name) = LOWER(?)"
        ))
        .bind(name.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(LeaveType::from))
    }

    async fn insert_leave_type(&self, input: &LeaveTypeInput) -> Result<LeaveType, LeaveError> {
        let name = input.type_name.trim();
        if self.name_taken(name, None).await? {
            return Err(duplicate_leave_type(name));
        }

        let result = sqlx::query(
            r#"
            INSERT INTO leave_types (type_name, description, color, max_days, carry_forward, is_active)
            VALUES (?, ?, ?, ?, ?, TRUE)
            "#,
        )
        .bind(name)
        .bind(input.description.as_deref())
        .bind(input.color_or_default())
        .bind(input.max_days.map(Days::value))
        .bind(input.carry_forward)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                duplicate_leave_type(name)
            } else {
                LeaveError::Database(e)
            }
        })?;

        let id = result.last_insert_id();
        self.leave_type_by_id(id)
            .await?
            .ok_or_else(|| leave_type_not_found(id))
    }

    async fn update_leave_type(
        &self,
        id: u64,
        input: &LeaveTypeInput,
    ) -> Result<LeaveType, LeaveError> {
        let existing = self
            .leave_type_by_id(id)
            .await?
            .ok_or_else(|| leave_type_not_found(id))?;

        let name = input.type_name.trim();
        if self.name_taken(name, Some(id)).await? {
            return Err(duplicate_leave_type(name));
        }

        sqlx::query(
            r#"
            UPDATE leave_types
            SET type_name = ?, description = ?, color = ?, max_days = ?,
                carry_forward = ?, is_active = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ?
            "#,
        )
        .bind(name)
        .bind(input.description.as_deref())
        .bind(input.color_or_default())
        .bind(input.max_days.map(Days::value))
        .bind(input.carry_forward)
        .bind(input.is_active.unwrap_or(existing.is_active))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                duplicate_leave_type(name)
            } else {
                LeaveError::Database(e)
            }
        })?;

        self.leave_type_by_id(id)
            .await?
            .ok_or_else(|| leave_type_not_found(id))
    }

    async fn deactivate_leave_type(&self, id: u64) -> Result<LeaveType, LeaveError> {
        let mut existing = self
            .leave_type_by_id(id)
            .await?
            .ok_or_else(|| leave_type_not_found(id))?;

        sqlx::query(
            "UPDATE leave_types SET is_active = FALSE, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        existing.is_active = false;
        Ok(existing)
    }

    async fn employee_profile(
        &self,
        employee_id: u64,
    ) -> Result<Option<EmployeeProfile>, LeaveError> {
        let employee = sqlx::query_as::<_, (u64, String, String)>(
            "SELECT id, first_name, last_name FROM employees WHERE id = ?",
        )
        .bind(employee_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some((id, first_name, last_name)) = employee else {
            return Ok(None);
        };

        let managers = sqlx::query_as::<_, (u8, u64, String)>(
            r#"
            SELECT slot, manager_id, manager_name
            FROM employee_managers
            WHERE employee_id = ?
            ORDER BY slot
            LIMIT ?
            "#,
        )
        .bind(employee_id)
        .bind(MAX_APPROVERS as u64)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(|(slot, manager_id, manager_name)| ManagerAssignment {
            slot,
            manager_id,
            manager_name,
        })
        .collect();

        Ok(Some(EmployeeProfile {
            employee_id: id,
            name: format!("{first_name} {last_name}"),
            managers,
        }))
    }

    async fn ledger(&self, scope: &LedgerScope) -> Result<Ledger, LeaveError> {
        let row = match scope {
            LedgerScope::LeaveType {
                employee_id,
                year,
                leave_type,
            } => {
                sqlx::query_as::<_, LedgerRow>(
                    r#"
                    SELECT leave_type, total_allocated, used
                    FROM leave_type_balances
                    WHERE employee_id = ? AND year = ? AND leave_type = ?
                    "#,
                )
                .bind(*employee_id)
                .bind(*year)
                .bind(leave_type.as_str())
                .fetch_optional(&self.pool)
                .await?
            }
            LedgerScope::CompOff { employee_id, year } => {
                sqlx::query_as::<_, LedgerRow>(
                    r#"
                    SELECT 'Comp Off' AS leave_type, total_earned AS total_allocated, taken AS used
                    FROM comp_off_balances
                    WHERE employee_id = ? AND year = ?
                    "#,
                )
                .bind(*employee_id)
                .bind(*year)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        Ok(row.as_ref().map(Ledger::from).unwrap_or_default())
    }

    async fn ledgers_for_employee(
        &self,
        employee_id: u64,
        year: i32,
    ) -> Result<Vec<(String, Ledger)>, LeaveError> {
        let rows = sqlx::query_as::<_, LedgerRow>(
            r#"
            SELECT leave_type, total_allocated, used
            FROM leave_type_balances
            WHERE employee_id = ? AND year = ?
            ORDER BY leave_type
            "#,
        )
        .bind(employee_id)
        .bind(year)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| (row.leave_type.clone(), Ledger::from(row)))
            .collect())
    }

    async fn update_ledger<F, T>(&self, scope: &LedgerScope, apply: F) -> Result<T, LeaveError>
    where
        F: FnOnce(&mut Ledger) -> Result<T, LeaveError>,
    {
        let mut tx = self.pool.begin().await?;
        let mut ledger = lock_ledger(&mut tx, scope).await?;

        // dropping tx on error rolls back
        let out = apply(&mut ledger)?;

        write_ledger(&mut tx, scope, &ledger).await?;
        tx.commit().await?;
        Ok(out)
    }

    async fn insert_request(&self, request: NewLeaveRequest) -> Result<LeaveRequest, LeaveError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (series, employee_id, employee_name, leave_type, leave_balance_before,
                 from_date, to_date, half_day, total_leave_days, reason, status)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.series)
        .bind(request.employee_id)
        .bind(&request.employee_name)
        .bind(&request.leave_type)
        .bind(request.leave_balance_before.map(Days::value))
        .bind(request.from_date)
        .bind(request.to_date)
        .bind(request.half_day)
        .bind(request.total_leave_days.value())
        .bind(&request.reason)
        .bind(request.status.as_ref())
        .execute(&mut *tx)
        .await?;

        let id = result.last_insert_id();

        for slot in &request.approvers {
            sqlx::query(
                r#"
                INSERT INTO leave_request_approvers
                    (request_id, slot, manager_id, manager_name, status)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(id)
            .bind(slot.slot)
            .bind(slot.manager_id)
            .bind(&slot.manager_name)
            .bind(slot.status.as_ref())
            .execute(&mut *tx)
            .await?;
        }

        let created = load_request(&mut tx, id, false)
            .await?
            .ok_or_else(|| request_not_found(id))?;

        tx.commit().await?;
        Ok(created)
    }

    async fn request(&self, id: u64) -> Result<Option<LeaveRequest>, LeaveError> {
        let mut conn = self.pool.acquire().await?;
        load_request(&mut conn, id, false).await
    }

    async fn list_requests(&self, query: &RequestQuery) -> Result<RequestPage, LeaveError> {
        let pending = SlotStatus::Pending;

        // -------------------------
        // WHERE clause
        // -------------------------
        let mut where_sql = String::from(" WHERE 1=1");
        let mut args: Vec<FilterValue<'_>> = Vec::new();

        if let Some(emp_id) = query.employee_id {
            where_sql.push_str(" AND lr.employee_id = ?");
            args.push(FilterValue::U64(emp_id));
        }

        if !query.statuses.is_empty() {
            let placeholders = vec!["?"; query.statuses.len()].join(", ");
            where_sql.push_str(&format!(" AND lr.status IN ({placeholders})"));
            for status in &query.statuses {
                args.push(FilterValue::Str(status.as_ref()));
            }
        }

        if let Some(manager_id) = query.pending_approver {
            where_sql.push_str(
                " AND EXISTS (SELECT 1 FROM leave_request_approvers a \
                 WHERE a.request_id = lr.id AND a.manager_id = ? AND a.status = ?)",
            );
            args.push(FilterValue::U64(manager_id));
            args.push(FilterValue::Str(pending.as_ref()));
        }

        // -------------------------
        // COUNT query
        // -------------------------
        let count_sql = format!("SELECT COUNT(*) FROM leave_requests lr{where_sql}");
        let mut count_q = sqlx::query_scalar::<_, i64>(&count_sql);
        for arg in &args {
            count_q = match arg {
                FilterValue::U64(v) => count_q.bind(*v),
                FilterValue::Str(s) => count_q.bind(*s),
            };
        }
        let total = count_q.fetch_one(&self.pool).await?;

        // -------------------------
        // DATA query
        // -------------------------
        let direction = if query.oldest_first { "ASC" } else { "DESC" };
        let data_sql = format!(
            "SELECT {REQUEST_COLUMNS} FROM leave_requests lr{where_sql} \
             ORDER BY lr.created_at {direction}, lr.id {direction} LIMIT ? OFFSET ?"
        );

        let mut data_q = sqlx::query_as::<_, LeaveRequestRow>(&data_sql);
        for arg in args {
            data_q = match arg {
                FilterValue::U64(v) => data_q.bind(v),
                FilterValue::Str(s) => data_q.bind(s),
            };
        }

        let rows = data_q
            .bind(query.limit.unwrap_or(u64::MAX))
            .bind(query.offset)
            .fetch_all(&self.pool)
            .await?;

        let ids: Vec<u64> = rows.iter().map(|r| r.id).collect();
        let mut approvers = self.approvers_for(&ids).await?;

        let items = rows
            .into_iter()
            .map(|row| {
                let slots = approvers.remove(&row.id).unwrap_or_default();
                assemble(row, slots)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(RequestPage { items, total })
    }

    async fn update_request<F, T>(&self, id: u64, apply: F) -> Result<T, LeaveError>
    where
        F: FnOnce(&mut LeaveRequest) -> Result<T, LeaveError>,
    {
        let mut tx = self.pool.begin().await?;
        let mut request = load_request(&mut tx, id, true)
            .await?
            .ok_or_else(|| request_not_found(id))?;

        let out = apply(&mut request)?;

        write_request(&mut tx, &request).await?;
        tx.commit().await?;
        Ok(out)
    }

    async fn update_request_with_ledger<F, T>(&self, id: u64, apply: F) -> Result<T, LeaveError>
    where
        F: FnOnce(&mut LeaveRequest, Option<&mut Ledger>) -> Result<T, LeaveError>,
    {
        let mut tx = self.pool.begin().await?;
        let mut request = load_request(&mut tx, id, true)
            .await?
            .ok_or_else(|| request_not_found(id))?;

        let scope = LedgerScope::for_leave(request.employee_id, &request.leave_type, request.year());
        let mut ledger = match &scope {
            Some(scope) => Some(lock_ledger(&mut tx, scope).await?),
            None => None,
        };

        let out = apply(&mut request, ledger.as_mut())?;

        write_request(&mut tx, &request).await?;
        if let (Some(scope), Some(ledger)) = (&scope, &ledger) {
            write_ledger(&mut tx, scope, ledger).await?;
        }
        tx.commit().await?;
        Ok(out)
    }
}
