// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-process simulated lake.
//!
//! `SimLake` implements both service seams against in-memory relations.
//! Roles carry Lake Formation style grants: per relation, the visible
//! columns and an optional row filter. Masked views are materialized copies
//! of a base table with PII cells rewritten. Queries go through a small SQL
//! evaluator covering the shapes validation suites use:
//!
//! ```text
//! SELECT * | col [AS a], .. | COUNT(*) [AS a]
//! FROM [db.]relation [WHERE col = 'v' [AND ..]]
//! [GROUP BY col] [ORDER BY col [ASC|DESC]] [LIMIT n]
//! ```
//!
//! Each assumption mints a distinct access key, and every query-side call
//! checks that the presented credential is a live session and, for job
//! calls, the session that submitted the job.

use crate::config::{keys, ProvisioningOutputs};
use crate::credential::{Credential, RoleRef, SessionLabel};
use crate::error::{Result, ServiceError};
use crate::service::{
    ExecutionTarget, JobId, JobState, JobStatus, PageRequest, QueryService, ResultPage,
    RoleAssumer,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use regex::Regex;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Account id the simulated caller belongs to
pub const SIM_ACCOUNT_ID: &str = "000000000000";

const SELECT_PATTERN: &str = r#"(?is)^\s*SELECT\s+(?P<proj>.+?)\s+FROM\s+(?P<rel>[A-Za-z0-9_."]+)(?:\s+WHERE\s+(?P<where>.+?))?(?:\s+GROUP\s+BY\s+(?P<group>[A-Za-z0-9_"]+))?(?:\s+ORDER\s+BY\s+(?P<order>[A-Za-z0-9_"]+)(?:\s+(?P<dir>ASC|DESC))?)?(?:\s+LIMIT\s+(?P<limit>\d+))?\s*;?\s*$"#;
const ITEM_PATTERN: &str =
    r#"(?i)^(?:(?P<count>COUNT\s*\(\s*\*\s*\))|(?P<col>[A-Za-z0-9_"]+))(?:\s+AS\s+(?P<alias>[A-Za-z0-9_"]+))?$"#;
const PREDICATE_PATTERN: &str = r#"^(?P<col>[A-Za-z0-9_"]+)\s*=\s*'(?P<val>[^']*)'$"#;
const AND_PATTERN: &str = r"(?i)\s+AND\s+";

/// How a masked view rewrites a column
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mask {
    /// Keep only the domain: `***@example.com`
    Email,
    /// Replace every digit with `*`
    Digits,
}

impl Mask {
    pub fn apply(self, value: &str) -> String {
        match self {
            Self::Email => match value.split_once('@') {
                Some((_, domain)) => format!("***@{}", domain),
                None => "***".to_string(),
            },
            Self::Digits => value
                .chars()
                .map(|c| if c.is_ascii_digit() { '*' } else { c })
                .collect(),
        }
    }
}

/// In-memory relation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Relation {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Relation {
    pub fn new(columns: &[&str], rows: Vec<Vec<String>>) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    fn index(&self, column: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
    }
}

/// Access a role holds on one relation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Grant {
    /// Visible columns; `None` grants every column
    pub columns: Option<Vec<String>>,
    /// Row filter: (column, allowed values)
    pub row_filter: Option<(String, Vec<String>)>,
}

/// A role's grants, keyed by relation name
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RolePolicy {
    grants: BTreeMap<String, Grant>,
}

impl RolePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every column and row of `relation`
    pub fn grant_all(mut self, relation: &str) -> Self {
        self.grants.insert(relation.to_string(), Grant::default());
        self
    }

    /// Only `columns` of `relation`
    pub fn grant_columns(mut self, relation: &str, columns: &[&str]) -> Self {
        self.grants.entry(relation.to_string()).or_default().columns =
            Some(columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Only rows of `relation` whose `column` is one of `values`
    pub fn row_filter(mut self, relation: &str, column: &str, values: &[&str]) -> Self {
        self.grants.entry(relation.to_string()).or_default().row_filter = Some((
            column.to_string(),
            values.iter().map(|v| v.to_string()).collect(),
        ));
        self
    }
}

/// Timing and paging behavior of simulated jobs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimBehavior {
    /// Status polls answered with RUNNING before the terminal state
    pub running_polls: u32,
    /// Jobs never leave RUNNING
    pub never_finish: bool,
    /// Largest page returned by result retrieval, header included
    pub page_size: usize,
}

impl Default for SimBehavior {
    fn default() -> Self {
        Self {
            running_polls: 1,
            never_finish: false,
            page_size: 1000,
        }
    }
}

#[derive(Debug)]
struct Session {
    role: String,
    secret_access_key: String,
}

#[derive(Debug)]
struct SimJob {
    access_key_id: String,
    polls: u32,
    cancelled: bool,
    outcome: std::result::Result<Vec<Vec<Option<String>>>, String>,
}

#[derive(Debug, Default)]
struct SimState {
    minted: u64,
    sessions: HashMap<String, Session>,
    jobs: HashMap<String, SimJob>,
}

/// Simulated role-assumption and query services
#[derive(Debug)]
pub struct SimLake {
    database: String,
    relations: BTreeMap<String, Relation>,
    roles: BTreeMap<String, RolePolicy>,
    behavior: SimBehavior,
    credential_expiration: Option<DateTime<Utc>>,
    state: Mutex<SimState>,
}

impl SimLake {
    pub fn new(database: &str) -> Self {
        Self {
            database: database.to_string(),
            relations: BTreeMap::new(),
            roles: BTreeMap::new(),
            behavior: SimBehavior::default(),
            credential_expiration: None,
            state: Mutex::new(SimState::default()),
        }
    }

    /// The demo lake described by provisioning outputs.
    ///
    /// The table holds the sample sales data. The data admin role sees
    /// everything; the analyst role sees APAC rows of the non-PII columns
    /// and the masked view.
    pub fn demo(outputs: &ProvisioningOutputs) -> Self {
        let table = outputs.table();
        let view = outputs.view();
        let admin = role_name(outputs.role(keys::DATA_ADMIN_ROLE).unwrap_or_default());
        let analyst = role_name(outputs.role(keys::ANALYST_ROLE).unwrap_or_default());

        Self::new(outputs.database())
            .with_table(table, sample_sales())
            .with_masked_view(
                view,
                table,
                &[("customer_email", Mask::Email), ("ssn", Mask::Digits)],
            )
            .with_role(&admin, RolePolicy::new().grant_all(table).grant_all(view))
            .with_role(
                &analyst,
                RolePolicy::new()
                    .grant_columns(
                        table,
                        &[
                            "customer_id",
                            "customer_name",
                            "sales_region",
                            "sales_amount",
                            "sale_date",
                        ],
                    )
                    .row_filter(table, "sales_region", &["APAC"])
                    .grant_all(view)
                    .row_filter(view, "sales_region", &["APAC"]),
            )
    }

    pub fn with_table(mut self, name: &str, relation: Relation) -> Self {
        self.relations.insert(name.to_string(), relation);
        self
    }

    /// Add a view of `base` with the given columns masked.
    /// Unknown base tables produce an empty view.
    pub fn with_masked_view(mut self, name: &str, base: &str, masks: &[(&str, Mask)]) -> Self {
        let mut view = self.relations.get(base).cloned().unwrap_or_default();
        for (column, mask) in masks {
            if let Some(idx) = view.index(column) {
                for row in &mut view.rows {
                    row[idx] = mask.apply(&row[idx]);
                }
            }
        }
        self.relations.insert(name.to_string(), view);
        self
    }

    pub fn with_role(mut self, name: &str, policy: RolePolicy) -> Self {
        self.roles.insert(name.to_string(), policy);
        self
    }

    pub fn with_behavior(mut self, behavior: SimBehavior) -> Self {
        self.behavior = behavior;
        self
    }

    /// Stamp every minted credential with this expiration
    pub fn with_credential_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.credential_expiration = Some(expiration);
        self
    }

    /// Number of credentials minted so far
    pub fn minted(&self) -> u64 {
        self.state.lock().minted
    }

    fn session_role(&self, state: &SimState, credential: &Credential) -> Result<String> {
        match state.sessions.get(&credential.access_key_id) {
            Some(session) if session.secret_access_key == credential.secret_access_key => {
                Ok(session.role.clone())
            }
            _ => Err(ServiceError::from_code(
                "UnrecognizedClientException",
                "The security token included in the request is invalid.",
            )),
        }
    }

    fn check_job_owner(job: &SimJob, id: &JobId, credential: &Credential) -> Result<()> {
        if job.access_key_id == credential.access_key_id {
            Ok(())
        } else {
            Err(ServiceError::access_denied(format!(
                "caller is not authorized to access query execution {}",
                id
            )))
        }
    }

    fn execute(
        &self,
        role: &str,
        sql: &str,
        target: &ExecutionTarget,
    ) -> std::result::Result<Vec<Vec<Option<String>>>, String> {
        let query = SelectQuery::parse(sql)?;
        let default_db = target.database.as_deref().unwrap_or(&self.database);
        let (db, name) = match query.relation.split_once('.') {
            Some((db, name)) => (db.to_string(), name.to_string()),
            None => (default_db.to_string(), query.relation.clone()),
        };
        let relation = match self.relations.get(&name) {
            Some(r) if db == self.database => r,
            _ => {
                return Err(format!(
                    "TABLE_NOT_FOUND: line 1:{}: Table 'awsdatacatalog.{}.{}' does not exist",
                    query.relation_pos, db, name
                ))
            }
        };
        let grant = self
            .roles
            .get(role)
            .and_then(|policy| policy.grants.get(&name))
            .ok_or_else(|| {
                format!(
                    "Insufficient Lake Formation permission(s) on {}.{}",
                    db, name
                )
            })?;
        query.evaluate(relation, grant)
    }
}

#[async_trait]
impl RoleAssumer for SimLake {
    async fn assume_role(&self, role: &RoleRef, session: &SessionLabel) -> Result<Credential> {
        let arn = role.to_arn(SIM_ACCOUNT_ID);
        let name = role_name(&arn);
        if !self.roles.contains_key(&name) {
            return Err(ServiceError::access_denied(format!(
                "User: arn:aws:iam::{}:user/validator is not authorized to perform: \
                 sts:AssumeRole on resource: {}",
                SIM_ACCOUNT_ID, arn
            )));
        }

        let mut state = self.state.lock();
        state.minted += 1;
        let n = state.minted;
        let access_key_id = format!("ASIASIM{}{:06}", name.to_ascii_uppercase(), n);
        let secret_access_key = format!("sim-secret-{}-{}", session, n);
        state.sessions.insert(
            access_key_id.clone(),
            Session {
                role: name,
                secret_access_key: secret_access_key.clone(),
            },
        );

        let credential = Credential::new(
            access_key_id,
            secret_access_key,
            format!("sim-token-{}", n),
        );
        Ok(match self.credential_expiration {
            Some(exp) => credential.with_expiration(exp),
            None => credential,
        })
    }
}

#[async_trait]
impl QueryService for SimLake {
    async fn start_query(
        &self,
        credential: &Credential,
        sql: &str,
        target: &ExecutionTarget,
    ) -> Result<JobId> {
        if target.output_location.trim().is_empty() {
            return Err(ServiceError::invalid_request(
                "No output location provided. An output location is required.",
            ));
        }
        let mut state = self.state.lock();
        let role = self.session_role(&state, credential)?;
        let id = uuid::Uuid::new_v4().to_string();
        let outcome = self.execute(&role, sql, target);
        state.jobs.insert(
            id.clone(),
            SimJob {
                access_key_id: credential.access_key_id.clone(),
                polls: 0,
                cancelled: false,
                outcome,
            },
        );
        Ok(JobId::new(id))
    }

    async fn get_status(
        &self,
        credential: &Credential,
        job: &JobId,
        _target: &ExecutionTarget,
    ) -> Result<JobStatus> {
        let mut state = self.state.lock();
        self.session_role(&state, credential)?;
        let never_finish = self.behavior.never_finish;
        let running_polls = self.behavior.running_polls;
        let sim_job = state.jobs.get_mut(job.as_str()).ok_or_else(|| {
            ServiceError::invalid_request(format!("QueryExecution {} was not found", job))
        })?;
        Self::check_job_owner(sim_job, job, credential)?;

        sim_job.polls = sim_job.polls.saturating_add(1);
        if sim_job.cancelled {
            return Ok(JobStatus::with_reason(
                JobState::Cancelled,
                "Query cancelled by user",
            ));
        }
        if never_finish || sim_job.polls <= running_polls {
            let current = if sim_job.polls == 1 {
                JobState::Queued
            } else {
                JobState::Running
            };
            return Ok(JobStatus::new(current));
        }
        Ok(match &sim_job.outcome {
            Ok(_) => JobStatus::new(JobState::Succeeded),
            Err(reason) => JobStatus::with_reason(JobState::Failed, reason.clone()),
        })
    }

    async fn get_results(
        &self,
        credential: &Credential,
        job: &JobId,
        _target: &ExecutionTarget,
        page: PageRequest,
    ) -> Result<ResultPage> {
        let state = self.state.lock();
        self.session_role(&state, credential)?;
        let sim_job = state.jobs.get(job.as_str()).ok_or_else(|| {
            ServiceError::invalid_request(format!("QueryExecution {} was not found", job))
        })?;
        Self::check_job_owner(sim_job, job, credential)?;

        let finished = !self.behavior.never_finish
            && !sim_job.cancelled
            && sim_job.polls > self.behavior.running_polls;
        let rows = match (&sim_job.outcome, finished) {
            (Ok(rows), true) => rows,
            (Err(_), true) => {
                return Err(ServiceError::invalid_request(format!(
                    "Query has failed. Query execution {} is in state FAILED",
                    job
                )))
            }
            (_, false) => {
                return Err(ServiceError::invalid_request(format!(
                    "Query has not yet finished. Current state: {}",
                    if sim_job.cancelled { "CANCELLED" } else { "RUNNING" }
                )))
            }
        };

        let offset = match page.token.as_deref() {
            None => 0,
            Some(token) => token
                .strip_prefix("offset-")
                .and_then(|n| n.parse::<usize>().ok())
                .ok_or_else(|| ServiceError::invalid_request("invalid pagination token"))?,
        };
        let limit = page.max_rows.clamp(1, self.behavior.page_size.max(1));
        let end = (offset + limit).min(rows.len());
        let slice = rows.get(offset..end).map(<[_]>::to_vec).unwrap_or_default();
        let next_token = (end < rows.len()).then(|| format!("offset-{}", end));
        Ok(ResultPage {
            rows: slice,
            next_token,
        })
    }

    async fn stop_query(
        &self,
        credential: &Credential,
        job: &JobId,
        _target: &ExecutionTarget,
    ) -> Result<()> {
        let mut state = self.state.lock();
        self.session_role(&state, credential)?;
        let sim_job = state.jobs.get_mut(job.as_str()).ok_or_else(|| {
            ServiceError::invalid_request(format!("QueryExecution {} was not found", job))
        })?;
        Self::check_job_owner(sim_job, job, credential)?;
        sim_job.cancelled = true;
        Ok(())
    }
}

/// Role name from an ARN (`arn:aws:iam::1:role/path/Name` gives `Name`)
pub fn role_name(role: &str) -> String {
    role.rsplit(['/', ':']).next().unwrap_or(role).to_string()
}

/// The demo sales table: 20 customers across APAC, EMEA and AMER
pub fn sample_sales() -> Relation {
    const ROWS: [(&str, &str, &str, &str, &str, &str, &str); 20] = [
        ("CUST0001", "Alice Johnson", "alice.j@example.com", "123-45-6789", "APAC", "1250.50", "2024-01-15"),
        ("CUST0002", "Bob Smith", "bob.smith@example.com", "234-56-7890", "APAC", "2300.75", "2024-01-16"),
        ("CUST0003", "Charlie Brown", "charlie.b@example.com", "345-67-8901", "APAC", "1890.25", "2024-01-17"),
        ("CUST0004", "Diana Prince", "diana.p@example.com", "456-78-9012", "APAC", "3200.00", "2024-01-18"),
        ("CUST0005", "Eve Wilson", "eve.w@example.com", "567-89-0123", "APAC", "1450.30", "2024-01-19"),
        ("CUST0006", "Frank Miller", "frank.m@example.com", "678-90-1234", "EMEA", "2100.00", "2024-02-10"),
        ("CUST0007", "Grace Lee", "grace.lee@example.com", "789-01-2345", "EMEA", "1750.50", "2024-02-11"),
        ("CUST0008", "Henry Davis", "henry.d@example.com", "890-12-3456", "EMEA", "2900.25", "2024-02-12"),
        ("CUST0009", "Ivy Chen", "ivy.chen@example.com", "901-23-4567", "EMEA", "1650.75", "2024-02-13"),
        ("CUST0010", "Jack Taylor", "jack.t@example.com", "012-34-5678", "EMEA", "2400.00", "2024-02-14"),
        ("CUST0011", "Karen White", "karen.w@example.com", "111-22-3333", "AMER", "1950.50", "2024-03-05"),
        ("CUST0012", "Liam O'Brien", "liam.ob@example.com", "222-33-4444", "AMER", "2800.25", "2024-03-06"),
        ("CUST0013", "Mia Garcia", "mia.g@example.com", "333-44-5555", "AMER", "1550.75", "2024-03-07"),
        ("CUST0014", "Noah Martinez", "noah.m@example.com", "444-55-6666", "AMER", "3100.00", "2024-03-08"),
        ("CUST0015", "Olivia Anderson", "olivia.a@example.com", "555-66-7777", "AMER", "2200.50", "2024-03-09"),
        ("CUST0016", "Paul Thompson", "paul.t@example.com", "666-77-8888", "APAC", "1850.25", "2024-04-20"),
        ("CUST0017", "Quinn Jackson", "quinn.j@example.com", "777-88-9999", "APAC", "2600.75", "2024-04-21"),
        ("CUST0018", "Rachel Green", "rachel.g@example.com", "888-99-0000", "EMEA", "1400.00", "2024-04-22"),
        ("CUST0019", "Sam Wilson", "sam.w@example.com", "999-00-1111", "AMER", "2700.50", "2024-04-23"),
        ("CUST0020", "Tina Brown", "tina.b@example.com", "000-11-2222", "APAC", "1900.25", "2024-04-24"),
    ];

    Relation::new(
        &[
            "customer_id",
            "customer_name",
            "customer_email",
            "ssn",
            "sales_region",
            "sales_amount",
            "sale_date",
        ],
        ROWS.iter()
            .map(|(id, name, email, ssn, region, amount, date)| {
                [id, name, email, ssn, region, amount, date]
                    .iter()
                    .map(|v| v.to_string())
                    .collect()
            })
            .collect(),
    )
}

#[derive(Debug, PartialEq, Eq)]
enum Item {
    Column { name: String, alias: Option<String> },
    Count { alias: Option<String> },
}

/// A parsed SELECT statement
#[derive(Debug)]
struct SelectQuery {
    star: bool,
    items: Vec<Item>,
    relation: String,
    relation_pos: usize,
    predicates: Vec<(String, String)>,
    group_by: Option<String>,
    order_by: Option<(String, bool)>,
    limit: Option<usize>,
}

fn syntax_error(detail: &str) -> String {
    format!("SYNTAX_ERROR: line 1:1: {}", detail)
}

fn compile(pattern: &str) -> std::result::Result<Regex, String> {
    Regex::new(pattern).map_err(|e| format!("INTERNAL_ERROR: {}", e))
}

fn unquote(ident: &str) -> String {
    ident.trim_matches('"').to_string()
}

impl SelectQuery {
    fn parse(sql: &str) -> std::result::Result<Self, String> {
        let select = compile(SELECT_PATTERN)?;
        let caps = select
            .captures(sql)
            .ok_or_else(|| syntax_error("mismatched input; expected a SELECT statement"))?;

        let proj = caps.name("proj").map(|m| m.as_str().trim()).unwrap_or("");
        let rel = caps.name("rel");
        let relation = rel.map(|m| unquote(m.as_str())).unwrap_or_default();
        let relation_pos = rel.map(|m| m.start() + 1).unwrap_or(1);

        let mut star = false;
        let mut items = Vec::new();
        if proj == "*" {
            star = true;
        } else {
            let item = compile(ITEM_PATTERN)?;
            for raw in proj.split(',') {
                let raw = raw.trim();
                let caps = item
                    .captures(raw)
                    .ok_or_else(|| syntax_error(&format!("unsupported select item '{}'", raw)))?;
                let alias = caps.name("alias").map(|m| unquote(m.as_str()));
                items.push(match caps.name("col") {
                    Some(col) => Item::Column {
                        name: unquote(col.as_str()),
                        alias,
                    },
                    None => Item::Count { alias },
                });
            }
        }

        let mut predicates = Vec::new();
        if let Some(clause) = caps.name("where") {
            let and = compile(AND_PATTERN)?;
            let predicate = compile(PREDICATE_PATTERN)?;
            for term in and.split(clause.as_str().trim()) {
                let caps = predicate
                    .captures(term.trim())
                    .ok_or_else(|| syntax_error(&format!("unsupported predicate '{}'", term)))?;
                let col = caps.name("col").map(|m| unquote(m.as_str())).unwrap_or_default();
                let val = caps.name("val").map(|m| m.as_str().to_string()).unwrap_or_default();
                predicates.push((col, val));
            }
        }

        let limit = match caps.name("limit") {
            Some(m) => Some(
                m.as_str()
                    .parse()
                    .map_err(|_| syntax_error("LIMIT must be a number"))?,
            ),
            None => None,
        };

        Ok(Self {
            star,
            items,
            relation,
            relation_pos,
            predicates,
            group_by: caps.name("group").map(|m| unquote(m.as_str())),
            order_by: caps.name("order").map(|m| {
                let desc = caps
                    .name("dir")
                    .is_some_and(|d| d.as_str().eq_ignore_ascii_case("desc"));
                (unquote(m.as_str()), desc)
            }),
            limit,
        })
    }

    fn evaluate(
        &self,
        relation: &Relation,
        grant: &Grant,
    ) -> std::result::Result<Vec<Vec<Option<String>>>, String> {
        let visible = |column: &str| -> std::result::Result<usize, String> {
            let granted = grant
                .columns
                .as_ref()
                .is_none_or(|cols| cols.iter().any(|c| c.eq_ignore_ascii_case(column)));
            match relation.index(column) {
                Some(idx) if granted => Ok(idx),
                _ => Err(format!(
                    "COLUMN_NOT_FOUND: line 1:8: Column '{}' cannot be resolved",
                    column
                )),
            }
        };

        // Row filter first, then the WHERE clause.
        let mut rows: Vec<&Vec<String>> = relation.rows.iter().collect();
        if let Some((column, allowed)) = &grant.row_filter {
            if let Some(idx) = relation.index(column) {
                rows.retain(|row| allowed.iter().any(|v| *v == row[idx]));
            }
        }
        for (column, value) in &self.predicates {
            let idx = visible(column)?;
            rows.retain(|row| row[idx] == *value);
        }

        let (header, mut out): (Vec<String>, Vec<Vec<String>>) = if self.star {
            let idxs: Vec<usize> = relation
                .columns
                .iter()
                .enumerate()
                .filter(|(_, c)| visible(c).is_ok())
                .map(|(i, _)| i)
                .collect();
            (
                idxs.iter().map(|&i| relation.columns[i].clone()).collect(),
                rows.iter()
                    .map(|row| idxs.iter().map(|&i| row[i].clone()).collect())
                    .collect(),
            )
        } else {
            self.project(&rows, &visible)?
        };

        if let Some((column, desc)) = &self.order_by {
            let idx = header
                .iter()
                .position(|c| c.eq_ignore_ascii_case(column))
                .ok_or_else(|| {
                    format!(
                        "COLUMN_NOT_FOUND: line 1:8: Column '{}' cannot be resolved",
                        column
                    )
                })?;
            out.sort_by(|a, b| {
                let ord = compare_cells(&a[idx], &b[idx]);
                if *desc {
                    ord.reverse()
                } else {
                    ord
                }
            });
        }
        if let Some(limit) = self.limit {
            out.truncate(limit);
        }

        let mut raw = Vec::with_capacity(out.len() + 1);
        raw.push(header.into_iter().map(Some).collect());
        raw.extend(out.into_iter().map(|row| row.into_iter().map(Some).collect()));
        Ok(raw)
    }

    fn project(
        &self,
        rows: &[&Vec<String>],
        visible: &dyn Fn(&str) -> std::result::Result<usize, String>,
    ) -> std::result::Result<(Vec<String>, Vec<Vec<String>>), String> {
        let mut header = Vec::new();
        let mut sources = Vec::new();
        for (n, item) in self.items.iter().enumerate() {
            match item {
                Item::Column { name, alias } => {
                    sources.push(Some(visible(name)?));
                    header.push(alias.clone().unwrap_or_else(|| name.clone()));
                }
                Item::Count { alias } => {
                    sources.push(None);
                    header.push(alias.clone().unwrap_or_else(|| format!("_col{}", n)));
                }
            }
        }
        let has_count = sources.iter().any(Option::is_none);

        let group_idx = match &self.group_by {
            Some(column) => Some(visible(column)?),
            None => None,
        };
        for (item, source) in self.items.iter().zip(&sources) {
            if let (Item::Column { name, .. }, Some(idx)) = (item, source) {
                let grouped = group_idx == Some(*idx);
                if (has_count || group_idx.is_some()) && !grouped {
                    return Err(format!(
                        "SYNTAX_ERROR: line 1:8: '{}' must be an aggregate expression \
                         or appear in GROUP BY clause",
                        name
                    ));
                }
            }
        }

        let emit = |sample: &Vec<String>, count: usize| -> Vec<String> {
            sources
                .iter()
                .map(|source| match source {
                    Some(idx) => sample[*idx].clone(),
                    None => count.to_string(),
                })
                .collect()
        };

        let out = match group_idx {
            Some(gidx) => {
                let mut groups: Vec<(&Vec<String>, usize)> = Vec::new();
                for row in rows {
                    match groups.iter_mut().find(|(g, _)| g[gidx] == row[gidx]) {
                        Some((_, count)) => *count += 1,
                        None => groups.push((*row, 1)),
                    }
                }
                groups.into_iter().map(|(row, n)| emit(row, n)).collect()
            }
            None if has_count => {
                let empty = Vec::new();
                vec![emit(rows.first().copied().unwrap_or(&empty), rows.len())]
            }
            None => rows.iter().map(|row| emit(row, 0)).collect(),
        };
        Ok((header, out))
    }
}

/// Numeric when both cells parse as numbers, else lexical
fn compare_cells(a: &str, b: &str) -> Ordering {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
#[path = "sim_tests.rs"]
mod tests;
