/// Priority tiers for contextual recall
///
/// A tier is a set of filters plus a sort order. Recall evaluates a list of
/// tiers top to bottom and stops at the first one that matches anything, so
/// a higher tier always beats a lower one no matter how popular the lower
/// match is.

use crate::db::models::{Command, RecallByNameRequest, RecallRequest, PERSONAL_SCOPE};
use crate::core::project_detector::dir_name;
use crate::error::Result;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use tracing::debug;

/// Columns a tier may filter on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Name,
    Namespace,
    User,
    Hostname,
    Cwd,
    Scope,
}

impl Column {
    fn as_sql(self) -> &'static str {
        match self {
            Column::Name => "name",
            Column::Namespace => "namespace",
            Column::User => "user",
            Column::Hostname => "hostname",
            Column::Cwd => "cwd",
            Column::Scope => "scope",
        }
    }
}

/// One predicate of a tier
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// column = value
    Eq(Column, String),
    /// Null-safe equality: `None` only matches NULL
    Is(Column, Option<String>),
    /// column != value
    NotEq(Column, String),
    /// column contains value as a substring, ignoring ASCII case
    Contains(Column, String),
}

/// Sort keys, in the order they are applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    CreatedDesc,
    LastUsedDescNullsLast,
    UseCountDesc,
}

impl SortKey {
    fn as_sql(self) -> &'static str {
        match self {
            SortKey::CreatedDesc => "created_at DESC",
            SortKey::LastUsedDescNullsLast => "last_used_at DESC NULLS LAST",
            SortKey::UseCountDesc => "use_count DESC",
        }
    }
}

/// A single stage of a recall policy
#[derive(Debug, Clone, PartialEq)]
pub struct Tier {
    pub label: &'static str,
    pub filters: Vec<Filter>,
    pub order: Vec<SortKey>,
}

impl Tier {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            filters: Vec::new(),
            order: Vec::new(),
        }
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn order_by(mut self, keys: &[SortKey]) -> Self {
        self.order.extend_from_slice(keys);
        self
    }

    fn personal(self) -> Self {
        self.filter(Filter::Eq(Column::Scope, PERSONAL_SCOPE.to_string()))
    }

    fn shared(self) -> Self {
        self.filter(Filter::NotEq(Column::Scope, PERSONAL_SCOPE.to_string()))
    }

    /// Render as a single-row SELECT
    ///
    /// Ties left after the tier's own keys go to the newest row.
    fn build(&self) -> QueryBuilder<'static, Sqlite> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM commands WHERE 1 = 1");

        for filter in &self.filters {
            query.push(" AND ");
            match filter {
                Filter::Eq(column, value) => {
                    query.push(column.as_sql()).push(" = ").push_bind(value.clone());
                }
                Filter::Is(column, value) => {
                    query.push(column.as_sql()).push(" IS ").push_bind(value.clone());
                }
                Filter::NotEq(column, value) => {
                    query.push(column.as_sql()).push(" != ").push_bind(value.clone());
                }
                Filter::Contains(column, value) => {
                    query
                        .push("instr(lower(")
                        .push(column.as_sql())
                        .push("), lower(")
                        .push_bind(value.clone())
                        .push(")) > 0");
                }
            }
        }

        query.push(" ORDER BY ");
        for key in &self.order {
            query.push(key.as_sql()).push(", ");
        }
        query.push("id DESC LIMIT 1");

        query
    }

    /// Best row for this tier, if any
    pub async fn fetch(&self, conn: &mut SqliteConnection) -> Result<Option<Command>> {
        let mut query = self.build();
        let command = query
            .build_query_as::<Command>()
            .fetch_optional(&mut *conn)
            .await?;

        Ok(command)
    }
}

/// Evaluate tiers in order and return the first hit with its tier label
pub async fn first_match(
    conn: &mut SqliteConnection,
    tiers: &[Tier],
) -> Result<Option<(&'static str, Command)>> {
    for tier in tiers {
        if let Some(command) = tier.fetch(conn).await? {
            debug!(tier = tier.label, id = command.id, "recall tier matched");
            return Ok(Some((tier.label, command)));
        }
        debug!(tier = tier.label, "recall tier empty");
    }

    Ok(None)
}

/// Treat empty strings the same as missing values
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Tiers for recall by exact name and namespace
pub fn recall_tiers(req: &RecallRequest) -> Vec<Tier> {
    let base = |label| {
        Tier::new(label)
            .filter(Filter::Eq(Column::Name, req.name.clone()))
            .filter(Filter::Eq(Column::Namespace, req.namespace.clone()))
            .order_by(&[SortKey::CreatedDesc])
    };
    let user = || Filter::Is(Column::User, req.user.clone());
    let host = || Filter::Is(Column::Hostname, req.hostname.clone());
    let cwd = || Filter::Is(Column::Cwd, req.cwd.clone());

    vec![
        base("personal:user+host+cwd").personal().filter(user()).filter(host()).filter(cwd()),
        base("personal:user+host").personal().filter(user()).filter(host()),
        base("shared:host+cwd").shared().filter(host()).filter(cwd()),
        base("shared:host").shared().filter(host()),
        base("global"),
    ]
}

/// Tiers for recall by name alone
///
/// A tier whose inputs are missing from the request is left out entirely.
pub fn recall_by_name_tiers(req: &RecallByNameRequest) -> Vec<Tier> {
    let user = present(&req.user);
    let host = present(&req.hostname);
    let cwd = present(&req.cwd);
    let namespace = present(&req.namespace_hint);
    let scope = present(&req.scope_hint);

    let base = |label| Tier::new(label).filter(Filter::Eq(Column::Name, req.name.clone()));
    let eq = |column, value: &str| Filter::Eq(column, value.to_string());
    let recent = [SortKey::LastUsedDescNullsLast, SortKey::CreatedDesc];
    let popular = [SortKey::UseCountDesc, SortKey::LastUsedDescNullsLast];

    let mut tiers = Vec::new();

    if let (Some(u), Some(h), Some(c), Some(ns)) = (user, host, cwd, namespace) {
        tiers.push(
            base("exact-context")
                .personal()
                .filter(eq(Column::User, u))
                .filter(eq(Column::Hostname, h))
                .filter(eq(Column::Cwd, c))
                .filter(eq(Column::Namespace, ns))
                .order_by(&recent),
        );
    }

    if let (Some(u), Some(h), Some(ns)) = (user, host, namespace) {
        tiers.push(
            base("user+host+namespace")
                .personal()
                .filter(eq(Column::User, u))
                .filter(eq(Column::Hostname, h))
                .filter(eq(Column::Namespace, ns))
                .order_by(&recent),
        );
    }

    if let (Some(u), Some(h), Some(c)) = (user, host, cwd) {
        tiers.push(
            base("user+host+cwd")
                .personal()
                .filter(eq(Column::User, u))
                .filter(eq(Column::Hostname, h))
                .filter(eq(Column::Cwd, c))
                .order_by(&popular),
        );
    }

    if let (Some(u), Some(h)) = (user, host) {
        tiers.push(
            base("user+host")
                .personal()
                .filter(eq(Column::User, u))
                .filter(eq(Column::Hostname, h))
                .order_by(&popular),
        );
    }

    if let Some(c) = cwd {
        let pattern = if c.contains('/') { dir_name(c) } else { Some(c) };
        if let Some(pattern) = pattern {
            let mut tier = base("directory").filter(Filter::Contains(Column::Cwd, pattern.to_string()));
            if let Some(u) = user {
                tier = tier.filter(eq(Column::User, u));
            }
            tiers.push(tier.order_by(&[SortKey::UseCountDesc]));
        }
    }

    if let Some(ns) = namespace {
        tiers.push(
            base("namespace")
                .filter(eq(Column::Namespace, ns))
                .order_by(&[SortKey::UseCountDesc]),
        );
    }

    if let Some(s) = scope {
        tiers.push(
            base("scope")
                .filter(eq(Column::Scope, s))
                .order_by(&[SortKey::UseCountDesc]),
        );
    }

    if let Some(u) = user {
        tiers.push(
            base("user")
                .filter(eq(Column::User, u))
                .order_by(&[SortKey::UseCountDesc]),
        );
    }

    tiers.push(base("global").order_by(&popular));

    tiers
}
