//! SQL text for every catalog entry.
//!
//! These strings are the wire contract with the database: result column names
//! are consumed by downstream renderers and must stay stable. Columns of
//! catalog types (`name`, `regclass`, `numeric`) are cast in SQL so they decode
//! to plain JSON strings and numbers.

/// Indexes scanned fewer times than this are reported as unused.
pub const UNUSED_INDEX_SCAN_THRESHOLD: i64 = 1;
/// Unused indexes at or below this size are ignored.
pub const UNUSED_INDEX_MIN_BYTES: i64 = 10240;
/// `mean_exec_time` above which a statement is reported as slow.
pub const SLOW_QUERY_MEAN_MS: i64 = 100;
/// Tables with fewer dead tuples are not reported.
pub const DEAD_TUPLE_MIN: i64 = 1000;

pub const STATEMENT_STATS_EXTENSION: &str = "pg_stat_statements";

/// Bound with the extension name as `$1`.
pub const EXTENSION_INSTALLED: &str =
    "SELECT extversion::text AS version FROM pg_extension WHERE extname = $1::name";

pub const LARGEST_TABLES: &str = r#"
SELECT schemaname AS schema_name,
       tablename AS table_name,
       pg_size_pretty(total_bytes) AS total_size,
       pg_size_pretty(table_bytes) AS table_size,
       pg_size_pretty(index_bytes) AS index_size,
       pg_size_pretty(toast_bytes) AS toast_size,
       total_bytes
FROM (
    SELECT *, total_bytes - index_bytes - toast_bytes AS table_bytes
    FROM (
        SELECT n.nspname::text AS schemaname,
               c.relname::text AS tablename,
               pg_total_relation_size(c.oid) AS total_bytes,
               pg_indexes_size(c.oid) AS index_bytes,
               COALESCE(pg_total_relation_size(NULLIF(c.reltoastrelid, 0)), 0) AS toast_bytes
        FROM pg_class c
        LEFT JOIN pg_namespace n ON n.oid = c.relnamespace
        WHERE c.relkind = 'r'
          AND n.nspname NOT IN ('information_schema', 'pg_catalog')
    ) sizes
) a
ORDER BY total_bytes DESC
LIMIT 20
"#;

/// Groups indexes sharing key columns, operator classes, expressions and predicate.
pub const DUPLICATE_INDEXES: &str = r#"
SELECT indrelid::regclass::text AS table_name,
       string_agg(indexrelid::regclass::text, ', ' ORDER BY indexrelid::regclass::text) AS duplicate_indexes,
       count(*) AS index_count,
       pg_size_pretty(sum(pg_relation_size(indexrelid))) AS total_size
FROM pg_index
GROUP BY indrelid, indkey::text, indclass::text,
         COALESCE(indexprs::text, ''), COALESCE(indpred::text, '')
HAVING count(*) > 1
ORDER BY sum(pg_relation_size(indexrelid)) DESC
"#;

/// Primary keys are excluded by flag and by the `_pkey` naming convention.
pub const UNUSED_INDEXES: &str = r#"
SELECT ui.schemaname::text AS schemaname,
       ui.relname::text AS table_name,
       ui.indexrelname::text AS index_name,
       pg_size_pretty(pg_relation_size(i.indexrelid)) AS index_size,
       pg_relation_size(i.indexrelid) AS index_size_bytes,
       ui.idx_scan AS index_scans,
       i.indisunique AS is_unique,
       pg_get_indexdef(i.indexrelid) AS index_definition
FROM pg_stat_user_indexes ui
JOIN pg_index i ON ui.indexrelid = i.indexrelid
WHERE ui.idx_scan < 1
  AND pg_relation_size(i.indexrelid) > 10240
  AND NOT i.indisprimary
  AND ui.indexrelname NOT LIKE '%\_pkey'
ORDER BY pg_relation_size(i.indexrelid) DESC
"#;

/// Community table bloat estimate from column statistics.
///
/// The expected size is derived from `pg_stats` average widths and null
/// fractions; tables without statistics are reported with
/// `can_estimate = false`. Figures are approximations, not measured disk usage.
pub const TABLE_BLOAT: &str = r#"
WITH constants AS (
    SELECT current_setting('block_size')::numeric AS bs, 23 AS hdr, 8 AS ma
),
no_stats AS (
    SELECT table_schema, table_name,
           n_live_tup::numeric AS est_rows,
           pg_table_size(relid)::numeric AS table_size
    FROM information_schema.columns
    JOIN pg_stat_user_tables AS psut
      ON table_schema = psut.schemaname
     AND table_name = psut.relname
    LEFT OUTER JOIN pg_stats
      ON table_schema = pg_stats.schemaname
     AND table_name = pg_stats.tablename
     AND column_name = attname
    WHERE attname IS NULL
      AND table_schema NOT IN ('pg_catalog', 'information_schema')
    GROUP BY table_schema, table_name, relid, n_live_tup
),
null_headers AS (
    SELECT hdr + 1 + (sum(CASE WHEN null_frac <> 0 THEN 1 ELSE 0 END) / 8) AS nullhdr,
           SUM((1 - null_frac) * avg_width) AS datawidth,
           MAX(null_frac) AS maxfracsum,
           schemaname,
           tablename,
           hdr, ma, bs
    FROM pg_stats
    CROSS JOIN constants
    LEFT OUTER JOIN no_stats
      ON schemaname = no_stats.table_schema
     AND tablename = no_stats.table_name
    WHERE schemaname NOT IN ('pg_catalog', 'information_schema')
      AND no_stats.table_name IS NULL
      AND EXISTS (SELECT 1
                  FROM information_schema.columns
                  WHERE schemaname = columns.table_schema
                    AND tablename = columns.table_name)
    GROUP BY schemaname, tablename, hdr, ma, bs
),
data_headers AS (
    SELECT ma, bs, hdr, schemaname, tablename,
           (datawidth + (hdr + ma - (CASE WHEN hdr % ma = 0 THEN ma ELSE hdr % ma END)))::numeric AS datahdr,
           (maxfracsum * (nullhdr + ma - (CASE WHEN nullhdr % ma = 0 THEN ma ELSE nullhdr % ma END))) AS nullhdr2
    FROM null_headers
),
table_estimates AS (
    SELECT schemaname, tablename, bs,
           reltuples::numeric AS est_rows,
           relpages * bs AS table_bytes,
           CEIL((reltuples *
                 (datahdr + nullhdr2 + 4 + ma -
                  (CASE WHEN datahdr % ma = 0 THEN ma ELSE datahdr % ma END)
                 ) / (bs - 20))) * bs AS expected_bytes,
           reltoastrelid
    FROM data_headers
    JOIN pg_class ON tablename = relname
    JOIN pg_namespace ON relnamespace = pg_namespace.oid
     AND schemaname = nspname
    WHERE pg_class.relkind = 'r'
),
estimates_with_toast AS (
    SELECT schemaname, tablename,
           TRUE AS can_estimate,
           est_rows,
           table_bytes + (COALESCE(toast.relpages, 0) * bs) AS table_bytes,
           expected_bytes + (CEIL(COALESCE(toast.reltuples, 0) / 4) * bs) AS expected_bytes
    FROM table_estimates
    LEFT OUTER JOIN pg_class AS toast
      ON table_estimates.reltoastrelid = toast.oid
     AND toast.relkind = 't'
),
table_estimates_plus AS (
    SELECT schemaname, tablename, can_estimate,
           est_rows,
           CASE WHEN table_bytes > 0
                THEN table_bytes::numeric
                ELSE NULL::numeric END AS table_bytes,
           CASE WHEN expected_bytes > 0
                THEN expected_bytes::numeric
                ELSE NULL::numeric END AS expected_bytes,
           CASE WHEN expected_bytes > 0 AND table_bytes > 0
                 AND expected_bytes <= table_bytes
                THEN (table_bytes - expected_bytes)::numeric
                ELSE 0::numeric END AS bloat_bytes
    FROM estimates_with_toast
    UNION ALL
    SELECT table_schema, table_name, FALSE,
           est_rows, table_size,
           NULL::numeric, NULL::numeric
    FROM no_stats
),
bloat_data AS (
    SELECT current_database() AS databasename,
           schemaname, tablename, can_estimate,
           round(table_bytes / (1024 ^ 2)::numeric, 3) AS table_mb,
           round(bloat_bytes * 100 / table_bytes) AS pct_bloat,
           round(bloat_bytes / (1024::numeric ^ 2), 2) AS mb_bloat,
           est_rows
    FROM table_estimates_plus
)
SELECT databasename::text AS databasename,
       schemaname::text AS schemaname,
       tablename::text AS tablename,
       can_estimate,
       est_rows::float8 AS est_rows,
       pct_bloat::float8 AS pct_bloat,
       mb_bloat::float8 AS mb_bloat,
       table_mb::float8 AS table_mb
FROM bloat_data
WHERE (pct_bloat >= 50 AND mb_bloat >= 20)
   OR (pct_bloat >= 25 AND mb_bloat >= 1000)
ORDER BY pct_bloat DESC
"#;

/// Index bloat heuristic: relation size minus `idx_tup_read * idx_scan`.
///
/// This is a rough signal for "large but rarely useful" indexes rather than a
/// page-level measurement. The product is computed in `numeric` so busy
/// indexes cannot overflow `bigint`.
pub const INDEX_BLOAT: &str = r#"
WITH index_stats AS (
    SELECT current_database() AS database_name,
           ns.nspname AS schema_name,
           ui.relname AS table_name,
           ic.relname AS index_name,
           pg_relation_size(ic.oid) AS index_size_bytes,
           COALESCE(ui.idx_tup_read, 0) AS estimated_row_count,
           pg_relation_size(ic.oid)::numeric
             - COALESCE(NULLIF(ui.idx_tup_read, 0)::numeric * NULLIF(ui.idx_scan, 1)::numeric, 0)
             AS estimated_bloat_bytes
    FROM pg_class ic
    JOIN pg_namespace ns ON ic.relnamespace = ns.oid
    JOIN pg_index idx ON ic.oid = idx.indexrelid
    JOIN pg_stat_user_indexes ui ON ic.oid = ui.indexrelid
    WHERE ic.relkind = 'i'
      AND ns.nspname NOT IN ('information_schema', 'pg_catalog', 'pg_toast')
)
SELECT database_name::text AS database_name,
       schema_name::text AS schema_name,
       table_name::text AS table_name,
       index_name::text AS index_name,
       CASE WHEN index_size_bytes > estimated_bloat_bytes THEN 'y' ELSE 'n' END AS can_estimate_bloat,
       estimated_row_count,
       round(100 * GREATEST(estimated_bloat_bytes, 0) / NULLIF(index_size_bytes, 0)::numeric, 2)::float8
         AS index_bloat_percent,
       pg_size_pretty(GREATEST(estimated_bloat_bytes, 0)) AS index_bloat_size,
       pg_size_pretty(index_size_bytes) AS index_size
FROM index_stats
WHERE index_size_bytes > estimated_bloat_bytes
ORDER BY schema_name, index_name
"#;

pub const DEAD_TUPLES: &str = r#"
SELECT schemaname::text AS schemaname,
       relname::text AS tablename,
       n_dead_tup,
       n_live_tup,
       CASE WHEN n_live_tup + n_dead_tup > 0
            THEN round(100.0 * n_dead_tup / (n_live_tup + n_dead_tup), 2)::float8
            ELSE 0 END AS dead_tuple_percent,
       pg_size_pretty(pg_total_relation_size(relid)) AS table_size,
       last_vacuum,
       last_autovacuum
FROM pg_stat_user_tables
WHERE n_dead_tup > 1000
ORDER BY dead_tuple_percent DESC, n_dead_tup DESC
LIMIT 20
"#;

pub const SLOW_QUERIES: &str = r#"
SELECT left(query, 300) AS query,
       calls,
       round(total_exec_time::numeric, 2)::float8 AS total_exec_time,
       round(mean_exec_time::numeric, 2)::float8 AS mean_exec_time,
       rows
FROM pg_stat_statements
WHERE mean_exec_time > 100
ORDER BY 3 DESC
LIMIT 20
"#;

pub const TOP_QUERIES: &str = r#"
SELECT left(query, 200) AS query,
       calls,
       round(total_exec_time::numeric, 2)::float8 AS total_exec_time,
       round(mean_exec_time::numeric, 2)::float8 AS mean_exec_time,
       rows,
       round((100.0 * shared_blks_hit / NULLIF(shared_blks_hit + shared_blks_read, 0))::numeric, 2)::float8
         AS hit_percent
FROM pg_stat_statements
WHERE query NOT LIKE '%pg_stat_statements%'
ORDER BY 3 DESC
LIMIT 10
"#;

/// Lock-wait self-join matching every lock-target field.
///
/// A backend never blocks itself, and one waiter can match several granted
/// locks of the same holder, so self pairs are filtered and pairs de-duplicated.
pub const BLOCKING_QUERIES: &str = r#"
SELECT DISTINCT
       blocked_locks.pid AS blocked_pid,
       blocked_activity.usename::text AS blocked_user,
       left(blocked_activity.query, 200) AS blocked_query,
       blocking_locks.pid AS blocking_pid,
       blocking_activity.usename::text AS blocking_user,
       left(blocking_activity.query, 200) AS blocking_query,
       round(EXTRACT(EPOCH FROM (now() - blocked_activity.query_start))::numeric, 1)::float8
         AS blocked_duration_seconds
FROM pg_catalog.pg_locks blocked_locks
JOIN pg_catalog.pg_stat_activity blocked_activity
  ON blocked_activity.pid = blocked_locks.pid
JOIN pg_catalog.pg_locks blocking_locks
  ON blocking_locks.locktype = blocked_locks.locktype
 AND blocking_locks.database IS NOT DISTINCT FROM blocked_locks.database
 AND blocking_locks.relation IS NOT DISTINCT FROM blocked_locks.relation
 AND blocking_locks.page IS NOT DISTINCT FROM blocked_locks.page
 AND blocking_locks.tuple IS NOT DISTINCT FROM blocked_locks.tuple
 AND blocking_locks.virtualxid IS NOT DISTINCT FROM blocked_locks.virtualxid
 AND blocking_locks.transactionid IS NOT DISTINCT FROM blocked_locks.transactionid
 AND blocking_locks.classid IS NOT DISTINCT FROM blocked_locks.classid
 AND blocking_locks.objid IS NOT DISTINCT FROM blocked_locks.objid
 AND blocking_locks.objsubid IS NOT DISTINCT FROM blocked_locks.objsubid
 AND blocking_locks.pid <> blocked_locks.pid
JOIN pg_catalog.pg_stat_activity blocking_activity
  ON blocking_activity.pid = blocking_locks.pid
WHERE NOT blocked_locks.granted
  AND blocking_locks.granted
ORDER BY blocked_duration_seconds DESC NULLS LAST, blocked_pid, blocking_pid
LIMIT 20
"#;

pub const ACTIVE_SESSIONS: &str = r#"
SELECT pid,
       usename::text AS usename,
       application_name,
       COALESCE(client_addr::text, 'local') AS client_addr,
       state,
       wait_event_type,
       wait_event,
       round(EXTRACT(EPOCH FROM (now() - query_start))::numeric, 1)::float8 AS duration_seconds,
       left(query, 200) AS query
FROM pg_stat_activity
WHERE state <> 'idle'
  AND pid <> pg_backend_pid()
ORDER BY query_start DESC
LIMIT 20
"#;

pub const TABLE_STATS: &str = r#"
SELECT schemaname::text AS schemaname,
       relname::text AS tablename,
       n_live_tup,
       seq_scan,
       idx_scan,
       CASE WHEN seq_scan + COALESCE(idx_scan, 0) > 0
            THEN round((100.0 * seq_scan / (seq_scan + COALESCE(idx_scan, 0)))::numeric, 2)::float8
            ELSE 0 END AS seq_scan_ratio
FROM pg_stat_user_tables
ORDER BY seq_scan DESC
LIMIT 20
"#;

pub const INDEX_USAGE: &str = r#"
SELECT schemaname::text AS schemaname,
       relname::text AS tablename,
       indexrelname::text AS indexname,
       idx_scan,
       idx_tup_read,
       idx_tup_fetch,
       pg_size_pretty(pg_relation_size(indexrelid)) AS index_size
FROM pg_stat_user_indexes
ORDER BY idx_scan ASC
LIMIT 50
"#;

pub const MISSING_INDEX_CANDIDATES: &str = r#"
SELECT schemaname::text AS schemaname,
       relname::text AS tablename,
       seq_scan,
       idx_scan,
       n_live_tup,
       'Consider adding an index to ' || schemaname || '.' || relname
         || ' - high sequential scans' AS recommendation
FROM pg_stat_user_tables
WHERE seq_scan > COALESCE(idx_scan, 0)
  AND seq_scan > 100
ORDER BY seq_scan DESC
LIMIT 10
"#;

pub const BUFFER_CACHE_HIT_RATIO: &str = r#"
SELECT COALESCE(sum(heap_blks_hit), 0)::bigint AS heap_blocks_hit,
       COALESCE(sum(heap_blks_read), 0)::bigint AS heap_blocks_read,
       COALESCE(round(sum(heap_blks_hit) * 100.0
                      / NULLIF(sum(heap_blks_hit) + sum(heap_blks_read), 0), 2), 0)::float8
         AS hit_ratio_percent
FROM pg_statio_user_tables
"#;

pub const WAIT_EVENTS: &str = r#"
SELECT wait_event_type,
       wait_event,
       count(*) AS session_count
FROM pg_stat_activity
WHERE wait_event IS NOT NULL
  AND state = 'active'
GROUP BY wait_event_type, wait_event
ORDER BY session_count DESC
"#;

pub const CONNECTIONS_BY_APPLICATION: &str = r#"
SELECT COALESCE(NULLIF(application_name, ''), 'unknown') AS application_name,
       count(*) AS total_connections,
       count(*) FILTER (WHERE state = 'active') AS active_connections,
       count(*) FILTER (WHERE state = 'idle') AS idle_connections
FROM pg_stat_activity
WHERE pid <> pg_backend_pid()
  AND backend_type = 'client backend'
GROUP BY 1
ORDER BY total_connections DESC
"#;

pub const SCHEMAS: &str = r#"
SELECT schema_name::text AS schema_name
FROM information_schema.schemata
WHERE schema_name NOT IN ('information_schema', 'pg_catalog')
  AND schema_name NOT LIKE 'pg\_toast%'
  AND schema_name NOT LIKE 'pg\_temp\_%'
ORDER BY schema_name
"#;

pub const TABLES: &str = r#"
SELECT table_schema::text AS table_schema,
       table_name::text AS table_name,
       table_type::text AS table_type
FROM information_schema.tables
WHERE table_schema NOT IN ('information_schema', 'pg_catalog')
ORDER BY table_schema, table_name
"#;

pub const SERVER_INFO: &str = r#"
SELECT version() AS version,
       current_database()::text AS database,
       current_user::text AS "user"
"#;
