//! A pure function mapping (schema, operation) -> prepared SQL text.
//!
//! `Plans` holds no connection and no state beyond the five strings it
//! computes once, at executor construction, rather than re-formatting them
//! per request.

/// Prepared SQL text for the five named operations the storage layer must
/// support: `fetchNextJob`, `expireJob`, `insertJob`, `completeJob`,
/// `cancelJob`.
#[derive(Debug, Clone)]
pub struct Plans {
    pub table: String,
    pub fetch_next_job: String,
    pub expire_job: String,
    pub insert_job: String,
    pub complete_job: String,
    pub cancel_job: String,
}

impl Plans {
    /// The schema-qualified table name these plans operate on.
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Build the plan set for a given schema. `schema` becomes the table
    /// name prefix (`"{schema}_jobs"`), so a single database can host more
    /// than one queue's tables side by side, the Rust-native analogue of
    /// a dedicated Postgres schema.
    pub fn new(schema: &str) -> Self {
        let table = format!("{schema}_jobs");
        Self {
            fetch_next_job: format!(
                "UPDATE {table}
                 SET state = 'active', started_at = ?1
                 WHERE id = (
                     SELECT id FROM {table}
                     WHERE name = ?2
                       AND state IN ('created', 'retry', 'expired')
                       AND start_after <= ?3
                     ORDER BY created_at ASC
                     LIMIT 1
                 )
                 RETURNING *"
            ),
            expire_job: format!(
                "UPDATE {table}
                 SET state = 'expired'
                 WHERE state = 'active'
                   AND started_at IS NOT NULL
                   AND ?1 >= started_at + expire_in_seconds"
            ),
            insert_job: format!(
                "INSERT INTO {table}
                     (id, name, data, state, retry_limit, retry_count,
                      start_after, expire_in_seconds, singleton_key,
                      singleton_on, created_at)
                 SELECT ?1, ?2, ?3, 'created', ?4, 0, ?5, ?6, ?7, ?8, ?9
                 WHERE ?7 IS NULL OR NOT EXISTS (
                     SELECT 1 FROM {table}
                     WHERE name = ?10
                       AND singleton_key = ?11
                       AND singleton_on = ?12
                       AND state NOT IN ('completed', 'cancelled')
                 )
                 RETURNING id"
            ),
            complete_job: format!(
                "UPDATE {table}
                 SET state = 'completed', completed_at = ?2
                 WHERE id = ?1 AND state NOT IN ('completed', 'cancelled')"
            ),
            cancel_job: format!(
                "UPDATE {table}
                 SET state = 'cancelled', completed_at = ?2
                 WHERE id = ?1 AND state NOT IN ('completed', 'cancelled')"
            ),
            table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualifies_table_with_schema() {
        let plans = Plans::new("pgq");
        assert!(plans.fetch_next_job.contains("pgq_jobs"));
        assert!(plans.expire_job.contains("pgq_jobs"));
        assert!(plans.insert_job.contains("pgq_jobs"));
        assert!(plans.complete_job.contains("pgq_jobs"));
        assert!(plans.cancel_job.contains("pgq_jobs"));
    }

    #[test]
    fn distinct_schemas_produce_distinct_tables() {
        let a = Plans::new("alpha");
        let b = Plans::new("beta");
        assert!(a.insert_job.contains("alpha_jobs"));
        assert!(b.insert_job.contains("beta_jobs"));
        assert_ne!(a.insert_job, b.insert_job);
    }
}
