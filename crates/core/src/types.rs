/// Row ids for configs, templates and users are PostgreSQL BIGSERIAL.
pub type DbId = i64;

/// Created/updated/archived timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
