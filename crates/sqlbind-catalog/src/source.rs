//! Schema acquisition
//!
//! The engine consumes a normalized in-memory snapshot regardless of where it
//! came from: a live database introspection, a DDL file, or a test fixture.
//! Acquisition is the one operation allowed to block, so it runs under a
//! deadline; inference is impossible without a schema, which makes expiry a
//! run-fatal error.

use crate::SchemaSnapshot;
use sqlbind_common::{Error, Result};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::debug;

/// Anything that can produce a schema snapshot.
///
/// Implementations own their transport (database client, file read); the
/// engine only ever sees the normalized result.
pub trait SchemaSource: Send {
    fn load(&self) -> Result<SchemaSnapshot>;
}

/// A source backed by static `CREATE TABLE` DDL text.
pub struct DdlSource {
    ddl: String,
}

impl DdlSource {
    pub fn new(ddl: impl Into<String>) -> Self {
        DdlSource { ddl: ddl.into() }
    }

    /// Read the DDL from a file path.
    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        let ddl = std::fs::read_to_string(path).map_err(|e| Error::Io(e.to_string()))?;
        Ok(DdlSource::new(ddl))
    }
}

impl SchemaSource for DdlSource {
    fn load(&self) -> Result<SchemaSnapshot> {
        SchemaSnapshot::from_ddl(&self.ddl)
    }
}

/// Load a snapshot with a deadline. On expiry the loader thread is abandoned
/// and the run fails with [`Error::SchemaTimeout`].
pub fn load_with_timeout<S>(source: S, timeout: Duration) -> Result<SchemaSnapshot>
where
    S: SchemaSource + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // The receiver may be gone if the deadline already expired.
        let _ = tx.send(source.load());
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => {
            let snapshot = result?;
            debug!(
                tables = snapshot.table_count(),
                version = snapshot.version(),
                "schema snapshot loaded"
            );
            Ok(snapshot)
        }
        Err(_) => Err(Error::SchemaTimeout(timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowSource(Duration);

    impl SchemaSource for SlowSource {
        fn load(&self) -> Result<SchemaSnapshot> {
            thread::sleep(self.0);
            SchemaSnapshot::from_ddl("CREATE TABLE t (id INT NOT NULL);")
        }
    }

    #[test]
    fn test_load_within_deadline() {
        let snapshot = load_with_timeout(
            DdlSource::new("CREATE TABLE t (id INT NOT NULL);"),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(snapshot.table_count(), 1);
    }

    #[test]
    fn test_expired_deadline_is_fatal() {
        let err = load_with_timeout(
            SlowSource(Duration::from_millis(500)),
            Duration::from_millis(20),
        )
        .unwrap_err();
        assert_eq!(err, Error::SchemaTimeout(Duration::from_millis(20)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_ddl_source_from_path() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "CREATE TABLE t (id INT NOT NULL);").unwrap();
        let source = DdlSource::from_path(file.path()).unwrap();
        assert_eq!(source.load().unwrap().table_count(), 1);
    }

    #[test]
    fn test_source_errors_propagate() {
        let err = load_with_timeout(DdlSource::new("CREATE ("), Duration::from_secs(5))
            .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }
}
