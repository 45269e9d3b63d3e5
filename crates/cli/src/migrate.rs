//! Migration driver: version check, imports or bulk delete, final count.
//!
//! Fatal: anything that stops us confirming the server (client build,
//! version fetch, listing) and any input or file-system error.
//! Non-fatal: individual create/delete requests. Their response is printed
//! whatever the status and the pass moves on. No retries, no rollback.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use bhmigrate_api_client::{Client, ClientError, NewSavedQuery};

use crate::legacy;
use crate::CliError;

/// What to do in one invocation.
#[derive(Debug, Clone)]
pub struct MigrateOptions {
    /// Legacy export to transform and import.
    pub legacy_file: Option<PathBuf>,
    /// New-format `[{name, query}]` file to import as-is.
    pub new_file: Option<PathBuf>,
    /// Delete every saved query. Suppresses both imports.
    pub delete_all: bool,
    /// Pause after each create request.
    pub delay: Duration,
    /// Where the transformed legacy records are staged.
    pub work_file: PathBuf,
}

/// Outcome counts for one import pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    pub rejected: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Map a client error from a step that must succeed.
pub fn connect_error(err: ClientError) -> CliError {
    let base = match &err {
        ClientError::Encode(_) => CliError::error(err.to_string()),
        _ => CliError::connect(err.to_string()),
    };
    match &err {
        ClientError::Http(401, _) | ClientError::Http(403, _) => {
            base.with_hint("check BHE_TOKEN_ID and BHE_TOKEN_KEY")
        }
        ClientError::Network(_) | ClientError::Build(_) => {
            base.with_hint("check BHE_SCHEME, BHE_DOMAIN and BHE_PORT")
        }
        _ => base,
    }
}

fn write_error(e: std::io::Error) -> CliError {
    CliError::io(format!("cannot write output: {}", e))
}

/// Run one migration. Returns the number of saved queries left on the server.
pub fn run(client: &Client, opts: &MigrateOptions, out: &mut impl Write) -> Result<usize, CliError> {
    let version = client.get_version().map_err(connect_error)?;
    tracing::debug!(api = %version.api_version, server = %version.server_version, "server reachable");
    writeln!(
        out,
        "\nAPI version: {} - Server version: {}",
        version.api_version, version.server_version,
    )
    .map_err(write_error)?;

    if opts.delete_all {
        if opts.legacy_file.is_some() || opts.new_file.is_some() {
            tracing::warn!("--delete given together with an import; imports skipped");
        }
        writeln!(out, "\nDeleting all saved queries...").map_err(write_error)?;
        delete_all_saved_queries(client)?;
    } else {
        if let Some(path) = &opts.legacy_file {
            import_legacy(client, path, &opts.work_file, opts.delay, out)?;
        }
        if let Some(path) = &opts.new_file {
            writeln!(out, "\nImporting new queries...").map_err(write_error)?;
            import_new(client, path, opts.delay, out)?;
        }
    }

    let count = client.list_saved_queries().map_err(connect_error)?.len();
    writeln!(out, "\nTotal saved queries: {}", count).map_err(write_error)?;
    Ok(count)
}

/// Transform a legacy export, stage it in `work_file`, import every
/// non-banner record, then remove `work_file`.
pub fn import_legacy(
    client: &Client,
    source: &Path,
    work_file: &Path,
    delay: Duration,
    out: &mut impl Write,
) -> Result<ImportSummary, CliError> {
    let export = legacy::load_legacy_export(source)?;
    let records = legacy::transform(&export)?;
    legacy::write_work_file(work_file, &records)?;

    let records = legacy::read_work_file(work_file)?;
    let mut summary = ImportSummary::default();

    for (i, record) in records.iter().enumerate() {
        writeln!(out, "\n\n[{}]", i).map_err(write_error)?;
        if record.is_category_header() {
            tracing::debug!(name = %record.name, "skipping category banner");
            summary.skipped += 1;
            continue;
        }
        create_one(client, &record.to_saved_query(), &mut summary, out)?;
        thread::sleep(delay);
    }

    legacy::remove_work_file(work_file)?;
    log_summary("legacy", &summary);
    Ok(summary)
}

/// Import a new-format file as-is. No transform, no banner filtering.
pub fn import_new(
    client: &Client,
    source: &Path,
    delay: Duration,
    out: &mut impl Write,
) -> Result<ImportSummary, CliError> {
    let queries = legacy::load_new_queries(source)?;
    let mut summary = ImportSummary::default();

    for (i, query) in queries.iter().enumerate() {
        writeln!(out, "\n\n[{}]", i).map_err(write_error)?;
        create_one(client, query, &mut summary, out)?;
        thread::sleep(delay);
    }

    log_summary("new-format", &summary);
    Ok(summary)
}

fn create_one(
    client: &Client,
    query: &NewSavedQuery,
    summary: &mut ImportSummary,
    out: &mut impl Write,
) -> Result<(), CliError> {
    writeln!(out, "{}", query.name).map_err(write_error)?;
    writeln!(out, "{}", query.query).map_err(write_error)?;

    match client.create_saved_query(query) {
        Ok(resp) => {
            writeln!(out, "\n{}", resp.text()).map_err(write_error)?;
            if resp.is_success() {
                summary.created += 1;
            } else {
                tracing::warn!(name = %query.name, status = resp.status, "server rejected saved query");
                summary.rejected += 1;
            }
        }
        Err(e) => {
            tracing::warn!(name = %query.name, error = %e, "create request failed");
            writeln!(out, "\n{}", e).map_err(write_error)?;
            summary.failed += 1;
        }
    }
    Ok(())
}

fn log_summary(kind: &str, summary: &ImportSummary) {
    tracing::info!(
        kind,
        created = summary.created,
        rejected = summary.rejected,
        failed = summary.failed,
        skipped = summary.skipped,
        "import pass finished"
    );
}

/// List, then delete each saved query in order. Returns how many deletes
/// the server accepted.
pub fn delete_all_saved_queries(client: &Client) -> Result<usize, CliError> {
    let queries = client.list_saved_queries().map_err(connect_error)?;
    let mut deleted = 0;

    for query in &queries {
        match client.delete_saved_query(&query.id) {
            Ok(resp) if resp.is_success() => deleted += 1,
            Ok(resp) => {
                tracing::warn!(id = %query.id, status = resp.status, "delete rejected");
            }
            Err(e) => {
                tracing::warn!(id = %query.id, error = %e, "delete request failed");
            }
        }
    }

    tracing::info!(listed = queries.len(), deleted, "delete pass finished");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bhmigrate_api_client::Credentials;
    use httpmock::prelude::*;
    use serde_json::json;

    use crate::exit_codes::{EXIT_CONNECT, EXIT_ERROR, EXIT_INPUT};

    fn client(server: &MockServer) -> Client {
        Client::new("http", server.host(), server.port(), Credentials::new("tid", "secret")).unwrap()
    }

    fn mock_version(server: &MockServer) -> httpmock::Mock<'_> {
        server.mock(|when, then| {
            when.method(GET).path("/api/version");
            then.status(200).json_body(json!({
                "data": { "API": { "current_version": "v2" }, "server_version": "v5.8.1" }
            }));
        })
    }

    fn mock_list(server: &MockServer, data: serde_json::Value) -> httpmock::Mock<'_> {
        server.mock(|when, then| {
            when.method(GET).path("/api/v2/saved-queries");
            then.status(200).json_body(json!({ "data": data }));
        })
    }

    fn options(dir: &Path) -> MigrateOptions {
        MigrateOptions {
            legacy_file: None,
            new_file: None,
            delete_all: false,
            delay: Duration::ZERO,
            work_file: dir.join(legacy::DEFAULT_WORK_FILE),
        }
    }

    fn write_legacy(dir: &Path) -> PathBuf {
        let path = dir.join(legacy::DEFAULT_LEGACY_FILE);
        let export = json!({
            "queries": [
                { "name": "-------------- Domain --------------", "category": "Domain",
                  "queryList": [ { "final": true, "query": "" } ] },
                { "name": "All Domain Admins", "category": "Domain",
                  "queryList": [ { "final": true, "query": "MATCH (g:Group) RETURN g" },
                                 { "final": false, "query": "IGNORED" } ] },
                { "name": "Kerberoastable", "category": "Kerberos",
                  "queryList": [ { "final": true, "query": "MATCH (u:User {hasspn:true}) RETURN u" } ] }
            ]
        });
        std::fs::write(&path, export.to_string()).unwrap();
        path
    }

    #[test]
    fn test_legacy_import_posts_records_and_removes_work_file() {
        let server = MockServer::start();
        mock_version(&server);
        let list = mock_list(&server, json!([{ "id": 1 }, { "id": 2 }]));
        let admins = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v2/saved-queries")
                .header_exists("signature")
                .json_body(json!({ "name": "Domain - All Domain Admins", "query": "MATCH (g:Group) RETURN g" }));
            then.status(201).body(r#"{"data":{"id":1}}"#);
        });
        let kerb = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v2/saved-queries")
                .json_body(json!({ "name": "Kerberos - Kerberoastable", "query": "MATCH (u:User {hasspn:true}) RETURN u" }));
            then.status(201).body(r#"{"data":{"id":2}}"#);
        });
        let banner = server.mock(|when, then| {
            when.method(POST).path("/api/v2/saved-queries").body_includes("--------------");
            then.status(201);
        });

        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path());
        opts.legacy_file = Some(write_legacy(dir.path()));

        let mut out = Vec::new();
        let count = run(&client(&server), &opts, &mut out).unwrap();

        admins.assert();
        kerb.assert();
        banner.assert_calls(0);
        list.assert();
        assert_eq!(count, 2);
        assert!(!opts.work_file.exists(), "intermediate file left behind");

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("API version: v2 - Server version: v5.8.1"));
        assert!(printed.contains("[0]"));
        assert!(printed.contains("Domain - All Domain Admins"));
        assert!(printed.contains(r#"{"data":{"id":2}}"#));
        assert!(printed.contains("Total saved queries: 2"));
    }

    #[test]
    fn test_legacy_import_continues_after_rejection() {
        let server = MockServer::start();
        let creates = server.mock(|when, then| {
            when.method(POST).path("/api/v2/saved-queries");
            then.status(500).body("internal error");
        });

        let dir = tempfile::tempdir().unwrap();
        let source = write_legacy(dir.path());
        let work_file = dir.path().join(legacy::DEFAULT_WORK_FILE);

        let mut out = Vec::new();
        let summary =
            import_legacy(&client(&server), &source, &work_file, Duration::ZERO, &mut out).unwrap();

        creates.assert_calls(2);
        assert_eq!(summary, ImportSummary { created: 0, rejected: 2, failed: 0, skipped: 1 });
        assert!(!work_file.exists());
        assert!(String::from_utf8(out).unwrap().contains("internal error"));
    }

    #[test]
    fn test_malformed_legacy_is_fatal_before_any_post() {
        let server = MockServer::start();
        mock_version(&server);
        let creates = server.mock(|when, then| {
            when.method(POST).path("/api/v2/saved-queries");
            then.status(201);
        });

        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("broken.json");
        std::fs::write(&source, r#"{"queries":[{"name":"x","category":"c","queryList":[]}]}"#).unwrap();
        let mut opts = options(dir.path());
        opts.legacy_file = Some(source);

        let err = run(&client(&server), &opts, &mut Vec::new()).unwrap_err();

        assert_eq!(err.code, EXIT_INPUT);
        creates.assert_calls(0);
        assert!(!opts.work_file.exists());
    }

    #[test]
    fn test_new_format_import_posts_as_is() {
        let server = MockServer::start();
        let banner = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v2/saved-queries")
                .json_body(json!({ "name": "-------------- kept --------------", "query": "MATCH (n) RETURN n" }));
            then.status(201).body("{}");
        });
        let plain = server.mock(|when, then| {
            when.method(POST)
                .path("/api/v2/saved-queries")
                .json_body(json!({ "name": "Owned", "query": "MATCH (u {owned:true}) RETURN u" }));
            then.status(201).body("{}");
        });

        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join(legacy::DEFAULT_NEW_FILE);
        std::fs::write(
            &source,
            json!([
                { "name": "-------------- kept --------------", "query": "MATCH (n) RETURN n" },
                { "name": "Owned", "query": "MATCH (u {owned:true}) RETURN u" }
            ])
            .to_string(),
        )
        .unwrap();

        let summary = import_new(&client(&server), &source, Duration::ZERO, &mut Vec::new()).unwrap();

        banner.assert();
        plain.assert();
        assert_eq!(summary.created, 2);
        assert_eq!(summary.skipped, 0);
    }

    #[test]
    fn test_delete_all() {
        let server = MockServer::start();
        mock_version(&server);
        let list = mock_list(&server, json!([
            { "id": 11, "name": "a", "query": "q" },
            { "id": 12, "name": "b", "query": "q" }
        ]));
        let del_11 = server.mock(|when, then| {
            when.method(DELETE).path("/api/v2/saved-queries/11");
            then.status(204);
        });
        let del_12 = server.mock(|when, then| {
            when.method(DELETE).path("/api/v2/saved-queries/12");
            then.status(404).body("not found");
        });

        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path());
        opts.delete_all = true;

        let mut out = Vec::new();
        run(&client(&server), &opts, &mut out).unwrap();

        del_11.assert();
        del_12.assert();
        // once for the delete pass, once for the final count
        list.assert_calls(2);
        assert!(String::from_utf8(out).unwrap().contains("Deleting all saved queries..."));
    }

    #[test]
    fn test_delete_suppresses_imports() {
        let server = MockServer::start();
        mock_version(&server);
        mock_list(&server, json!([]));
        let creates = server.mock(|when, then| {
            when.method(POST).path("/api/v2/saved-queries");
            then.status(201);
        });

        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path());
        opts.legacy_file = Some(write_legacy(dir.path()));
        opts.new_file = Some(dir.path().join("never-read.json"));
        opts.delete_all = true;

        let count = run(&client(&server), &opts, &mut Vec::new()).unwrap();

        creates.assert_calls(0);
        assert_eq!(count, 0);
        assert!(!opts.work_file.exists());
    }

    #[test]
    fn test_connect_error_codes_and_hints() {
        let auth = connect_error(ClientError::Http(403, "forbidden".into()));
        assert_eq!(auth.code, EXIT_CONNECT);
        assert!(auth.hint.unwrap().contains("BHE_TOKEN_ID"));

        let net = connect_error(ClientError::Network("connection refused".into()));
        assert_eq!(net.code, EXIT_CONNECT);
        assert!(net.hint.unwrap().contains("BHE_PORT"));

        let shape = connect_error(ClientError::MalformedResponse("missing data".into()));
        assert_eq!(shape.code, EXIT_CONNECT);
        assert!(shape.hint.is_none());

        let encode = connect_error(ClientError::Encode("bad".into()));
        assert_eq!(encode.code, EXIT_ERROR);
        assert!(encode.message.contains("failed to encode"), "{}", encode.message);
    }

    #[test]
    fn test_version_failure_is_fatal() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/version");
            then.status(401).body("bad signature");
        });
        let list = mock_list(&server, json!([]));

        let dir = tempfile::tempdir().unwrap();
        let mut opts = options(dir.path());
        opts.delete_all = true;

        let err = run(&client(&server), &opts, &mut Vec::new()).unwrap_err();

        assert_eq!(err.code, EXIT_CONNECT);
        assert!(err.message.contains("401"), "{}", err.message);
        assert!(err.hint.unwrap().contains("BHE_TOKEN_KEY"));
        list.assert_calls(0);
    }

    #[test]
    fn test_network_failure_during_create_is_not_fatal() {
        // Nothing listens on port 1
        let dead = Client::new("http", "127.0.0.1", 1, Credentials::new("t", "k")).unwrap();
        let query = NewSavedQuery { name: "n".into(), query: "q".into() };

        let mut summary = ImportSummary::default();
        let mut out = Vec::new();
        create_one(&dead, &query, &mut summary, &mut out).unwrap();

        assert_eq!(summary.failed, 1);
        assert!(String::from_utf8(out).unwrap().contains("network error"));
    }
}
