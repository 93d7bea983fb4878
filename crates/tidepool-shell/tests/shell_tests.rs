//! End-to-end tests: engine + rewrite + interpreter over the in-memory
//! data service, observed through a recording display.

use std::rc::Rc;
use std::sync::Arc;

use serde_json::json;
use tidepool_shell::{
    EngineError, MemoryDataService, RecordingDisplay, ShellConfig, ShellEngine, ShellId,
    StatementOutcome, SubmissionReport,
};

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

struct Harness {
    engine: ShellEngine,
    service: Arc<MemoryDataService>,
}

fn harness_with(config: ShellConfig) -> Harness {
    let service = Arc::new(MemoryDataService::new());
    let engine = ShellEngine::new(config, service.clone());
    Harness { engine, service }
}

fn harness() -> Harness {
    harness_with(ShellConfig::default())
}

impl Harness {
    fn shell(&mut self) -> (ShellId, RecordingDisplay) {
        let display = RecordingDisplay::new();
        let id = self
            .engine
            .create_shell(Rc::new(display.clone()))
            .expect("shell creation should succeed");
        (id, display)
    }

    fn submit(&mut self, id: ShellId, raw: &str) -> SubmissionReport {
        self.engine.handle_submission(id, raw).expect("shell should be registered")
    }
}

fn rewritten_of(report: SubmissionReport) -> String {
    match report {
        SubmissionReport::Evaluated { rewritten, .. } => rewritten,
        other => panic!("expected an evaluated submission, got {other:?}"),
    }
}

// ─────────────────────────────────────────────────────────────────────
// Namespace virtualization
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_var_declaration_lands_in_the_session_namespace() {
    let mut h = harness();
    let (id, display) = h.shell();
    let rewritten = rewritten_of(h.submit(id, "var x = 5;"));
    assert_eq!(rewritten, "(function () { tidepool.shells[0].vars.x = 5; }()); ");
    // The wrapper yields undefined, so declaring prints nothing.
    assert_eq!(display.lines(), vec!["var x = 5;"]);

    display.clear();
    h.submit(id, "x + 1");
    assert_eq!(display.lines(), vec!["x + 1", "6"]);
}

#[test]
fn test_unknown_names_read_as_undefined() {
    // Free identifiers become namespace member reads, so a name the
    // session never defined is undefined rather than an error.
    let mut h = harness();
    let (id, display) = h.shell();
    h.submit(id, "ghost");
    assert_eq!(display.lines(), vec!["ghost"]);
}

#[test]
fn test_function_declaration_binds_in_the_namespace() {
    let mut h = harness();
    let (id, display) = h.shell();
    h.submit(id, "function double(n) { return n * 2; }");
    // The declaration becomes an assignment, and assignments print
    // their value: the function's own source text.
    assert_eq!(
        display.lines(),
        vec![
            "function double(n) { return n * 2; }",
            "function (n) { return n * 2; }",
        ]
    );

    display.clear();
    h.submit(id, "double(21)");
    assert_eq!(display.lines(), vec!["double(21)", "42"]);
}

#[test]
fn test_function_locals_survive_rewriting() {
    let mut h = harness();
    let (id, display) = h.shell();
    let rewritten = rewritten_of(h.submit(
        id,
        "function tally(list) { var total = 0; \
         for (var i = 0; i < list.length; i += 1) { total += list[i]; } \
         return total; }",
    ));
    assert!(rewritten.contains("function (list)"));
    assert!(rewritten.contains("var total = 0;"));
    assert!(rewritten.contains("var i = 0"));
    assert!(!rewritten.contains("vars.total"));

    display.clear();
    h.submit(id, "tally([1, 2, 3])");
    assert_eq!(display.lines(), vec!["tally([1, 2, 3])", "6"]);
}

#[test]
fn test_for_loop_header_declaration_stays_loop_legal() {
    let mut h = harness();
    let (id, display) = h.shell();
    let rewritten = rewritten_of(h.submit(id, "var i = 1; for (var i = 0; i < 3; i++) {}"));
    // The statement form carries its own separator, the header form
    // must not, or the loop would gain a fourth clause.
    assert!(rewritten.starts_with("(function () { tidepool.shells[0].vars.i = 1; }()); "));
    assert!(rewritten.contains("for ((function () { tidepool.shells[0].vars.i = 0; }()); "));

    display.clear();
    h.submit(id, "i");
    assert_eq!(display.lines(), vec!["i", "3"]);
}

#[test]
fn test_sessions_read_their_own_namespaces() {
    let mut h = harness();
    let (a, display_a) = h.shell();
    let (b, display_b) = h.shell();
    h.submit(a, "var x = 5;");
    h.submit(b, "var x = 7;");
    h.submit(a, "x");
    h.submit(b, "x");
    assert_eq!(display_a.lines(), vec!["var x = 5;", "x", "5"]);
    assert_eq!(display_b.lines(), vec!["var x = 7;", "x", "7"]);
}

#[test]
fn test_collections_are_shared_while_namespaces_are_not() {
    let mut h = harness();
    let (a, _) = h.shell();
    let (b, display_b) = h.shell();
    h.submit(a, "db.shared.insert({v: 1})");
    h.submit(b, "db.shared.find()");
    assert!(display_b.contains("{\"v\":1}"));
}

// ─────────────────────────────────────────────────────────────────────
// Query / cursor protocol
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_find_is_lazy_and_dispatches_once() {
    let mut h = harness();
    h.service.seed("crabs", vec![json!({"n": 1}), json!({"n": 2})]);
    let (id, display) = h.shell();

    h.submit(id, "var c = db.crabs.find();");
    assert_eq!(h.service.find_count("crabs"), 0);

    display.clear();
    h.submit(id, "c.hasNext()");
    assert_eq!(display.lines(), vec!["c.hasNext()", "true"]);
    assert_eq!(h.service.find_count("crabs"), 1);

    display.clear();
    h.submit(id, "c.next(); c.hasNext(); c.next(); c.hasNext()");
    assert_eq!(
        display.lines(),
        vec![
            "c.next(); c.hasNext(); c.next(); c.hasNext()",
            "[object Object]",
            "true",
            "[object Object]",
            "false",
        ]
    );
    // Every operation above consumed the one materialized result set.
    assert_eq!(h.service.find_count("crabs"), 1);
}

#[test]
fn test_cursor_yields_documents_in_server_order() {
    let mut h = harness();
    h.service
        .seed("seq", vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})]);
    let (id, display) = h.shell();
    h.submit(id, "var c = db.seq.find();");

    for expected in ["1", "2", "3"] {
        display.clear();
        h.submit(id, "c.next().n");
        assert_eq!(display.lines(), vec!["c.next().n", expected]);
    }

    // Walking past the end reports once and yields undefined.
    display.clear();
    h.submit(id, "c.next()");
    assert_eq!(display.lines(), vec!["c.next()", "ERROR: no more results to show"]);
}

#[test]
fn test_bare_find_prints_a_batch() {
    let mut h = harness();
    h.service
        .seed("seq", vec![json!({"n": 1}), json!({"n": 2}), json!({"n": 3})]);
    let (id, display) = h.shell();
    h.submit(id, "db.seq.find()");
    assert_eq!(
        display.lines(),
        vec!["db.seq.find()", "{\"n\":1}", "{\"n\":2}", "{\"n\":3}"]
    );
}

#[test]
fn test_find_arguments_filter_and_project() {
    let mut h = harness();
    h.service.seed(
        "users",
        vec![
            json!({"name": "ada", "active": true, "age": 36}),
            json!({"name": "bob", "active": false, "age": 41}),
        ],
    );
    let (id, display) = h.shell();
    let rewritten = rewritten_of(h.submit(id, "db.users.find({active: true}, {name: 1})"));
    assert_eq!(
        rewritten,
        "new tidepool.Query(tidepool.shells[0], \"users\").find({active: true}, {name: 1})"
    );
    assert_eq!(
        display.lines(),
        vec![
            "db.users.find({active: true}, {name: 1})",
            "{\"name\":\"ada\"}",
        ]
    );
}

#[test]
fn test_batch_size_limits_output_and_it_continues() {
    let mut h = harness_with(ShellConfig { shell_batch_size: 2.0, ..ShellConfig::default() });
    h.service
        .seed("seq", (1..=5).map(|n| json!({"n": n})).collect());
    let (id, display) = h.shell();

    h.submit(id, "db.seq.find()");
    assert_eq!(
        display.lines(),
        vec!["db.seq.find()", "{\"n\":1}", "{\"n\":2}", "Type \"it\" for more"]
    );

    display.clear();
    h.submit(id, "it");
    assert_eq!(display.lines(), vec!["it", "{\"n\":3}", "{\"n\":4}", "Type \"it\" for more"]);

    // `it` ignores anything after the keyword.
    display.clear();
    h.submit(id, "it does not care");
    assert_eq!(display.lines(), vec!["it does not care", "{\"n\":5}"]);

    display.clear();
    h.submit(id, "it");
    assert_eq!(display.lines(), vec!["it", "no cursor"]);

    // Batches consume one materialized result set.
    assert_eq!(h.service.find_count("seq"), 1);
}

#[test]
fn test_fractional_batch_size_rounds_up() {
    let mut h = harness_with(ShellConfig { shell_batch_size: 2.5, ..ShellConfig::default() });
    h.service
        .seed("seq", (1..=5).map(|n| json!({"n": n})).collect());
    let (id, display) = h.shell();
    h.submit(id, "db.seq.find()");
    assert_eq!(
        display.lines(),
        vec![
            "db.seq.find()",
            "{\"n\":1}",
            "{\"n\":2}",
            "{\"n\":3}",
            "Type \"it\" for more"
        ]
    );
}

#[test]
fn test_batch_size_must_be_numeric() {
    let mut h = harness();
    h.service.seed("crabs", vec![json!({"n": 1})]);
    let (id, display) = h.shell();
    h.submit(id, "DBQuery.shellBatchSize = 'plenty'");

    display.clear();
    h.submit(id, "db.crabs.find()");
    assert_eq!(
        display.lines(),
        vec![
            "db.crabs.find()",
            "ERROR: Please set DBQuery.shellBatchSize to a valid numerical value.",
        ]
    );

    // The aborted batch still recorded the continuation target, so
    // repairing the setting lets `it` pick up where it left off.
    display.clear();
    h.submit(id, "DBQuery.shellBatchSize = 20");
    h.submit(id, "it");
    assert_eq!(
        display.lines(),
        vec!["DBQuery.shellBatchSize = 20", "20", "it", "{\"n\":1}"]
    );
}

#[test]
fn test_sort_after_execution_warns_without_reordering() {
    let mut h = harness();
    h.service
        .seed("seq", vec![json!({"n": 1}), json!({"n": 2})]);
    let (id, display) = h.shell();
    h.submit(id, "var c = db.seq.find();");

    // Sorting a pending cursor is accepted silently; the statement
    // value is the cursor, which prints its batch in server order.
    display.clear();
    h.submit(id, "c.sort({n: -1})");
    assert_eq!(display.lines(), vec!["c.sort({n: -1})", "{\"n\":1}", "{\"n\":2}"]);

    display.clear();
    h.submit(id, "c.sort({n: -1})");
    assert_eq!(
        display.lines(),
        vec![
            "c.sort({n: -1})",
            "Warning: Cannot call sort on an already executed cursor.",
        ]
    );
    assert_eq!(h.service.find_count("seq"), 1);
}

#[test]
fn test_insert_round_trip() {
    let mut h = harness();
    let (id, display) = h.shell();
    h.submit(id, "db.notes.insert({text: 'hi'})");
    // Insert yields undefined, so only the echo shows.
    assert_eq!(display.lines(), vec!["db.notes.insert({text: 'hi'})"]);
    assert_eq!(h.service.documents("notes"), vec![json!({"text": "hi"})]);

    display.clear();
    h.submit(id, "db.notes.find()");
    assert_eq!(display.lines(), vec!["db.notes.find()", "{\"text\":\"hi\"}"]);
}

#[test]
fn test_failed_find_leaves_the_cursor_retryable() {
    let mut h = harness();
    h.service.seed("crabs", vec![json!({"n": 1})]);
    let (id, display) = h.shell();
    h.submit(id, "var c = db.crabs.find();");

    h.service.fail_finds(true);
    display.clear();
    h.submit(id, "c.hasNext()");
    assert_eq!(
        display.lines(),
        vec!["c.hasNext()", "ERROR: server error occured", "false"]
    );

    // The cursor never moved out of pending, so the same handle works
    // once the service recovers.
    h.service.fail_finds(false);
    display.clear();
    h.submit(id, "c.hasNext()");
    assert_eq!(display.lines(), vec!["c.hasNext()", "true"]);
    assert_eq!(h.service.find_count("crabs"), 2);
}

#[test]
fn test_failed_insert_reports_and_continues() {
    let mut h = harness();
    let (id, display) = h.shell();
    h.service.fail_inserts(true);
    h.submit(id, "db.notes.insert({text: 'lost'}); 'still here'");
    assert_eq!(
        display.lines(),
        vec![
            "db.notes.insert({text: 'lost'}); 'still here'",
            "ERROR: server error occured",
            "still here",
        ]
    );
}

// ─────────────────────────────────────────────────────────────────────
// Keyword commands
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_it_without_cursor_touches_no_collection() {
    let mut h = harness();
    let (id, display) = h.shell();
    h.submit(id, "it");
    assert_eq!(display.lines(), vec!["it", "no cursor"]);
    assert_eq!(h.service.total_finds(), 0);
}

#[test]
fn test_use_is_always_rejected() {
    let mut h = harness();
    let (id, display) = h.shell();
    h.submit(id, "use app");
    assert_eq!(
        display.lines(),
        vec!["use app", "Cannot change db: functionality disabled."]
    );
}

#[test]
fn test_help_prints_usage() {
    let mut h = harness();
    let (id, display) = h.shell();
    h.submit(id, "help");
    let lines = display.lines();
    assert_eq!(lines[0], "help");
    assert!(lines.len() > 2);
    assert!(lines.iter().any(|line| line.contains("db.collection.find")));
}

#[test]
fn test_show_accepts_up_to_two_arguments() {
    let mut h = harness();
    let (id, display) = h.shell();
    // Stubbed out: logs only, no response line.
    h.submit(id, "show collections");
    assert_eq!(display.lines(), vec!["show collections"]);

    display.clear();
    h.submit(id, "show a b c");
    assert_eq!(display.lines(), vec!["show a b c", "Too many parameters to show."]);
}

#[test]
fn test_unknown_keyword_through_the_dispatcher() {
    // Only the reserved words are swapped, so an unknown keyword can
    // reach the dispatcher only by calling it directly.
    let mut h = harness();
    let (id, display) = h.shell();
    h.submit(id, "tidepool.keyword.evaluate(0, 'flush')");
    assert_eq!(
        display.lines(),
        vec!["tidepool.keyword.evaluate(0, 'flush')", "Unknown keyword: flush."]
    );
}

// ─────────────────────────────────────────────────────────────────────
// Pipeline error handling
// ─────────────────────────────────────────────────────────────────────

#[test]
fn test_syntax_error_reports_without_evaluating() {
    let mut h = harness();
    let (id, display) = h.shell();
    let report = h.submit(id, "var = 5;");
    assert!(matches!(report, SubmissionReport::ParseError(_)));
    assert_eq!(display.lines(), vec!["var = 5;", "ERROR: syntax parsing error"]);
}

#[test]
fn test_fault_is_attributed_and_stops_the_submission() {
    let mut h = harness();
    let (id, display) = h.shell();
    let report = h.submit(id, "var x = 1; nosuch(); var y = 2;");
    assert_eq!(
        display.lines(),
        vec![
            "var x = 1; nosuch(); var y = 2;",
            "ERROR: eval error on: tidepool.shells[0].vars.nosuch();",
        ]
    );
    match report {
        SubmissionReport::Evaluated { outcomes, .. } => {
            assert_eq!(outcomes.len(), 2);
            assert!(matches!(outcomes[0], StatementOutcome::Value { .. }));
            assert!(matches!(outcomes[1], StatementOutcome::Fault { .. }));
        }
        other => panic!("expected an evaluated submission, got {other:?}"),
    }

    // Effects before the fault stick, statements after it never ran.
    display.clear();
    h.submit(id, "x");
    h.submit(id, "y");
    assert_eq!(display.lines(), vec!["x", "1", "y"]);
}

#[test]
fn test_runaway_loops_hit_the_step_budget() {
    let mut h = harness_with(ShellConfig { gas_limit: 500, ..ShellConfig::default() });
    let (id, display) = h.shell();
    h.submit(id, "while (true) {}");
    assert_eq!(
        display.lines(),
        vec!["while (true) {}", "ERROR: eval error on: while (true) {}"]
    );

    // The budget is per submission; the session keeps working.
    display.clear();
    h.submit(id, "1 + 1");
    assert_eq!(display.lines(), vec!["1 + 1", "2"]);
}

#[test]
fn test_unknown_shell_is_an_engine_error() {
    let mut h = harness();
    match h.engine.handle_submission(ShellId(99), "x") {
        Err(EngineError::UnknownShell(id)) => assert_eq!(id, ShellId(99)),
        other => panic!("expected an unknown-shell error, got {other:?}"),
    }
}

#[test]
fn test_failed_creation_registers_a_disabled_shell() {
    let mut h = harness();
    h.service.fail_creates(true);
    let display = RecordingDisplay::new();
    let id = match h.engine.create_shell(Rc::new(display.clone())) {
        Err(EngineError::ResourceCreation { id, .. }) => id,
        other => panic!("expected a resource-creation error, got {other:?}"),
    };
    assert_eq!(display.lines(), vec!["Failed to create resources on DB on server"]);

    display.clear();
    let report = h.submit(id, "var x = 1;");
    assert!(matches!(report, SubmissionReport::InputDisabled));
    assert_eq!(display.lines(), vec!["var x = 1;", "ERROR: shell is disabled"]);
    assert_eq!(h.service.total_finds(), 0);
}
