mod common;

use common::{command, command_with, names, Fixture};
use shelve_lib::services::CancelFlag;
use shelve_lib::Block;
use std::fs;

fn block(fixture: &Fixture) -> Block {
    Block::new("Scenario", &fixture.root)
}

#[test]
fn test_basename_glob_matches_whole_stem() {
    let fixture = Fixture::new(&[("alan.txt", ""), ("alan2.txt", "")]);
    let mut block = block(&fixture);
    block.push_rule(command("basename", "al*n")).unwrap();

    let pipe = block.eval(&fixture.services(), None);

    assert_eq!(names(&pipe), vec!["alan.txt"]);
}

#[test]
fn test_basename_strict_compares_raw_content() {
    let fixture = Fixture::new(&[("alan.txt", ""), ("alan2.txt", "")]);
    let mut block = block(&fixture);
    block
        .push_rule(command("basename", "alan").with_argument("strict", "true").unwrap())
        .unwrap();

    let pipe = block.eval(&fixture.services(), None);

    assert_eq!(names(&pipe), vec!["alan.txt"]);
}

#[test]
fn test_extension_then_filecontent() {
    let fixture = Fixture::new(&[
        ("notes.txt", "buy milk\nTODO: call back\n"),
        ("plain.txt", "nothing to see\n"),
        ("todo.md", "TODO everywhere\n"),
    ]);
    let mut block = block(&fixture);
    block.push_rule(command("extension", "txt")).unwrap();
    block
        .push_rule(command_with("filecontent", &["and"], "/TODO/"))
        .unwrap();

    let pipe = block.eval(&fixture.services(), None);

    assert_eq!(names(&pipe), vec!["notes.txt"]);
    assert!(fixture.reporter.errors().is_empty());
}

#[test]
fn test_content_rules_read_with_their_own_limits() {
    let fixture = Fixture::new(&[("a.txt", "1\n2\n3\nTODO\n")]);
    let mut block = block(&fixture);
    block.push_rule(command("extension", "txt")).unwrap();
    block
        .push_rule(
            command_with("filecontent", &["pass"], "/1/")
                .with_argument("max_lines", "1")
                .unwrap(),
        )
        .unwrap();
    block
        .push_rule(
            command_with("filecontent", &["and"], "/TODO/")
                .with_argument("max_lines", "10")
                .unwrap(),
        )
        .unwrap();

    let pipe = block.eval(&fixture.services(), None);

    assert_eq!(names(&pipe), vec!["a.txt"]);
    assert!(fixture.reporter.errors().is_empty());
}

#[test]
fn test_simulated_terminal_output_feeds_later_actions() {
    let fixture = Fixture::new(&[("a.txt", "")]);
    let mut block = block(&fixture);
    block.simulate = true;
    block.push_rule(command("extension", "txt")).unwrap();
    block.push_action(command("terminal", "echo hi")).unwrap();
    block.push_action(command("echo", "out={terminal.out}")).unwrap();

    block.eval(&fixture.services(), None);

    assert!(fixture.reporter.errors().is_empty());
    assert_eq!(fixture.reporter.lines().last().unwrap(), "out=");
}

#[test]
fn test_move_needs_existing_directory_or_makedirs() {
    let fixture = Fixture::new(&[("alan.txt", "hello")]);
    let out = fixture.path("out");

    let mut refused = block(&fixture);
    refused.push_rule(command("extension", "txt")).unwrap();
    refused.push_action(command("move", "out/")).unwrap();
    let pipe = refused.eval(&fixture.services(), None);

    assert!(fixture.reporter.errors()[0].starts_with("move: directory"));
    assert!(!out.exists());
    assert!(fixture.path("alan.txt").is_file());
    assert!(pipe.items().all(|item| !item.deleted));

    let mut allowed = block(&fixture);
    allowed.push_rule(command("extension", "txt")).unwrap();
    allowed
        .push_action(command("move", "out/").with_argument("makedirs", "true").unwrap())
        .unwrap();
    let pipe = allowed.eval(&fixture.services(), None);

    assert_eq!(fs::read_to_string(out.join("alan.txt")).unwrap(), "hello");
    assert!(!fixture.path("alan.txt").exists());
    assert!(pipe.items().all(|item| item.deleted));
    assert_eq!(fixture.reporter.errors().len(), 1);
}

#[test]
fn test_trashed_items_are_skipped_by_later_actions() {
    let fixture = Fixture::new(&[("alan.txt", "hello")]);
    let mut block = block(&fixture);
    block.push_rule(command("extension", "txt")).unwrap();
    block.push_action(command("trash", "")).unwrap();
    block
        .push_action(command("move", "out/").with_argument("makedirs", "true").unwrap())
        .unwrap();

    let services = fixture.services();
    let pipe = block.eval(&services, None);

    assert!(fixture.outside("trash").join("alan.txt").is_file());
    assert!(!fixture.path("out").exists());
    assert!(fixture.reporter.errors().is_empty());
    assert_eq!(fixture.reporter.lines().len(), 1);
    assert!(fixture.reporter.lines()[0].starts_with("Trash:"));
    assert!(pipe.items().all(|item| item.deleted));
    assert!(services.file_history.borrow().is_empty());
}

#[test]
fn test_cancelled_run_touches_nothing() {
    let fixture = Fixture::new(&[("alan.txt", "hello")]);
    let mut block = block(&fixture);
    block.push_rule(command("extension", "txt")).unwrap();
    block
        .push_action(command("move", "out/").with_argument("makedirs", "true").unwrap())
        .unwrap();

    let cancel = CancelFlag::new();
    cancel.cancel();
    let services = fixture.services().with_cancel(cancel);
    block.eval(&services, None);

    assert!(fixture.path("alan.txt").is_file());
    assert!(!fixture.path("out").exists());
}
