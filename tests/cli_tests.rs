//! CLI smoke tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

const RECIPE: &str = r#"
name: rename
steps:
  - name: rename-symbol
    engine: literal
    args:
      find: "old_name"
      replace: "new_name"
"#;

#[test]
fn help_names_the_subcommands() {
    Command::cargo_bin("codemill")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("case"));
}

#[test]
fn run_rewrites_a_tree() {
    let dir = tempfile::tempdir().unwrap();
    let recipe = dir.path().join("recipe.yml");
    fs::write(&recipe, RECIPE).unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("a.rs"), "fn old_name() {}").unwrap();
    fs::write(src.join("b.rs"), "// untouched").unwrap();

    Command::cargo_bin("codemill")
        .unwrap()
        .arg("run")
        .arg(&recipe)
        .arg("--path")
        .arg(dir.path())
        .arg("--include")
        .arg("src/**")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 command(s) applied"));

    assert_eq!(
        fs::read_to_string(src.join("a.rs")).unwrap(),
        "fn new_name() {}"
    );
    assert_eq!(fs::read_to_string(src.join("b.rs")).unwrap(), "// untouched");
}

#[test]
fn record_then_show_lists_the_jobs() {
    let dir = tempfile::tempdir().unwrap();
    let recipe = dir.path().join("recipe.yml");
    fs::write(&recipe, RECIPE).unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("a.rs"), "fn old_name() {}").unwrap();
    let case_path = dir.path().join("dry.case");

    Command::cargo_bin("codemill")
        .unwrap()
        .arg("run")
        .arg(&recipe)
        .arg("--path")
        .arg(dir.path())
        .arg("--include")
        .arg("src/**")
        .arg("--record")
        .arg(&case_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("recorded case"));

    // the real tree is untouched
    assert_eq!(
        fs::read_to_string(src.join("a.rs")).unwrap(),
        "fn old_name() {}"
    );

    Command::cargo_bin("codemill")
        .unwrap()
        .arg("case")
        .arg("show")
        .arg(&case_path)
        .assert()
        .success()
        .stdout(predicate::str::contains("step 'rename'"))
        .stdout(predicate::str::contains("1 job record(s)"));
}

#[test]
fn a_bad_recipe_fails_loudly() {
    let dir = tempfile::tempdir().unwrap();
    let recipe = dir.path().join("recipe.yml");
    fs::write(&recipe, "name: hollow\nsteps: []\n").unwrap();

    Command::cargo_bin("codemill")
        .unwrap()
        .arg("run")
        .arg(&recipe)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no steps"));
}
