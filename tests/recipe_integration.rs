//! End-to-end runner behavior over an in-memory tree

use codemill::command::NoopFormatter;
use codemill::recipe::{run, NullObserver, ProgressObserver, RunContext};
use codemill::testing::{
    step_with, ChattyTransform, FaultingTransform, LabelTransform, MemoryStore,
};
use codemill::transform::{ConsoleKind, ConsoleLine, ScalarValue};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

fn code_store() -> MemoryStore {
    MemoryStore::new([
        ("/code/a.ts", "original a"),
        ("/code/b.ts", "original b"),
        ("/code/c.ts", "original c"),
        ("/code/untargeted.ts", "never enumerated"),
    ])
}

fn code_paths() -> Vec<PathBuf> {
    ["/code/a.ts", "/code/b.ts", "/code/c.ts"]
        .iter()
        .map(PathBuf::from)
        .collect()
}

fn ctx<'a>(store: &'a MemoryStore, observer: &'a dyn ProgressObserver) -> RunContext<'a> {
    RunContext {
        store,
        reader: store,
        formatter: &NoopFormatter,
        pool_size: 2,
        observer,
    }
}

#[tokio::test]
async fn recipe_steps_compose_sequentially() {
    let store = code_store();
    let steps = vec![
        step_with(
            "d",
            Arc::new(LabelTransform {
                label: "transformed",
                only_path: None,
            }),
            &[
                ("argA", ScalarValue::Int(1)),
                ("argB", ScalarValue::Int(2)),
            ],
        ),
        step_with(
            "e",
            Arc::new(LabelTransform {
                label: "double transformed",
                only_path: Some(PathBuf::from("/code/c.ts")),
            }),
            &[
                ("argA", ScalarValue::Int(3)),
                ("argB", ScalarValue::Int(4)),
            ],
        ),
    ];

    let result = run(&steps, code_paths().into_iter(), ctx(&store, &NullObserver))
        .await
        .unwrap();

    assert_eq!(store.get("/code/a.ts").unwrap(), "transformed /code/a.ts 1 2");
    assert_eq!(store.get("/code/b.ts").unwrap(), "transformed /code/b.ts 1 2");
    assert_eq!(
        store.get("/code/c.ts").unwrap(),
        "double transformed /code/c.ts 3 4"
    );
    // a file no step targets is byte-identical to its original
    assert_eq!(
        store.get("/code/untargeted.ts").unwrap(),
        "never enumerated"
    );

    assert!(result.is_clean());
    assert_eq!(result.steps_completed, 2);
    // step one rewrites three files, step two rewrites one
    assert_eq!(result.commands_applied, 4);
    assert_eq!(result.items_processed, 6);
}

#[tokio::test]
async fn a_fault_never_suppresses_other_items() {
    let store = code_store();
    let steps = vec![step_with(
        "faulty",
        Arc::new(FaultingTransform {
            fail_path: PathBuf::from("/code/b.ts"),
        }),
        &[],
    )];

    let result = run(&steps, code_paths().into_iter(), ctx(&store, &NullObserver))
        .await
        .unwrap();

    assert_eq!(result.faults.len(), 1);
    assert_eq!(result.faults[0].path, PathBuf::from("/code/b.ts"));
    assert_eq!(result.faults[0].message, "injected fault");

    // the faulted item is untouched, the rest landed
    assert_eq!(store.get("/code/b.ts").unwrap(), "original b");
    assert_eq!(store.get("/code/a.ts").unwrap(), "touched original a");
    assert_eq!(store.get("/code/c.ts").unwrap(), "touched original c");
    assert_eq!(result.commands_applied, 2);
}

#[tokio::test]
async fn an_unreadable_item_is_a_per_path_fault() {
    let store = code_store();
    let mut paths = code_paths();
    paths.push(PathBuf::from("/code/ghost.ts"));
    let steps = vec![step_with(
        "label",
        Arc::new(LabelTransform {
            label: "transformed",
            only_path: None,
        }),
        &[
            ("argA", ScalarValue::Int(1)),
            ("argB", ScalarValue::Int(2)),
        ],
    )];

    let result = run(&steps, paths.into_iter(), ctx(&store, &NullObserver))
        .await
        .unwrap();

    assert_eq!(result.faults.len(), 1);
    assert_eq!(result.faults[0].path, PathBuf::from("/code/ghost.ts"));
    assert_eq!(result.commands_applied, 3);
}

#[derive(Default)]
struct CollectingObserver {
    lines: Mutex<Vec<(PathBuf, ConsoleLine)>>,
    completed: Mutex<Vec<PathBuf>>,
}

impl ProgressObserver for CollectingObserver {
    fn item_completed(&self, path: &Path, _ok: bool) {
        self.completed.lock().unwrap().push(path.to_path_buf());
    }

    fn console_line(&self, path: &Path, line: &ConsoleLine) {
        self.lines
            .lock()
            .unwrap()
            .push((path.to_path_buf(), line.clone()));
    }
}

#[tokio::test]
async fn console_lines_reach_the_observer() {
    let store = code_store();
    let observer = CollectingObserver::default();
    let steps = vec![step_with("chatty", Arc::new(ChattyTransform), &[])];

    let result = run(&steps, code_paths().into_iter(), ctx(&store, &observer))
        .await
        .unwrap();

    assert!(result.is_clean());
    assert_eq!(result.commands_applied, 0);

    let lines = observer.lines.lock().unwrap();
    assert_eq!(lines.len(), 3);
    for (path, line) in lines.iter() {
        assert_eq!(line.kind, ConsoleKind::Stdout);
        assert_eq!(line.text, format!("inspected {}", path.display()));
    }
    assert_eq!(observer.completed.lock().unwrap().len(), 3);
}
