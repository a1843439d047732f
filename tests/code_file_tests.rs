use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use gradebook::{
    CodeFile, Compile, Execute, Execution,
    code_file::{CompileStatus, RunState},
    compiler::CompileOutput,
    constants::DID_NOT_COMPILE,
    error::GradeError,
};
use uuid::Uuid;

fn temp_root() -> PathBuf {
    let root = std::env::temp_dir().join(format!("gradebook-unit-{}", Uuid::new_v4()));
    fs::create_dir_all(&root).expect("create temp root");
    root
}

/// Compiler stand-in that always gives the same answer.
struct FakeCompiler {
    exit_code:   i32,
    diagnostics: &'static str,
    calls:       AtomicUsize,
}

impl FakeCompiler {
    fn new(exit_code: i32, diagnostics: &'static str) -> Self {
        Self {
            exit_code,
            diagnostics,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Compile for FakeCompiler {
    async fn compile(&self, _source: &Path, _executable: &Path) -> CompileOutput {
        self.calls.fetch_add(1, Ordering::SeqCst);
        CompileOutput::new(self.exit_code, self.diagnostics)
    }
}

/// Executor stand-in that counts how often it runs.
struct FakeExecutor {
    result: Execution,
    calls:  AtomicUsize,
}

impl FakeExecutor {
    fn new(result: Execution) -> Self {
        Self {
            result,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Execute for FakeExecutor {
    async fn execute(&self, _executable: &Path) -> Execution {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

fn unit(root: &Path) -> CodeFile {
    let source = root.join("main.c");
    fs::write(&source, "int main(void) { return 0; }\n").expect("write source");
    CodeFile::new(source).expect("unit")
}

#[test]
fn missing_source_is_rejected() {
    let root = temp_root();
    let err = CodeFile::new(root.join("absent.c")).expect_err("no such file");
    assert!(matches!(err, GradeError::MissingSource(_)));
    let _ = fs::remove_dir_all(root);
}

#[test]
fn executable_sits_next_to_source() {
    assert_eq!(
        CodeFile::executable_for(Path::new("/out/ab12345/main.c")),
        PathBuf::from("/out/ab12345/main.out")
    );
}

#[tokio::test]
async fn failed_compile_never_runs() {
    let root = temp_root();
    let mut unit = unit(&root);
    let compiler = FakeCompiler::new(1, "main.c:1:1: error: expected ';'");
    let executor = FakeExecutor::new(Execution::Completed("should not appear".into()));

    unit.compile(&compiler).await;
    let first = unit.get_output(&executor).await;
    let second = unit.get_output(&executor).await;

    assert_eq!(first, DID_NOT_COMPILE);
    assert_eq!(second, DID_NOT_COMPILE);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    assert_eq!(unit.exit_code(), Some(1));
    assert_eq!(unit.diagnostics(), "main.c:1:1: error: expected ';'");
    assert_eq!(unit.run_state(), &RunState::Skipped(DID_NOT_COMPILE.to_string()));

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn output_is_memoized_across_executors() {
    let root = temp_root();
    let mut unit = unit(&root);
    let compiler = FakeCompiler::new(0, "");
    let first_executor = FakeExecutor::new(Execution::Completed("hello\n".into()));
    let second_executor = FakeExecutor::new(Execution::Completed("goodbye\n".into()));

    unit.compile(&compiler).await;
    let first = unit.get_output(&first_executor).await;
    let second = unit.get_output(&second_executor).await;

    assert_eq!(first, "hello\n");
    assert_eq!(second, "hello\n");
    assert_eq!(first_executor.calls.load(Ordering::SeqCst), 1);
    assert_eq!(second_executor.calls.load(Ordering::SeqCst), 0);
    assert_eq!(unit.execution(), Some(&Execution::Completed("hello\n".into())));

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn compile_happens_once() {
    let root = temp_root();
    let mut unit = unit(&root);
    let compiler = FakeCompiler::new(0, "main.c:1:5: warning: unused variable");

    unit.compile(&compiler).await;
    let status = unit.compile(&FakeCompiler::new(1, "different")).await.clone();

    assert_eq!(compiler.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        status,
        CompileStatus::Succeeded {
            diagnostics: "main.c:1:5: warning: unused variable".into(),
        }
    );
    assert!(unit.compiled());

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn output_before_compile_is_not_remembered() {
    let root = temp_root();
    let mut unit = unit(&root);
    let executor = FakeExecutor::new(Execution::Completed("ran\n".into()));

    assert_eq!(unit.get_output(&executor).await, DID_NOT_COMPILE);
    unit.compile(&FakeCompiler::new(0, "")).await;
    assert_eq!(unit.get_output(&executor).await, "ran\n");
    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);

    let _ = fs::remove_dir_all(root);
}

#[tokio::test]
async fn timeout_is_remembered_as_sentinel() {
    let root = temp_root();
    let mut unit = unit(&root);
    let executor = FakeExecutor::new(Execution::TimedOut { seconds: 5 });

    unit.compile(&FakeCompiler::new(0, "")).await;
    let text = unit.get_output(&executor).await;

    assert_eq!(text, "Timed out: execution took more than 5 seconds.");
    assert_eq!(unit.get_output(&executor).await, text);
    assert_eq!(executor.calls.load(Ordering::SeqCst), 1);

    let _ = fs::remove_dir_all(root);
}
