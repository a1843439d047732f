use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use gradebook::{
    Identifier,
    archive::{self, ExtractionError},
    student::{classify, flatten},
    util::normalize_file_names,
};
use uuid::Uuid;
use zip::{ZipWriter, write::SimpleFileOptions};

fn temp_root() -> PathBuf {
    let root = std::env::temp_dir().join(format!("gradebook-intake-{}", Uuid::new_v4()));
    fs::create_dir_all(&root).expect("create temp root");
    root
}

fn write(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent");
    }
    fs::write(path, contents).expect("write file");
}

fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let mut zip = ZipWriter::new(File::create(path).expect("create zip"));
    for (name, contents) in entries {
        zip.start_file(*name, SimpleFileOptions::default())
            .expect("start entry");
        zip.write_all(contents.as_bytes()).expect("write entry");
    }
    zip.finish().expect("finish zip");
}

fn suffixes() -> Vec<String> {
    vec![".c".to_string(), ".cpp".to_string()]
}

#[test]
fn classify_groups_by_id_and_pools_unresolved_files() {
    let root = temp_root();
    let in_dir = root.join("in");
    write(&in_dir.join("SubmissionReceipt_ab12345.txt"), "Jane Doe has submitted\n");
    write(&in_dir.join("ab12345_main.c"), "int main(void) { return 0; }\n");
    write(&in_dir.join("cd67890_lab.cpp"), "int main() {}\n");
    write(&in_dir.join("random.c"), "int main(void) { return 0; }\n");
    write(&in_dir.join("notes.txt"), "no id here\n");
    write(&in_dir.join(".DS_Store"), "");

    let students = classify(&in_dir).expect("classify");

    let ids = students.keys().map(Identifier::as_str).collect::<Vec<_>>();
    assert_eq!(ids, vec!["ab12345", "cd67890", "noid"]);
    assert_eq!(students[&Identifier::Student("ab12345".into())].files().len(), 2);
    assert_eq!(students[&Identifier::Unresolved].files().len(), 2);

    let total: usize = students.values().map(|s| s.files().len()).sum();
    assert_eq!(total, 5);

    let _ = fs::remove_dir_all(root);
}

#[test]
fn classify_rejects_missing_directory() {
    let root = temp_root();
    let err = classify(&root.join("does-not-exist")).expect_err("missing dir");
    assert!(err.to_string().contains("missing or unreadable"));
    let _ = fs::remove_dir_all(root);
}

#[test]
fn whitespace_in_names_is_replaced() {
    let root = temp_root();
    write(&root.join("ab12345 my main.c"), "int main(void) { return 0; }\n");
    write(&root.join("fine.c"), "");

    let renamed = normalize_file_names(&root).expect("normalize");

    assert_eq!(renamed, 1);
    assert!(root.join("ab12345_my_main.c").is_file());
    assert!(!root.join("ab12345 my main.c").exists());

    let _ = fs::remove_dir_all(root);
}

#[test]
fn make_folder_unpacks_archives_and_reads_the_name() {
    let root = temp_root();
    let in_dir = root.join("in");
    let out_dir = root.join("out");
    let extras_dir = root.join("extras");
    write(&in_dir.join("SubmissionReceipt_ab12345.txt"), "Jane Doe has submitted Lab 3\n");
    write(&in_dir.join("ab12345_main.c"), "int main(void) { return 0; }\n");
    fs::create_dir_all(&in_dir).expect("create in dir");
    write_zip(
        &in_dir.join("ab12345_project.zip"),
        &[
            ("project/src/util.c", "int util(void) { return 1; }\n"),
            ("project/README.md", "readme\n"),
            ("__MACOSX/project/src/._util.c", "resource fork\n"),
        ],
    );
    write(&extras_dir.join("input.dat"), "1 2 3\n");

    let mut students = classify(&in_dir).expect("classify");
    let student = students
        .get_mut(&Identifier::Student("ab12345".into()))
        .expect("student present");
    let extras = vec![extras_dir.join("input.dat")];
    let dir = student
        .make_folder(&out_dir, &suffixes(), &extras)
        .expect("make folder")
        .to_path_buf();

    assert_eq!(dir, out_dir.join("ab12345"));
    assert_eq!(student.name().first, "Jane");
    assert_eq!(student.name().last, "Doe");
    assert_eq!(student.report_name(), "JaneDoeab12345.txt");

    assert!(dir.join("ab12345_main.c").is_file());
    assert!(dir.join("util.c").is_file());
    assert!(dir.join("ab12345_project.zip").is_file());
    assert!(dir.join("input.dat").is_file());
    assert!(dir.join("ab12345_project/project/README.md").is_file());
    assert!(!dir.join("._util.c").exists());

    let sources = student.source_files(&suffixes()).expect("sources");
    let names = sources
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["ab12345_main.c", "util.c"]);

    let _ = fs::remove_dir_all(root);
}

#[test]
fn make_folder_twice_converges() {
    let root = temp_root();
    let in_dir = root.join("in");
    let out_dir = root.join("out");
    write(&in_dir.join("ab12345_main.c"), "int main(void) { return 0; }\n");
    write_zip(&in_dir.join("ab12345_extra.zip"), &[("nested/helper.c", "int h;\n")]);

    let mut students = classify(&in_dir).expect("classify");
    let student = students.values_mut().next().expect("one student");
    student.make_folder(&out_dir, &suffixes(), &[]).expect("first run");
    let first = student.source_files(&suffixes()).expect("sources");
    student.make_folder(&out_dir, &suffixes(), &[]).expect("second run");
    let second = student.source_files(&suffixes()).expect("sources");

    assert_eq!(first, second);
    assert_eq!(
        fs::read_to_string(out_dir.join("ab12345/helper.c")).expect("read helper"),
        "int h;\n"
    );
    assert!(!out_dir.join("ab12345/ab12345_extra/nested/helper.c").exists());

    let _ = fs::remove_dir_all(root);
}

#[test]
fn flatten_keeps_both_files_on_collision() {
    let root = temp_root();
    write(&root.join("main.c"), "top\n");
    write(&root.join("sub/main.c"), "nested\n");
    write(&root.join("sub/deeper/other.cpp"), "other\n");
    write(&root.join("sub/notes.md"), "notes\n");

    let result = flatten(&root, &suffixes()).expect("flatten");

    assert_eq!(result.moved, vec![root.join("other.cpp")]);
    assert_eq!(result.skipped.len(), 1);
    assert!(result.skipped[0].to_string().contains("main.c"));
    assert_eq!(fs::read_to_string(root.join("main.c")).expect("top"), "top\n");
    assert_eq!(fs::read_to_string(root.join("sub/main.c")).expect("nested"), "nested\n");
    assert!(root.join("sub/notes.md").is_file());

    let _ = fs::remove_dir_all(root);
}

#[test]
fn flatten_drops_identical_nested_copy() {
    let root = temp_root();
    write(&root.join("helper.c"), "int h;\n");
    write(&root.join("lab/helper.c"), "int h;\n");

    let result = flatten(&root, &suffixes()).expect("flatten");

    assert!(result.moved.is_empty());
    assert!(result.skipped.is_empty());
    assert!(!root.join("lab/helper.c").exists());
    assert_eq!(fs::read_to_string(root.join("helper.c")).expect("top"), "int h;\n");

    let _ = fs::remove_dir_all(root);
}

#[test]
fn unknown_archive_kind_is_unsupported() {
    let root = temp_root();
    let bogus = root.join("ab12345.pdf");
    write(&bogus, "%PDF");

    assert!(!archive::is_archive(&bogus));
    let err = archive::extract(&bogus, &root.join("out")).expect_err("not an archive");
    assert!(matches!(err, ExtractionError::Unsupported(_)));

    let _ = fs::remove_dir_all(root);
}

#[test]
fn zip_entries_cannot_escape_destination() {
    let root = temp_root();
    let zip_path = root.join("evil.zip");
    write_zip(&zip_path, &[("../escaped.c", "bad\n"), ("ok/fine.c", "good\n")]);

    archive::extract(&zip_path, &root.join("dest")).expect("extract");

    assert!(root.join("dest/ok/fine.c").is_file());
    assert!(!root.join("escaped.c").exists());

    let _ = fs::remove_dir_all(root);
}
