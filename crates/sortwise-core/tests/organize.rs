use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, TimeZone};
use tempfile::TempDir;

use sortwise_core::{
    organize_batch, undo, ActionType, Attribute, CategoryStore, Condition, FileInfo, FileSystem,
    LocalFs, Operator, PreviewSnapshot, ResolveContext, Result, Rule, RuleAction, RuleMatcher,
    TRASH_MARKER,
};

/// Local filesystem whose trash is a plain folder.
struct StagingFs {
    trash_dir: PathBuf,
}

impl FileSystem for StagingFs {
    fn exists(&self, path: &Path) -> bool {
        LocalFs.exists(path)
    }
    fn is_dir(&self, path: &Path) -> bool {
        LocalFs.is_dir(path)
    }
    fn create_dir(&self, path: &Path) -> Result<()> {
        LocalFs.create_dir(path)
    }
    fn move_file(&self, from: &Path, to: &Path) -> Result<()> {
        LocalFs.move_file(from, to)
    }
    fn copy_file(&self, from: &Path, to: &Path) -> Result<()> {
        LocalFs.copy_file(from, to)
    }
    fn trash(&self, path: &Path) -> Result<()> {
        let target = sortwise_core::unique_path(&LocalFs, &self.trash_dir.join(path.file_name().unwrap()));
        LocalFs.move_file(path, &target)
    }
    fn remove_file(&self, path: &Path) -> Result<()> {
        LocalFs.remove_file(path)
    }
    fn remove_dir(&self, path: &Path) -> Result<()> {
        LocalFs.remove_dir(path)
    }
    fn is_dir_empty(&self, path: &Path) -> Result<bool> {
        LocalFs.is_dir_empty(path)
    }
    fn list_files(&self, dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
        LocalFs.list_files(dir, recursive)
    }
    fn metadata(&self, path: &Path) -> Result<fs::Metadata> {
        LocalFs.metadata(path)
    }
}

struct Fixture {
    _temp: TempDir,
    root: PathBuf,
    fs: StagingFs,
    store: CategoryStore,
}

impl Fixture {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("inbox");
        let trash_dir = temp.path().join("trash");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&trash_dir).unwrap();
        Self {
            _temp: temp,
            root,
            fs: StagingFs { trash_dir },
            store: CategoryStore::builtin(),
        }
    }

    fn ctx(&self) -> ResolveContext<'_> {
        ResolveContext::new(&self.root, &self.store).at(now())
    }

    fn touch(&self, rel: &str) -> PathBuf {
        let path = self.root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, rel).unwrap();
        path
    }

    fn file(&self, rel: &str) -> FileInfo {
        FileInfo::new(self.root.join(rel))
            .with_modified(Local.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap())
            .with_category_from(&self.store)
    }

    fn tree(&self) -> Vec<PathBuf> {
        LocalFs.list_files(&self.root, true).unwrap()
    }
}

fn now() -> DateTime<Local> {
    Local.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
}

fn ext_is(ext: &str) -> Condition {
    Condition::new(Attribute::Extension, Operator::Is, ext)
}

#[test]
fn first_match_picks_lowest_priority_enabled_rule() {
    let rules = vec![
        Rule::new("later").with_priority(5).with_condition(ext_is("pdf")).with_action(RuleAction::Delete),
        Rule::new("off").with_priority(0).with_condition(ext_is("pdf")).with_action(RuleAction::Delete).disabled(),
        Rule::new("first").with_priority(1).with_condition(ext_is("pdf")).with_action(RuleAction::Ignore),
    ];
    let file = FileInfo::new("/inbox/a.pdf");
    let matched = RuleMatcher::new(&rules).first_match(&file, now()).unwrap();
    assert_eq!(matched.name, "first");
}

#[test]
fn resolution_is_deterministic() {
    let fx = Fixture::new();
    let actions = vec![
        RuleAction::CopyToFolder("Backup/{Year}".into()),
        RuleAction::MoveToCategory(String::new()),
        RuleAction::Rename("{Name} {date:MMM yyyy}.{ext}".into()),
    ];
    let file = fx.file("report.pdf");
    let first = fx.ctx().resolve(&actions, &file);
    let second = fx.ctx().resolve(&actions, &file);
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
    assert_eq!(first[1].path, fx.root.join("Documents").join("report Mar 2024.pdf"));
}

#[test]
fn identity_rename_is_a_no_op() {
    let fx = Fixture::new();
    let src = fx.touch("notes.txt");
    let rules = vec![Rule::new("same name")
        .with_condition(ext_is("txt"))
        .with_action(RuleAction::Rename("{Name}.{ext}".into()))];

    let preview = fx.ctx().preview(&[fx.file("notes.txt")], &rules);
    assert_eq!(preview[0].destinations[0].path, src);
    assert!(!preview[0].will_organize);

    let report = organize_batch(&[fx.file("notes.txt")], &rules, &fx.ctx(), &fx.fs);
    assert_eq!(report.unchanged, 1);
    assert!(report.undo_log.is_empty());
    assert_eq!(fx.tree(), vec![src]);
}

#[test]
fn collisions_get_numbered_suffixes() {
    let fx = Fixture::new();
    fx.touch("Docs/document.pdf");
    fx.touch("document.pdf");
    fx.touch("sub/document.pdf");
    let rules = vec![Rule::new("docs")
        .with_condition(ext_is("pdf"))
        .with_action(RuleAction::MoveToFolder("Docs".into()))];

    let files = vec![fx.file("document.pdf"), fx.file("sub/document.pdf")];
    let report = organize_batch(&files, &rules, &fx.ctx(), &fx.fs);

    assert_eq!(report.succeeded, 2);
    assert_eq!(
        fs::read_to_string(fx.root.join("Docs/document.pdf")).unwrap(),
        "Docs/document.pdf"
    );
    assert_eq!(
        fs::read_to_string(fx.root.join("Docs/document (1).pdf")).unwrap(),
        "document.pdf"
    );
    assert_eq!(
        fs::read_to_string(fx.root.join("Docs/document (2).pdf")).unwrap(),
        "sub/document.pdf"
    );
}

#[test]
fn continue_chains_copy_then_move() {
    let fx = Fixture::new();
    fx.touch("a.pdf");
    let rules = vec![
        Rule::new("Backup")
            .with_priority(1)
            .with_condition(ext_is("pdf"))
            .with_action(RuleAction::CopyToFolder("Backup".into()))
            .with_action(RuleAction::Continue),
        Rule::new("Docs")
            .with_priority(2)
            .with_condition(ext_is("pdf"))
            .with_action(RuleAction::MoveToFolder("Docs".into())),
    ];

    let preview = fx.ctx().preview(&[fx.file("a.pdf")], &rules);
    let predicted: Vec<(PathBuf, ActionType)> = preview[0]
        .destinations
        .iter()
        .map(|d| (d.path.clone(), d.action))
        .collect();
    assert_eq!(
        predicted,
        vec![
            (fx.root.join("Backup/a.pdf"), ActionType::CopyToFolder),
            (fx.root.join("Docs/a.pdf"), ActionType::MoveToFolder),
        ]
    );
    assert_eq!(preview[0].rule_names, vec!["Backup", "Docs"]);

    let report = organize_batch(&[fx.file("a.pdf")], &rules, &fx.ctx(), &fx.fs);
    assert_eq!(report.succeeded, 1);
    assert_eq!(
        fx.tree(),
        vec![fx.root.join("Backup/a.pdf"), fx.root.join("Docs/a.pdf")]
    );
}

#[test]
fn delete_is_terminal() {
    let fx = Fixture::new();
    fx.touch("old.log");
    let actions = vec![RuleAction::Delete, RuleAction::CopyToFolder("Backup".into())];
    let rules = vec![Rule::new("purge")
        .with_condition(ext_is("log"))
        .with_action(actions[0].clone())
        .with_action(actions[1].clone())];

    let predicted = fx.ctx().resolve(&actions, &fx.file("old.log"));
    assert_eq!(predicted.len(), 1);
    assert_eq!(predicted[0].path, PathBuf::from(TRASH_MARKER));

    let report = organize_batch(&[fx.file("old.log")], &rules, &fx.ctx(), &fx.fs);
    assert_eq!(report.succeeded, 1);
    assert!(fx.tree().is_empty());
    assert!(!fx.root.join("Backup").exists());
    assert!(fx.fs.trash_dir.join("old.log").exists());
    assert!(report.undo_log.entries[0].is_deletion());
}

#[test]
fn organize_then_undo_restores_the_tree() {
    let fx = Fixture::new();
    fx.touch("a.pdf");
    fx.touch("b.pdf");
    fx.touch("photo.jpg");
    fx.touch("notes.txt");
    fx.touch("Archive/keep.txt");
    let before = fx.tree();

    let rules = vec![
        Rule::new("backup pdf")
            .with_priority(0)
            .with_condition(ext_is("pdf"))
            .with_action(RuleAction::CopyToFolder("Archive".into()))
            .with_action(RuleAction::Continue),
        Rule::new("pdf by year")
            .with_priority(1)
            .with_condition(ext_is("pdf"))
            .with_action(RuleAction::SortIntoSubfolder("Papers/{Year}/{Month}".into()))
            .with_action(RuleAction::Rename("{Name}-{Date}.{ext}".into())),
        Rule::new("images")
            .with_priority(2)
            .with_condition(ext_is("jpg"))
            .with_action(RuleAction::MoveToCategory("images".into())),
    ];
    let files: Vec<FileInfo> = ["a.pdf", "b.pdf", "photo.jpg", "notes.txt"]
        .iter()
        .map(|name| fx.file(name))
        .collect();

    let snapshot = PreviewSnapshot::build(fx.ctx().preview(&files, &rules));
    assert_eq!(snapshot.organized_files, 3);
    assert_eq!(snapshot.unmatched_files, 1);

    let report = organize_batch(&files, &rules, &fx.ctx(), &fx.fs);
    assert_eq!(report.succeeded, 3);
    assert_eq!(report.unmatched, 1);
    assert!(fx.root.join("Papers/2024/03/a-2024-03-10.pdf").exists());
    assert!(fx.root.join("Archive/b.pdf").exists());
    assert!(fx.root.join("Images/photo.jpg").exists());

    let result = undo(&fx.fs, &report.undo_log);
    assert!(result.errors.is_empty(), "{:?}", result.errors);
    assert_eq!(result.restored, 3);
    assert_eq!(result.copies_removed, 2);

    assert_eq!(fx.tree(), before);
    assert!(!fx.root.join("Papers").exists());
    assert!(!fx.root.join("Images").exists());
    assert!(fx.root.join("Archive/keep.txt").exists());
}

#[test]
fn invoice_lands_in_year_folder() {
    let fx = Fixture::new();
    fx.touch("invoice_2024.pdf");
    let rules = vec![Rule::new("Invoices")
        .with_condition(ext_is("pdf"))
        .with_condition(Condition::new(Attribute::Name, Operator::Contains, "invoice"))
        .with_action(RuleAction::SortIntoSubfolder("Invoices/{Year}".into()))];

    let invoice = fx
        .file("invoice_2024.pdf")
        .with_modified(Local.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap());

    let preview = fx.ctx().preview(std::slice::from_ref(&invoice), &rules);
    assert_eq!(
        preview[0].destinations[0].path,
        fx.root.join("Invoices").join("2024").join("invoice_2024.pdf")
    );

    let report = organize_batch(&[invoice], &rules, &fx.ctx(), &fx.fs);
    assert_eq!(report.succeeded, 1);
    assert_eq!(fx.tree(), vec![fx.root.join("Invoices/2024/invoice_2024.pdf")]);
}
