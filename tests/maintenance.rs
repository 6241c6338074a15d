use chrono::{Local, NaiveDate};
use std::fs;

use postkit::api::{CacheFile, ProductRecord};
use postkit::commands;
use postkit::commands::prompts::PromptArgs;
use postkit::config::SiteConfig;
use postkit::content::FrontMatter;
use postkit::Postkit;

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn setup() -> (tempfile::TempDir, Postkit) {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("content")).unwrap();
    let postkit = Postkit::with_config(dir.path().to_path_buf(), SiteConfig::default());
    (dir, postkit)
}

fn write(postkit: &Postkit, name: &str, content: &str) {
    fs::write(postkit.content_dir.join(name), content).unwrap();
}

fn read(postkit: &Postkit, name: &str) -> String {
    fs::read_to_string(postkit.content_dir.join(name)).unwrap()
}

fn front_matter(content: &str) -> FrontMatter {
    FrontMatter::parse(content).unwrap().0
}

#[test]
fn test_clamp_future_with_counter_suffix() {
    let (_dir, postkit) = setup();
    write(
        &postkit,
        "2026-03-01-abc.md",
        "---\ntitle: \"later\"\ndate: \"2026-03-01\"\ncontentId: \"abc\"\n---\nbody\n",
    );
    write(
        &postkit,
        "2026-01-10-abc.md",
        "---\ntitle: \"holder\"\ndate: \"2026-01-10\"\ncontentId: \"abc\"\n---\nbody\n",
    );
    write(
        &postkit,
        "2026-01-01-old.md",
        "---\ntitle: \"past\"\ndate: \"2026-01-01\"\n---\nbody\n",
    );

    let report = commands::clamp::run(&postkit, ymd(2026, 1, 10)).unwrap();
    assert_eq!(report.fixed, 1);
    assert_eq!(report.skipped, 2);

    assert!(!postkit.content_dir.join("2026-03-01-abc.md").exists());
    let moved = read(&postkit, "2026-01-10-abc-1.md");
    assert!(moved.contains("date: \"2026-01-10\""));
    assert!(moved.contains("title: \"later\""));
    assert!(read(&postkit, "2026-01-10-abc.md").contains("title: \"holder\""));
}

#[test]
fn test_repair_escapes() {
    let (_dir, postkit) = setup();
    write(
        &postkit,
        "2026-01-01-abc.md",
        "---\ntitle: \"He said \"hi\"\"\ndate: \"2026-01-01\"\ntags: [\"x\"]\n---\n\nBody stays.\n",
    );
    write(
        &postkit,
        "2026-01-01-ok.md",
        "---\ntitle: \"fine\"\ndate: \"2026-01-01\"\n---\nbody\n",
    );

    let report = commands::escapes::run(&postkit).unwrap();
    assert_eq!(report.checked, 2);
    assert_eq!(report.repaired, 1);

    let repaired = read(&postkit, "2026-01-01-abc.md");
    let fm = front_matter(&repaired);
    assert!(!fm.needs_repair());
    assert_eq!(fm.title().as_deref(), Some("He said \"hi\""));
    assert_eq!(fm.tags(), vec!["x"]);
    assert!(repaired.ends_with("---\n\nBody stays.\n"));

    assert_eq!(
        read(&postkit, "2026-01-01-ok.md"),
        "---\ntitle: \"fine\"\ndate: \"2026-01-01\"\n---\nbody\n"
    );
}

#[test]
fn test_repair_escapes_leaves_multi_line_values_alone() {
    let (_dir, postkit) = setup();
    let raw = "---\ntitle: \"He said \"hi\"\"\nexcerpt: \"first line\nsecond line\"\n---\nbody\n";
    write(&postkit, "2026-01-01-abc.md", raw);

    let report = commands::escapes::run(&postkit).unwrap();
    assert_eq!(report.repaired, 0);
    assert_eq!(report.failed, 1);

    let content = read(&postkit, "2026-01-01-abc.md");
    assert_eq!(content, raw);
    assert!(content.contains("second line"));
}

#[test]
fn test_dedupe_keeps_newest() {
    let (_dir, postkit) = setup();
    write(&postkit, "2026-01-01-abc.md", "---\ndate: \"2026-01-01\"\n---\nold\n");
    write(&postkit, "2026-01-05-abc.md", "---\ndate: \"2026-01-05\"\n---\nnew\n");
    write(&postkit, "2026-01-02-def.md", "---\ndate: \"2026-01-02\"\n---\nsolo\n");

    let dry = commands::dedupe::run(&postkit, true).unwrap();
    assert_eq!(dry.groups, 1);
    assert_eq!(dry.deleted, 0);
    assert!(postkit.content_dir.join("2026-01-01-abc.md").exists());

    let report = commands::dedupe::run(&postkit, false).unwrap();
    assert_eq!(report.deleted, 1);
    assert!(!postkit.content_dir.join("2026-01-01-abc.md").exists());
    assert!(postkit.content_dir.join("2026-01-05-abc.md").exists());
    assert!(postkit.content_dir.join("2026-01-02-def.md").exists());
}

#[test]
fn test_fix_links() {
    let (_dir, postkit) = setup();
    write(
        &postkit,
        "2026-01-01-abc.md",
        "---\ndate: \"2026-01-01\"\n---\n<div className=\"affiliate-link\">\n[Buy](https://example.com/a)\n</div>\n",
    );
    write(&postkit, "2026-01-01-def.md", "---\ndate: \"2026-01-01\"\n---\nplain\n");

    let report = commands::links::run(&postkit).unwrap();
    assert_eq!(report.fixed, 1);
    assert_eq!(report.unchanged, 1);

    let fixed = read(&postkit, "2026-01-01-abc.md");
    assert!(fixed.contains("<a href=\"https://example.com/a\" target=\"_blank\" rel=\"noopener noreferrer\">Buy</a>"));
    assert!(!fixed.contains("[Buy]"));
}

#[test]
fn test_tags_from_genres_respects_limit() {
    let (_dir, postkit) = setup();
    let genres: Vec<String> = (1..=20).map(|i| format!("g{}", i)).collect();
    write(
        &postkit,
        "2026-01-01-abc.md",
        &format!(
            "---\ntitle: \"t\"\ntags: [\"g1\", \"own\"]\nrating: 4\n---\n\n**ジャンル:** {}\n",
            genres.join("、")
        ),
    );
    write(&postkit, "2026-01-01-def.md", "---\ntitle: \"none\"\n---\nno marker\n");

    let report = commands::tags::from_genres(&postkit).unwrap();
    assert_eq!(report.updated, 1);
    assert_eq!(report.skipped, 1);

    let content = read(&postkit, "2026-01-01-abc.md");
    let tags = front_matter(&content).tags();
    assert_eq!(tags.len(), 15);
    assert_eq!(tags[0], "g1");
    assert_eq!(tags[1], "own");
    assert_eq!(tags[2], "g2");
    assert!(content.contains("rating: 4\n"));

    let again = commands::tags::from_genres(&postkit).unwrap();
    assert_eq!(again.updated, 0);
    assert_eq!(again.unchanged, 1);
}

#[test]
fn test_tags_add_and_remove() {
    let (_dir, postkit) = setup();
    write(&postkit, "2026-01-01-abc.md", "---\ntitle: \"t\"\ntags: [\"a\"]\n---\nbody\n");
    write(&postkit, "2026-01-01-def.md", "---\ntitle: \"u\"\n---\nbody\n");

    commands::tags::add(&postkit, &["new".to_string()]).unwrap();
    assert_eq!(front_matter(&read(&postkit, "2026-01-01-abc.md")).tags(), vec!["a", "new"]);
    assert_eq!(front_matter(&read(&postkit, "2026-01-01-def.md")).tags(), vec!["new"]);

    commands::tags::remove(&postkit, &["a".to_string()]).unwrap();
    assert_eq!(front_matter(&read(&postkit, "2026-01-01-abc.md")).tags(), vec!["new"]);

    let counts = commands::tags::counts(&postkit).unwrap();
    assert_eq!(counts, vec![("new".to_string(), 2)]);
}

#[test]
fn test_check_reports_problems() {
    let (_dir, postkit) = setup();
    write(&postkit, "2026-01-01-abc.md", "---\ndate: \"2026-01-01\"\n---\nbody\n");
    write(&postkit, "2026-01-01-def.md", "---\ndate: \"2026-01-01\"\n---\nbody\n");
    let clean = commands::check::run(&postkit, Some(2)).unwrap();
    assert!(clean.is_clean());

    write(&postkit, "2026-01-02-abc.md", "---\ndate: \"2026-01-03\"\n---\nbody\n");
    let report = commands::check::run(&postkit, Some(2)).unwrap();
    assert!(!report.is_clean());
    assert_eq!(report.mismatched.len(), 1);
    assert_eq!(report.duplicates.len(), 1);
}

#[test]
fn test_prompts_from_cache() {
    let (dir, postkit) = setup();
    write(&postkit, "2026-01-01-have01.md", "---\ndate: \"2026-01-01\"\n---\nbody\n");

    let records = vec![
        ProductRecord {
            rank: 1,
            content_id: "have01".to_string(),
            title: "Already written".to_string(),
            ..Default::default()
        },
        ProductRecord {
            rank: 2,
            content_id: "new002".to_string(),
            title: "Fresh".to_string(),
            genre: vec!["ドラマ".to_string()],
            ..Default::default()
        },
    ];
    CacheFile::new(records, Local::now())
        .save(&postkit.data_dir, "ranking", Local::now())
        .unwrap();

    let report = commands::prompts::run(
        &postkit,
        PromptArgs {
            data: None,
            date: ymd(2026, 2, 1),
            limit: None,
            skip_existing: true,
        },
    )
    .unwrap();
    assert_eq!(report.written, 1);
    assert_eq!(report.skipped, 1);

    let prompt = dir.path().join("prompts").join("2026-02-01-new002-prompt.txt");
    let text = fs::read_to_string(&prompt).unwrap();
    assert!(text.contains("title: \"Fresh\""));
    assert!(text.contains("tags: [\"ドラマ\"]"));
    assert!(!dir.path().join("prompts").join("2026-02-01-have01-prompt.txt").exists());
}
