//! Document renderer properties: determinism, page breaks per phase and
//! collision-free output paths under concurrent requests.

use std::collections::HashSet;
use std::path::PathBuf;

use lopdf::Document;

use plandoc_core::plan::{Objective, Phase, PhaseSection, Plan, ResourceCategory, ResourceItem};
use plandoc_core::{DocumentRenderer, OutputFormat};

fn plan_with_phases(count: usize) -> Plan {
    let phases = (1..=count)
        .map(|i| PhaseSection {
            phase: Phase {
                name: format!("Phase {i}"),
                raw_description: format!("Work package {i}"),
            },
            objectives: vec![Objective {
                title: format!("Objective {i}"),
                sub_points: vec!["First step".into(), "Second step".into()],
            }],
            resources: vec![ResourceCategory {
                name: "Personnel".into(),
                items: vec![ResourceItem {
                    name: "Engineers".into(),
                    description: "Build things".into(),
                }],
            }],
        })
        .collect();
    Plan {
        overview_text: "A short overview.".into(),
        phases,
        phases_found: count,
        warnings: vec![],
    }
}

#[test]
fn identical_input_gives_identical_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let plan = plan_with_phases(3);
    for format in [OutputFormat::Pdf, OutputFormat::Text] {
        let renderer = DocumentRenderer::for_format(dir.path(), format);
        let a = renderer.render_plan(&plan, "Lunar mining").unwrap();
        let b = renderer.render_plan(&plan, "Lunar mining").unwrap();
        assert_ne!(a.path, b.path);
        assert_eq!(
            std::fs::read(&a.path).unwrap(),
            std::fs::read(&b.path).unwrap(),
            "{format} output differs"
        );
    }
}

#[test]
fn each_phase_starts_a_new_page() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = DocumentRenderer::for_format(dir.path(), OutputFormat::Pdf);
    for phases in [1, 2, 5] {
        let rendered = renderer
            .render_plan(&plan_with_phases(phases), "Paging")
            .unwrap();
        let doc = Document::load_mem(&std::fs::read(&rendered.path).unwrap()).unwrap();
        // Short phases: one page each, i.e. P-1 breaks.
        assert_eq!(doc.get_pages().len(), phases);
    }

    let text = DocumentRenderer::for_format(dir.path(), OutputFormat::Text)
        .render_plan(&plan_with_phases(4), "Paging")
        .unwrap();
    let body = std::fs::read_to_string(&text.path).unwrap();
    assert_eq!(body.matches('\u{c}').count(), 3);
}

#[test]
fn zero_phase_plan_still_renders() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = DocumentRenderer::for_format(dir.path(), OutputFormat::Pdf);
    let rendered = renderer.render_plan(&plan_with_phases(0), "Empty").unwrap();
    let doc = Document::load_mem(&std::fs::read(&rendered.path).unwrap()).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_renders_never_collide() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = DocumentRenderer::for_format(dir.path(), OutputFormat::Pdf);
    let plan = plan_with_phases(2);

    let mut handles = Vec::new();
    for i in 0..16 {
        let renderer = renderer.clone();
        let plan = plan.clone();
        // Half share one title, half are distinct.
        let title = if i % 2 == 0 {
            "Same title".to_string()
        } else {
            format!("Title {i}")
        };
        handles.push(tokio::task::spawn_blocking(move || {
            renderer.render_plan(&plan, &title).unwrap().path
        }));
    }

    let mut paths: Vec<PathBuf> = Vec::new();
    for handle in handles {
        paths.push(handle.await.unwrap());
    }
    let unique: HashSet<&PathBuf> = paths.iter().collect();
    assert_eq!(unique.len(), paths.len());
    for path in &paths {
        let bytes = std::fs::read(path).unwrap();
        assert!(Document::load_mem(&bytes).is_ok(), "{} is corrupt", path.display());
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 16);
}
