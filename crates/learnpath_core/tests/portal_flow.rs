use learnpath_core::offline::{
    CacheStorage, MemoryCacheStorage, QueuedSpawner, SqliteCacheStorage, UnreachableNetwork,
};
use learnpath_core::{LeafKey, Portal, PortalConfig, PortalError};
use std::fs;
use std::path::Path;
use std::sync::Arc;

const STRUCTURE: &str = r#"{
  "axes": [{
    "id": "dev-web",
    "name": "Web development",
    "chapters": [{
      "id": "html",
      "name": "HTML",
      "sections": [
        { "id": "intro", "name": "Introduction", "file": "dev-web/html/intro.md" },
        { "id": "forms", "name": "Forms", "subsections": [
          { "id": "inputs", "name": "Inputs", "file": "dev-web/html/forms/inputs.md" },
          { "id": "labels", "name": "Labels", "file": "dev-web/html/forms/labels.md" }
        ]}
      ]
    }]
  }]
}"#;

fn write(root: &Path, relative: &str, body: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, body).unwrap();
}

fn fixture(root: &Path) -> PortalConfig {
    write(root, "data/structure.json", STRUCTURE);
    write(
        root,
        "public/content/dev-web/html/intro.md",
        "# HTML introduction\n\nHTML structures documents.\n",
    );
    write(
        root,
        "public/content/dev-web/html/forms/inputs.md",
        "# Inputs\n\nThe input element collects data.\n\n::: quiz\nQ: Void element?\n- [x] input\n- [ ] form\n:::\n",
    );
    write(
        root,
        "public/content/dev-web/html/forms/labels.md",
        "# Labels\n\nA label names an input.\n",
    );
    write(root, "public/content/orphan.md", "# Orphan\n\ninput everywhere\n");
    write(root, "public/index.html", "<html>home</html>");
    write(root, "public/manifest.json", "{}");
    write(root, "public/glossaire.html", "<html>glossary</html>");
    write(
        root,
        "learnpath.toml",
        "database_path = \"state/learnpath.db\"\ncache_path = \"state/cache.db\"\n",
    );
    PortalConfig::load(Some(&root.join("learnpath.toml"))).unwrap()
}

#[test]
fn read_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path());
    let key = LeafKey::subsection("dev-web", "html", "forms", "inputs");
    {
        let portal = Portal::open(config.clone()).unwrap();
        assert!(portal.store().is_durable());
        portal.mark_read(&key).unwrap();
        portal.mark_read(&key).unwrap();
        portal.toggle_favorite(&key).unwrap();
        portal.set_note(&key, "inputs are void").unwrap();
    }

    let portal = Portal::open(config).unwrap();
    let progress = portal.progress();
    assert_eq!((progress.completed, progress.total, progress.percentage), (1, 3, 33));
    assert!(portal.is_read(&key));
    assert_eq!(portal.favorites()[0].path, "/dev-web/html/forms/inputs");
    assert_eq!(
        portal.note(&LeafKey::subsection("dev-web", "html", "forms", "labels")),
        "inputs are void"
    );
}

#[test]
fn section_with_subsections_is_not_navigable() {
    let dir = tempfile::tempdir().unwrap();
    let portal = Portal::open(fixture(dir.path())).unwrap();

    let navigation = portal.navigation();
    assert_eq!(navigation.len(), 3);
    assert!(matches!(
        portal.section(&LeafKey::section("dev-web", "html", "forms")),
        Err(PortalError::SectionNotFound(_))
    ));

    let view = portal
        .section(&LeafKey::subsection("dev-web", "html", "forms", "inputs"))
        .unwrap();
    assert_eq!(view.prev.unwrap().section_id, "intro");
    assert_eq!(view.next.unwrap().subsection_id.as_deref(), Some("labels"));
    assert_eq!(view.document.quiz_count(), 1);
}

#[test]
fn search_skips_orphans_and_follows_navigation_order() {
    let dir = tempfile::tempdir().unwrap();
    let portal = Portal::open(fixture(dir.path())).unwrap();

    let hits = portal.search("INPUT");
    let paths = hits.iter().map(|hit| hit.path.as_str()).collect::<Vec<_>>();
    assert_eq!(
        paths,
        vec!["/dev-web/html/forms/inputs", "/dev-web/html/forms/labels"]
    );
    assert_eq!(hits[0].title, "Inputs");
    assert_eq!(hits[0].subsection_id.as_deref(), Some("inputs"));
    assert!(portal.search("i").is_empty());
}

#[test]
fn prefetched_content_is_served_offline() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path());
    {
        let portal = Portal::open(config.clone()).unwrap();
        let install = portal.install_shell().unwrap();
        assert_eq!(install.cached, 3);
        let report = portal.prefetch_content().unwrap();
        assert_eq!(report.cached.len(), 3);
        assert!(report.failed.is_empty());
    }

    let cache_path = config.cache_path.clone().unwrap();
    let caches = Arc::new(SqliteCacheStorage::open(&cache_path).unwrap());
    let portal = Portal::with_network(
        config,
        Arc::new(UnreachableNetwork),
        caches.clone(),
        Arc::new(QueuedSpawner::new()),
    )
    .unwrap();

    let view = portal
        .section(&LeafKey::subsection("dev-web", "html", "forms", "labels"))
        .unwrap();
    assert!(view.markdown.contains("A label names an input."));

    let home = portal
        .worker()
        .handle(&learnpath_core::offline::Request::navigate("/dev-web/html/intro"))
        .unwrap();
    assert_eq!(home.body_text(), "<html>home</html>");
    assert_eq!(
        caches.cache_names().unwrap(),
        vec!["prog-web-content-v1".to_string(), "prog-web-v2".to_string()]
    );
}

#[test]
fn missing_content_is_reported_as_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path());
    fs::remove_file(dir.path().join("public/content/dev-web/html/intro.md")).unwrap();

    let portal = Portal::with_network(
        config.clone(),
        Arc::new(learnpath_core::offline::LocalOrigin::new(
            config.content_root.clone(),
            config.public_root.clone(),
            config.structure_file.clone(),
            config.search.clone(),
        )),
        Arc::new(MemoryCacheStorage::new()),
        Arc::new(QueuedSpawner::new()),
    )
    .unwrap();

    assert!(matches!(
        portal.section(&LeafKey::section("dev-web", "html", "intro")),
        Err(PortalError::ContentNotFound(_))
    ));
}

#[test]
fn default_config_keeps_state_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    fixture(dir.path());
    write(dir.path(), "minimal.toml", "log_level = \"warn\"\n");
    let config = PortalConfig::load(Some(&dir.path().join("minimal.toml"))).unwrap();
    let key = LeafKey::section("dev-web", "html", "intro");
    {
        let portal = Portal::open(config.clone()).unwrap();
        assert!(portal.store().is_durable());
        portal.mark_read(&key).unwrap();
    }

    let portal = Portal::open(config).unwrap();
    assert!(portal.is_read(&key));
    assert!(dir.path().join("data/learnpath.db").exists());
}

fn many_leaves_fixture(root: &Path, leaves: usize, extra_toml: &str) -> PortalConfig {
    let sections = (0..leaves)
        .map(|i| format!(r#"{{ "id": "s{i:02}", "name": "S{i:02}", "file": "dev-web/css/s{i:02}.md" }}"#))
        .collect::<Vec<_>>()
        .join(",");
    let structure = format!(
        r#"{{ "axes": [
            {{ "id": "dev-web", "name": "Web", "chapters": [
                {{ "id": "css", "name": "CSS", "sections": [{sections}] }}
            ]}},
            {{ "id": "ops", "name": "Ops", "chapters": [
                {{ "id": "deploy", "name": "Deploy", "sections": [
                    {{ "id": "cdn", "name": "CDN", "file": "ops/deploy/cdn.md" }}
                ]}}
            ]}}
        ]}}"#
    );
    write(root, "data/structure.json", &structure);
    for i in 0..leaves {
        write(
            root,
            &format!("public/content/dev-web/css/s{i:02}.md"),
            &format!("# Section {i:02}\n\nflexbox layout notes\n"),
        );
    }
    write(
        root,
        "public/content/ops/deploy/cdn.md",
        "# CDN\n\nServe the flexbox demo from the edge.\n",
    );
    write(root, "learnpath.toml", extra_toml);
    PortalConfig::load(Some(&root.join("learnpath.toml"))).unwrap()
}

#[test]
fn search_is_capped_at_max_results_in_navigation_order() {
    let dir = tempfile::tempdir().unwrap();
    let config = many_leaves_fixture(dir.path(), 25, "");
    assert_eq!(config.search.max_results, 20);
    let portal = Portal::open(config).unwrap();

    let hits = portal.search("flexbox");
    assert_eq!(hits.len(), 20);
    let expected = (0..20)
        .map(|i| format!("/dev-web/css/s{i:02}"))
        .collect::<Vec<_>>();
    let paths = hits.iter().map(|hit| hit.path.clone()).collect::<Vec<_>>();
    assert_eq!(paths, expected);
}

#[test]
fn search_scope_excludes_unlisted_axes() {
    let dir = tempfile::tempdir().unwrap();
    let portal = Portal::open(many_leaves_fixture(dir.path(), 2, "")).unwrap();
    let everywhere = portal.search("flexbox");
    assert_eq!(everywhere.last().unwrap().path, "/ops/deploy/cdn");

    let scoped_dir = tempfile::tempdir().unwrap();
    let scoped = Portal::open(many_leaves_fixture(
        scoped_dir.path(),
        2,
        "[search]\naxes = [\"dev-web\"]\n",
    ))
    .unwrap();
    let hits = scoped.search("flexbox");
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|hit| hit.axis_id == "dev-web"));
    assert!(scoped.search("edge").is_empty());
}
