//! Integration tests for nohr-router
//!
//! Builds a small application tree on disk and exercises discovery, layout
//! resolution, ordering, matching and the manifest cache together.

use std::fs;
use std::path::Path;

use nohr_router::*;
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;

const PAGE: &str = "export default function Page() { return null }";
const LAYOUT: &str = "export default function Layout({ children }) { return children }";

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

/// `app/(pages)` and `app/api` of a typical project
fn fixture() -> (TempDir, RouteTableBuilder) {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();

    write(root, "app/pages/page.tsx", PAGE);
    write(root, "app/pages/layout.tsx", LAYOUT);
    write(root, "app/pages/about/page.tsx", PAGE);
    write(root, "app/pages/dashboard/page.tsx", PAGE);
    write(root, "app/pages/dashboard/layout.tsx", LAYOUT);
    write(root, "app/pages/users/page.tsx", PAGE);
    write(root, "app/pages/users/[id]/page.tsx", PAGE);

    write(root, "app/api/hello/route.ts", "const app = {}\nexport default app;");
    write(
        root,
        "app/api/users/route.ts",
        "export const GET = (c) => c.json([])\nexport const POST = async (c) => c.json({})",
    );
    write(
        root,
        "app/api/users/[id]/route.ts",
        "export async function GET(c) {}\nexport async function PATCH(c) {}\nconst remove = () => {}\nexport { remove as DELETE }",
    );

    let builder = RouteTableBuilder::new(root.join("app/pages"), root.join("app/api"));
    (dir, builder)
}

fn patterns(table: &RouteTable) -> Vec<String> {
    table.iter().map(|e| e.pattern.to_string()).collect()
}

#[test]
fn test_page_table_order() {
    let (_dir, builder) = fixture();
    let pages = builder.build_pages().unwrap();

    assert_eq!(
        patterns(&pages),
        vec!["/", "/about", "/dashboard", "/users", "/users/:id"]
    );
}

#[test]
fn test_static_entries_precede_dynamic_entries() {
    let (_dir, builder) = fixture();
    let pages = builder.build_pages().unwrap();

    let first_dynamic = pages.iter().position(|e| !e.is_static()).unwrap();
    assert!(pages.iter().skip(first_dynamic).all(|e| !e.is_static()));
}

#[test]
fn test_source_refs_are_relative() {
    let (_dir, builder) = fixture();
    let pages = builder.build_pages().unwrap();
    let sources: Vec<&str> = pages.iter().map(|e| e.source.as_str()).collect();

    assert_eq!(
        sources,
        vec![
            "page.tsx",
            "about/page.tsx",
            "dashboard/page.tsx",
            "users/page.tsx",
            "users/[id]/page.tsx",
        ]
    );
}

#[test]
fn test_layout_chains() {
    let (_dir, builder) = fixture();
    let pages = builder.build_pages().unwrap();

    let dashboard = pages.match_path("/dashboard").unwrap().entry;
    assert_eq!(
        dashboard.layouts,
        vec![SourceRef::new("layout.tsx"), SourceRef::new("dashboard/layout.tsx")]
    );

    let about = pages.match_path("/about").unwrap().entry;
    assert_eq!(about.layouts, vec![SourceRef::new("layout.tsx")]);

    let home = pages.match_path("/").unwrap().entry;
    assert_eq!(home.layouts, vec![SourceRef::new("layout.tsx")]);
}

#[rstest]
#[case("/", Some("/"), &[])]
#[case("/about", Some("/about"), &[])]
#[case("/users/42", Some("/users/:id"), &[("id", "42")])]
#[case("/users/42/extra", None, &[])]
#[case("/about/", None, &[])]
#[case("/missing", None, &[])]
fn test_matching(
    #[case] path: &str,
    #[case] expected: Option<&str>,
    #[case] params: &[(&str, &str)],
) {
    let (_dir, builder) = fixture();
    let pages = builder.build_pages().unwrap();

    let matched = pages.match_path(path);
    assert_eq!(
        matched.as_ref().map(|m| m.entry.pattern.to_string()).as_deref(),
        expected
    );
    for (name, value) in params {
        assert_eq!(matched.as_ref().and_then(|m| m.param(name)), Some(*value));
    }
}

#[test]
fn test_api_table() {
    let (_dir, builder) = fixture();
    let api = builder.build_api().unwrap();

    // hello/route.ts exports only a default and is skipped
    assert_eq!(patterns(&api), vec!["/api/users", "/api/users/:id"]);

    let users = &api.entries()[0];
    assert_eq!(users.kind, RouteKind::Api);
    assert_eq!(
        users.methods.iter().copied().collect::<Vec<_>>(),
        vec![HttpMethod::Get, HttpMethod::Post]
    );

    let user = api.match_path("/api/users/7").unwrap();
    assert_eq!(user.param("id"), Some("7"));
    assert!(user.entry.supports(HttpMethod::Delete));
    assert!(user.entry.supports(HttpMethod::Patch));
    assert!(!user.entry.supports(HttpMethod::Post));

    assert_eq!(api.stats().methods, 5);
}

#[test]
fn test_pages_and_api_are_disjoint() {
    let (_dir, builder) = fixture();
    let manifest = builder.build().unwrap();

    assert!(manifest.pages.match_path("/api/users").is_none());
    assert!(manifest.api.match_path("/users").is_none());
    assert!(manifest.pages.iter().all(|e| e.kind == RouteKind::Page));
}

#[test]
fn test_rebuild_is_deterministic() {
    let (_dir, builder) = fixture();
    let first = builder.build().unwrap();
    let second = builder.build().unwrap();

    assert!(first.same_routes(&second));
    assert_eq!(first.pages, second.pages);
    assert_eq!(first.api, second.api);
}

#[test]
fn test_stats() {
    let (_dir, builder) = fixture();
    let stats = builder.build_pages().unwrap().stats();

    assert_eq!(
        stats,
        RouteStats {
            total: 5,
            static_routes: 4,
            dynamic_routes: 1,
            methods: 0,
        }
    );
}

#[test]
fn test_manifest_cache_lifecycle() {
    let (dir, builder) = fixture();
    let cache = ManifestCache::new(dir.path().join(DEFAULT_MANIFEST_PATH));

    let (manifest, status) = cache.load_validated(&builder).unwrap();
    assert_eq!(status, CacheStatus::Missing);
    assert!(cache.path().exists());

    let (_, status) = cache.load_validated(&builder).unwrap();
    assert_eq!(status, CacheStatus::Fresh);

    write(dir.path(), "app/pages/contact/page.tsx", PAGE);
    let (updated, status) = cache.load_validated(&builder).unwrap();
    assert_eq!(status, CacheStatus::Stale);
    assert_eq!(updated.pages.len(), manifest.pages.len() + 1);

    let on_disk = cache.read().unwrap().unwrap();
    assert!(on_disk.same_routes(&updated));
}

#[test]
fn test_corrupt_cache_is_rewritten() {
    let (dir, builder) = fixture();
    let cache = ManifestCache::new(dir.path().join("routes.json"));
    fs::write(cache.path(), "[]").unwrap();

    let (_, status) = cache.load_validated(&builder).unwrap();
    assert_eq!(status, CacheStatus::Stale);
    assert!(cache.read().unwrap().is_some());
}

#[test]
fn test_manifest_json_shape() {
    let (_dir, builder) = fixture();
    let manifest = builder.build().unwrap();
    let json: serde_json::Value = serde_json::from_str(&manifest.to_json_pretty().unwrap()).unwrap();

    assert_eq!(json["pages"][4]["pattern"], "/users/:id");
    assert_eq!(json["pages"][4]["source"], "users/[id]/page.tsx");
    assert_eq!(json["pages"][4]["kind"], "page");
    assert_eq!(json["api"][0]["methods"], serde_json::json!(["GET", "POST"]));
}

#[test]
fn test_ambiguous_routes_first_sorted_wins() {
    let (dir, builder) = fixture();
    write(dir.path(), "app/pages/users/[uid]/page.tsx", PAGE);

    let pages = builder.build_pages().unwrap();
    let hit = pages.match_path("/users/9").unwrap();
    assert_eq!(hit.param("id"), Some("9"));
}

#[test]
fn test_shared_manifest_publishes_rebuilds() {
    let (dir, builder) = fixture();
    let shared = SharedManifest::new(builder.build().unwrap());
    let before = shared.load();

    write(dir.path(), "app/pages/contact/page.tsx", PAGE);
    shared.publish(builder.build().unwrap());

    assert!(before.pages.match_path("/contact").is_none());
    assert!(shared.load().pages.match_path("/contact").is_some());
}
